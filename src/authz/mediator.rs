use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::authz::authority::{AuthorityClient, ConnectivityError};
use crate::authz::errors::AuthzError;
use crate::authz::principal::{self, Carrier};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How strictly permission checks are enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IamMode {
    /// No enforcement; the authority is never consulted.
    #[default]
    Off,
    /// Enforce, but allow when the authority cannot answer.
    Permissive,
    /// Enforce, and deny when the authority cannot answer.
    Strict,
}

impl FromStr for IamMode {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(IamMode::Off),
            "permissive" => Ok(IamMode::Permissive),
            "strict" => Ok(IamMode::Strict),
            other => Err(AuthzError::InvalidMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for IamMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            IamMode::Off => "off",
            IamMode::Permissive => "permissive",
            IamMode::Strict => "strict",
        })
    }
}

/// Why a check was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Enforcement is on and the caller presented no identity.
    MissingPrincipal,
    /// The authority explicitly refused.
    PermissionDenied,
    /// Strict mode and the authority could not answer.
    AuthorityUnavailable,
}

/// Class of outcome surfaced to transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeClass {
    Allow,
    PermissionDenied,
    Unavailable,
}

impl OutcomeClass {
    pub fn code(&self) -> &'static str {
        match self {
            OutcomeClass::Allow => "ALLOW",
            OutcomeClass::PermissionDenied => "PERMISSION_DENIED",
            OutcomeClass::Unavailable => "UNAVAILABLE",
        }
    }
}

impl Denial {
    pub fn class(&self) -> OutcomeClass {
        match self {
            Denial::MissingPrincipal | Denial::PermissionDenied => OutcomeClass::PermissionDenied,
            Denial::AuthorityUnavailable => OutcomeClass::Unavailable,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Denial::MissingPrincipal => "no principal provided",
            Denial::PermissionDenied => "permission denied",
            Denial::AuthorityUnavailable => "authority unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn class(&self) -> OutcomeClass {
        match self {
            Decision::Allow => OutcomeClass::Allow,
            Decision::Deny(d) => d.class(),
        }
    }
}

/// Combines the IAM mode with the authority's answer.
///
/// Holds no per-call state; one instance may serve concurrent callers as long
/// as the authority client does.
#[derive(Clone)]
pub struct PermissionMediator {
    mode: IamMode,
    authority: Arc<dyn AuthorityClient>,
    timeout: Duration,
}

impl std::fmt::Debug for PermissionMediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionMediator")
            .field("mode", &self.mode)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl PermissionMediator {
    pub fn new(mode: IamMode, authority: Arc<dyn AuthorityClient>) -> Self {
        Self {
            mode,
            authority,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn mode(&self) -> IamMode {
        self.mode
    }

    /// Check with the configured deadline.
    pub async fn check(&self, principal: &str, resource: &str, permission: &str) -> Decision {
        let timeout = self.timeout;
        self.decide(principal, resource, permission, async move {
            tokio::time::sleep(timeout).await;
            ConnectivityError::TimedOut(timeout)
        })
        .await
    }

    /// Check, abandoning the authority call when `signal` completes first.
    ///
    /// The configured deadline still applies. If the signal and the deadline
    /// fire together, the result is reported as `ConnectivityError::Cancelled`.
    pub async fn check_with_signal<S>(
        &self,
        principal: &str,
        resource: &str,
        permission: &str,
        signal: S,
    ) -> Decision
    where
        S: Future<Output = ()> + Send,
    {
        let timeout = self.timeout;
        self.decide(principal, resource, permission, async move {
            tokio::select! {
                biased;
                _ = signal => ConnectivityError::Cancelled,
                _ = tokio::time::sleep(timeout) => ConnectivityError::TimedOut(timeout),
            }
        })
        .await
    }

    /// Check the principal carried in request headers or metadata.
    pub async fn check_carrier<C: Carrier + ?Sized>(
        &self,
        carrier: &C,
        resource: &str,
        permission: &str,
    ) -> Decision {
        let principal = principal::extract(carrier);
        self.check(&principal, resource, permission).await
    }

    async fn decide<S>(&self, principal: &str, resource: &str, permission: &str, signal: S) -> Decision
    where
        S: Future<Output = ConnectivityError> + Send,
    {
        if self.mode == IamMode::Off {
            return Decision::Allow;
        }

        if principal.is_empty() {
            tracing::debug!(mode = %self.mode, resource, permission, "Denied: no principal");
            return Decision::Deny(Denial::MissingPrincipal);
        }

        let outcome = tokio::select! {
            res = self.authority.check_permission(principal, resource, permission) => res,
            err = signal => Err(err),
        };

        let decision = match outcome {
            Ok(true) => Decision::Allow,
            Ok(false) => Decision::Deny(Denial::PermissionDenied),
            Err(err) => match self.mode {
                IamMode::Strict => {
                    tracing::warn!(
                        error = %err,
                        principal,
                        resource,
                        permission,
                        "Authority unavailable, denying (strict mode)"
                    );
                    Decision::Deny(Denial::AuthorityUnavailable)
                }
                _ => {
                    tracing::warn!(
                        error = %err,
                        principal,
                        resource,
                        permission,
                        "Authority unavailable, allowing (permissive mode)"
                    );
                    Decision::Allow
                }
            },
        };

        tracing::debug!(
            mode = %self.mode,
            principal,
            resource,
            permission,
            outcome = decision.class().code(),
            "Permission check"
        );

        decision
    }
}
