use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use thiserror::Error;

use crate::authz::principal;
use crate::authz::types::{TestIamPermissionsRequest, TestIamPermissionsResponse};

/// The authority could not render a decision. The mediator turns this into
/// Allow or Deny depending on the IAM mode; it never reaches callers as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectivityError {
    #[error("authority unreachable: {0}")]
    Unreachable(String),

    #[error("authority returned HTTP {0}")]
    Status(u16),

    #[error("authority response could not be decoded: {0}")]
    Decode(String),

    #[error("authority did not answer within {0:?}")]
    TimedOut(Duration),

    #[error("permission check cancelled by caller")]
    Cancelled,
}

/// External collaborator that expands roles, resolves groups, evaluates
/// conditions, and answers whether `principal` holds `permission` on
/// `resource`.
#[async_trait]
pub trait AuthorityClient: Send + Sync {
    async fn check_permission(
        &self,
        principal: &str,
        resource: &str,
        permission: &str,
    ) -> Result<bool, ConnectivityError>;
}

/// `AuthorityClient` backed by the IAM emulator's `:testIamPermissions` API.
#[derive(Debug, Clone)]
pub struct HttpAuthorityClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpAuthorityClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConnectivityError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectivityError::Unreachable(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn endpoint(&self, resource: &str) -> String {
        format!(
            "{}/v1/{}:testIamPermissions",
            self.base_url,
            resource.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl AuthorityClient for HttpAuthorityClient {
    async fn check_permission(
        &self,
        principal: &str,
        resource: &str,
        permission: &str,
    ) -> Result<bool, ConnectivityError> {
        let mut headers = HeaderMap::new();
        principal::inject(&mut headers, principal);

        let url = self.endpoint(resource);
        tracing::debug!(%url, principal, permission, "Calling authority");

        let resp = self
            .http
            .post(&url)
            .headers(headers)
            .json(&TestIamPermissionsRequest {
                permissions: vec![permission.to_string()],
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ConnectivityError::Unreachable(format!("request timed out: {e}"))
                } else {
                    ConnectivityError::Unreachable(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ConnectivityError::Status(status.as_u16()));
        }

        let body: TestIamPermissionsResponse = resp
            .json()
            .await
            .map_err(|e| ConnectivityError::Decode(e.to_string()))?;

        Ok(body.permissions.iter().any(|p| p == permission))
    }
}
