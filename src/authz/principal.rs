//! Identity strings and how they travel between processes.
//!
//! A principal is carried verbatim under a single well-known key:
//! `x-emulator-principal` in metadata-style carriers and
//! `X-Emulator-Principal` in header-style carriers. Lookups ignore case.

use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Canonical key for metadata-style carriers.
pub const METADATA_KEY: &str = "x-emulator-principal";
/// Canonical key for header-style carriers.
pub const HEADER_KEY: &str = "X-Emulator-Principal";

const USER_PREFIX: &str = "user:";
const SERVICE_ACCOUNT_PREFIX: &str = "serviceAccount:";
const GROUP_PREFIX: &str = "group:";
const ALL_USERS: &str = "allUsers";
const ALL_AUTHENTICATED_USERS: &str = "allAuthenticatedUsers";

const PREFIXES: [&str; 3] = [USER_PREFIX, SERVICE_ACCOUNT_PREFIX, GROUP_PREFIX];

/// A well-formed principal, e.g. "user:alice@example.com" or "allUsers".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    User(String),
    ServiceAccount(String),
    Group(String),
    AllUsers,
    AllAuthenticatedUsers,
}

impl Principal {
    /// Parse a principal string. Returns `None` unless the string carries
    /// exactly one recognised prefix followed by a non-empty value, or is
    /// one of the two special identifiers.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ALL_USERS => return Some(Principal::AllUsers),
            ALL_AUTHENTICATED_USERS => return Some(Principal::AllAuthenticatedUsers),
            _ => {}
        }

        let (prefix, rest) = PREFIXES
            .iter()
            .find_map(|p| s.strip_prefix(p).map(|rest| (*p, rest)))?;

        // "user:group:x" names two kinds at once
        if rest.is_empty() || PREFIXES.iter().any(|p| rest.starts_with(p)) {
            return None;
        }

        let value = rest.to_string();
        Some(match prefix {
            USER_PREFIX => Principal::User(value),
            SERVICE_ACCOUNT_PREFIX => Principal::ServiceAccount(value),
            _ => Principal::Group(value),
        })
    }

    /// Group name, if this principal refers to a group.
    pub fn group_name(&self) -> Option<&str> {
        match self {
            Principal::Group(name) => Some(name),
            _ => None,
        }
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Principal::User(v) => write!(f, "{USER_PREFIX}{v}"),
            Principal::ServiceAccount(v) => write!(f, "{SERVICE_ACCOUNT_PREFIX}{v}"),
            Principal::Group(v) => write!(f, "{GROUP_PREFIX}{v}"),
            Principal::AllUsers => f.write_str(ALL_USERS),
            Principal::AllAuthenticatedUsers => f.write_str(ALL_AUTHENTICATED_USERS),
        }
    }
}

/// Shared grammar check used by both the policy validator and the mediator.
pub fn validate_format(principal: &str) -> bool {
    Principal::parse(principal).is_some()
}

/// Key/value set carrying request identity (HTTP headers, RPC metadata).
pub trait Carrier {
    /// Case-insensitive lookup.
    fn lookup(&self, key: &str) -> Option<&str>;

    /// Store `value` under `key`, replacing any case variant of `key`.
    /// Returns false if the carrier cannot represent the value.
    fn store(&mut self, key: &str, value: &str) -> bool;

    /// Key name this carrier writes under.
    fn canonical_key(&self) -> &'static str {
        METADATA_KEY
    }
}

impl Carrier for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<&str> {
        // exact key wins over case variants so duplicates resolve the same way every time
        if let Some(v) = self.get(key) {
            return Some(v.as_str());
        }
        self.iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, v)| v.as_str())
    }

    fn store(&mut self, key: &str, value: &str) -> bool {
        self.retain(|k, _| !k.eq_ignore_ascii_case(key));
        self.insert(key.to_string(), value.to_string());
        true
    }
}

impl Carrier for HeaderMap {
    fn lookup(&self, key: &str) -> Option<&str> {
        // HeaderMap names are already case-insensitive. to_str() rejects
        // bytes >= 0x80, which store() accepts, so decode as UTF-8 instead.
        self.get(key)
            .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
    }

    fn store(&mut self, key: &str, value: &str) -> bool {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) else {
            return false;
        };
        self.insert(name, value);
        true
    }

    fn canonical_key(&self) -> &'static str {
        HEADER_KEY
    }
}

/// Pull the principal from an inbound carrier; empty when absent.
pub fn extract<C: Carrier + ?Sized>(carrier: &C) -> String {
    carrier
        .lookup(METADATA_KEY)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Write `principal` verbatim for outbound propagation. Empty principals are
/// not propagated.
pub fn inject<C: Carrier + ?Sized>(carrier: &mut C, principal: &str) {
    if principal.is_empty() {
        return;
    }
    let key = carrier.canonical_key();
    if !carrier.store(key, principal) {
        tracing::warn!(key, "Principal could not be propagated: not representable in carrier");
    }
}
