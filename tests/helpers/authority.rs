use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use emulator_authz::authz::{AuthorityClient, ConnectivityError};

/// Canned answer of a [`FakeAuthority`].
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Grant,
    Deny,
    /// Fails immediately, as if the authority were down
    Unreachable,
    /// Answers only after the given delay
    Slow(Duration),
    /// Never answers
    Hang,
}

/// Deterministic in-process authority that records every call.
pub struct FakeAuthority {
    reply: Reply,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, String, String)>>,
}

impl FakeAuthority {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (principal, resource, permission) of each call, in order.
    pub fn seen(&self) -> Vec<(String, String, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorityClient for FakeAuthority {
    async fn check_permission(
        &self,
        principal: &str,
        resource: &str,
        permission: &str,
    ) -> Result<bool, ConnectivityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((
            principal.to_string(),
            resource.to_string(),
            permission.to_string(),
        ));

        match self.reply {
            Reply::Grant => Ok(true),
            Reply::Deny => Ok(false),
            Reply::Unreachable => Err(ConnectivityError::Unreachable(
                "connection refused".into(),
            )),
            Reply::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(true)
            }
            Reply::Hang => std::future::pending().await,
        }
    }
}
