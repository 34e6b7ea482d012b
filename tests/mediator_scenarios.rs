mod helpers;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use emulator_authz::authz::principal;
use emulator_authz::authz::{Decision, Denial, IamMode, OutcomeClass, PermissionMediator};
use helpers::{FakeAuthority, Reply};

const ALICE: &str = "user:alice@example.com";
const RESOURCE: &str = "projects/test-project/secrets/db-password";
const PERMISSION: &str = "secretmanager.secrets.get";

fn mediator(mode: IamMode, authority: Arc<FakeAuthority>) -> PermissionMediator {
    PermissionMediator::new(mode, authority).with_timeout(Duration::from_millis(100))
}

#[tokio::test]
async fn test_strict_timeout_is_authority_unavailable() {
    let authority = FakeAuthority::new(Reply::Hang);
    let decision = mediator(IamMode::Strict, authority.clone())
        .check(ALICE, RESOURCE, PERMISSION)
        .await;

    assert_eq!(decision, Decision::Deny(Denial::AuthorityUnavailable));
    assert_eq!(decision.class(), OutcomeClass::Unavailable);
    assert_eq!(authority.calls(), 1);
}

#[tokio::test]
async fn test_permissive_timeout_allows() {
    let authority = FakeAuthority::new(Reply::Hang);
    let decision = mediator(IamMode::Permissive, authority.clone())
        .check(ALICE, RESOURCE, PERMISSION)
        .await;

    assert_eq!(decision, Decision::Allow);
    assert_eq!(authority.calls(), 1);
}

#[tokio::test]
async fn test_slow_answer_within_deadline_is_honoured() {
    let authority = FakeAuthority::new(Reply::Slow(Duration::from_millis(10)));
    let decision = PermissionMediator::new(IamMode::Strict, authority)
        .with_timeout(Duration::from_secs(5))
        .check(ALICE, RESOURCE, PERMISSION)
        .await;

    assert_eq!(decision, Decision::Allow);
}

#[tokio::test]
async fn test_decision_table() {
    let cases = [
        (IamMode::Off, "", Reply::Deny, Decision::Allow, 0),
        (IamMode::Off, ALICE, Reply::Unreachable, Decision::Allow, 0),
        (IamMode::Permissive, "", Reply::Grant, Decision::Deny(Denial::MissingPrincipal), 0),
        (IamMode::Strict, "", Reply::Grant, Decision::Deny(Denial::MissingPrincipal), 0),
        (IamMode::Permissive, ALICE, Reply::Unreachable, Decision::Allow, 1),
        (
            IamMode::Strict,
            ALICE,
            Reply::Unreachable,
            Decision::Deny(Denial::AuthorityUnavailable),
            1,
        ),
        (IamMode::Permissive, ALICE, Reply::Grant, Decision::Allow, 1),
        (IamMode::Strict, ALICE, Reply::Grant, Decision::Allow, 1),
        (IamMode::Permissive, ALICE, Reply::Deny, Decision::Deny(Denial::PermissionDenied), 1),
        (IamMode::Strict, ALICE, Reply::Deny, Decision::Deny(Denial::PermissionDenied), 1),
    ];

    for (mode, principal, reply, expected, calls) in cases {
        let authority = FakeAuthority::new(reply);
        let decision = mediator(mode, authority.clone())
            .check(principal, RESOURCE, PERMISSION)
            .await;
        assert_eq!(decision, expected, "mode={mode} principal={principal:?} reply={reply:?}");
        assert_eq!(authority.calls(), calls, "mode={mode} principal={principal:?}");
    }
}

#[tokio::test]
async fn test_principal_forwarded_verbatim() {
    let authority = FakeAuthority::new(Reply::Grant);
    let mediator = mediator(IamMode::Strict, authority.clone());

    let mut metadata = HashMap::new();
    principal::inject(&mut metadata, "serviceAccount:ci@test-project.iam.gserviceaccount.com");
    mediator.check_carrier(&metadata, RESOURCE, PERMISSION).await;

    assert_eq!(
        authority.seen(),
        vec![(
            "serviceAccount:ci@test-project.iam.gserviceaccount.com".to_string(),
            RESOURCE.to_string(),
            PERMISSION.to_string(),
        )]
    );
}

#[tokio::test]
async fn test_concurrent_checks_share_one_mediator() {
    let authority = FakeAuthority::new(Reply::Slow(Duration::from_millis(5)));
    let mediator = Arc::new(
        PermissionMediator::new(IamMode::Strict, authority.clone())
            .with_timeout(Duration::from_secs(5)),
    );

    let mut handles = Vec::new();
    for i in 0..16 {
        let mediator = mediator.clone();
        handles.push(tokio::spawn(async move {
            let principal = format!("user:user{i}@example.com");
            mediator.check(&principal, RESOURCE, PERMISSION).await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), Decision::Allow);
    }
    assert_eq!(authority.calls(), 16);
}

#[tokio::test]
async fn test_caller_cancellation_in_permissive_mode() {
    let authority = FakeAuthority::new(Reply::Hang);
    let mediator = PermissionMediator::new(IamMode::Permissive, authority)
        .with_timeout(Duration::from_secs(3600));

    let decision = mediator
        .check_with_signal(
            ALICE,
            RESOURCE,
            PERMISSION,
            tokio::time::sleep(Duration::from_millis(20)),
        )
        .await;
    assert_eq!(decision, Decision::Allow);
}
