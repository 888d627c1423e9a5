//! Tests for the label-prefix role guard.

use rstest::rstest;

use super::{PREFIX, empty_account, provider_error, tunnelled_account};
use crate::events::TunnelEvent;
use crate::linode::{InstanceId, InstanceStatus};
use crate::test_support::{PlaneCall, RecordingSink, ScriptedPlane, instance};
use crate::tunnel::{TunnelError, TunnelGuard};

#[rstest]
#[tokio::test]
async fn absent_passes_without_matches(empty_account: ScriptedPlane) {
    let sink = RecordingSink::new();
    TunnelGuard::new(&empty_account, &sink, PREFIX)
        .ensure_absent()
        .await
        .unwrap_or_else(|err| panic!("no tunnel should pass: {err}"));
    assert!(sink.events().is_empty());
}

#[rstest]
#[tokio::test]
async fn absent_fails_when_tunnel_exists(tunnelled_account: ScriptedPlane) {
    let sink = RecordingSink::new();
    let err = TunnelGuard::new(&tunnelled_account, &sink, PREFIX)
        .ensure_absent()
        .await
        .expect_err("existing tunnel should fail");

    assert_eq!(
        err,
        TunnelError::AlreadyExists {
            prefix: PREFIX.to_owned()
        }
    );
    assert!(matches!(
        sink.events().as_slice(),
        [TunnelEvent::GuardFailure { .. }]
    ));
}

#[rstest]
#[tokio::test]
async fn present_fails_without_matches(empty_account: ScriptedPlane) {
    let sink = RecordingSink::new();
    let err = TunnelGuard::new(&empty_account, &sink, PREFIX)
        .ensure_present()
        .await
        .expect_err("missing tunnel should fail");
    assert!(matches!(err, TunnelError::DoesNotExist { .. }));
}

#[rstest]
#[tokio::test]
async fn present_returns_single_match_unmodified(tunnelled_account: ScriptedPlane) {
    let sink = RecordingSink::new();
    let expected = instance(55, "burrow_tunnel-1a2b3c4d", InstanceStatus::Running);

    let found = TunnelGuard::new(&tunnelled_account, &sink, PREFIX)
        .ensure_present()
        .await
        .unwrap_or_else(|err| panic!("tunnel should be found: {err}"));

    assert_eq!(found, expected);
    assert!(sink.events().is_empty());
}

#[rstest]
#[tokio::test]
async fn several_matches_are_reported_and_first_wins(tunnelled_account: ScriptedPlane) {
    tunnelled_account.add_instance(instance(56, "burrow_tunnel-99999999", InstanceStatus::Offline));
    let sink = RecordingSink::new();

    let found = TunnelGuard::new(&tunnelled_account, &sink, PREFIX)
        .ensure_present()
        .await
        .unwrap_or_else(|err| panic!("tunnel should be found: {err}"));

    assert_eq!(found.id, InstanceId::new(55));
    let events = sink.events();
    assert!(matches!(
        events.as_slice(),
        [
            TunnelEvent::MultipleTunnels { count: 2, .. },
            TunnelEvent::TunnelInstance { index: 0, .. },
            TunnelEvent::TunnelInstance { index: 1, .. },
        ]
    ));
}

#[rstest]
#[tokio::test]
async fn prefix_must_lead_the_label(empty_account: ScriptedPlane) {
    empty_account.add_instance(instance(57, "old-burrow_tunnel", InstanceStatus::Running));
    let sink = RecordingSink::new();
    TunnelGuard::new(&empty_account, &sink, PREFIX)
        .ensure_absent()
        .await
        .unwrap_or_else(|err| panic!("infix match should not count: {err}"));
}

#[rstest]
#[tokio::test]
async fn listing_failure_propagates(empty_account: ScriptedPlane) {
    empty_account.fail(PlaneCall::ListInstances, provider_error(401, "Invalid Token"));
    let sink = RecordingSink::new();
    let err = TunnelGuard::new(&empty_account, &sink, PREFIX)
        .ensure_present()
        .await
        .expect_err("listing should fail");
    assert!(matches!(err, TunnelError::Provider(_)));
    assert!(sink.events().is_empty());
}
