use super::systemctl::parse_is_active;
use super::*;
use crate::test_utils::FakeServiceController;

#[test]
fn test_parse_is_active() {
    assert_eq!(parse_is_active("active\n"), ServiceState::Running);
    assert_eq!(parse_is_active("deactivating"), ServiceState::Running);
    assert_eq!(parse_is_active("inactive\n"), ServiceState::Stopped);
    assert_eq!(parse_is_active("failed"), ServiceState::Stopped);
    assert_eq!(parse_is_active(""), ServiceState::Unknown);
    assert_eq!(parse_is_active("unknown"), ServiceState::Unknown);
}

#[test]
fn test_unknown_is_treated_as_possibly_running() {
    assert!(ServiceState::Unknown.may_be_running());
    assert!(ServiceState::Running.may_be_running());
    assert!(!ServiceState::Stopped.may_be_running());
}

#[tokio::test]
async fn test_stop_running_service() {
    let fake = FakeServiceController::running();
    fake.stop().await.unwrap();
    assert_eq!(fake.state().await, ServiceState::Stopped);
    assert_eq!(fake.calls(), vec!["stop"]);
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let fake = FakeServiceController::stopped();
    fake.stop().await.unwrap();
    assert!(fake.calls().is_empty(), "No stop request for a stopped service");
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let fake = FakeServiceController::running();
    fake.start().await.unwrap();
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_stuck_service_reports_failure() {
    let fake = FakeServiceController::running();
    fake.ignore_stop_requests();

    let result = fake.stop().await;
    match result {
        Err(WorldError::ServiceStop(msg)) => assert!(msg.contains("did not stop")),
        other => panic!("Expected ServiceStop, got {other:?}"),
    }
    assert!(fake.is_running().await);
}

#[tokio::test]
async fn test_rejected_start_request() {
    let fake = FakeServiceController::stopped();
    fake.fail_start_requests();

    let result = fake.start().await;
    assert!(matches!(result, Err(WorldError::ServiceStart(_))));
    assert!(!fake.is_running().await);
}

#[tokio::test]
async fn test_unknown_state_still_requests_stop() {
    let fake = FakeServiceController::unknown();
    // Fake resolves Unknown to Stopped once a stop is requested
    fake.stop().await.unwrap();
    assert_eq!(fake.calls(), vec!["stop"]);
}
