#![allow(clippy::unwrap_used)]
// Lifecycle tests for `Controller` that need no reachable API.

use secrecy::SecretString;

use vrc9xx_core::{AuthState, Controller, ControllerConfig, CoreError, Credentials};

// ── Helpers ─────────────────────────────────────────────────────────

fn setup() -> Controller {
    let credentials = Credentials::new("phone-1", "alice", SecretString::from("hunter2"));
    let mut config = ControllerConfig::new(credentials);
    config.base_url = url::Url::parse("http://127.0.0.1:9/mobile/api/v4").unwrap();
    Controller::new(config).unwrap()
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn new_controller_is_idle() {
    let controller = setup();
    assert_eq!(*controller.auth_state().borrow(), AuthState::Unauthenticated);

    let result = controller.set_zone_setpoint("ABC123", "Z1", 20.0).await;
    assert!(matches!(result, Err(CoreError::PollerStopped)));
    assert!(matches!(
        controller.facilities().await,
        Err(CoreError::PollerStopped)
    ));
}

#[tokio::test]
async fn start_and_stop_are_idempotent() {
    let controller = setup();

    controller.start().await.unwrap();
    controller.start().await.unwrap();
    assert!(controller.facilities().await.unwrap().is_empty());

    controller.stop().await;
    controller.stop().await;
    assert!(matches!(
        controller.facility("ABC123").await,
        Err(CoreError::PollerStopped)
    ));
}

#[tokio::test]
async fn unknown_facility_is_reported() {
    let controller = setup();
    controller.start().await.unwrap();

    assert!(matches!(
        controller.facility("ABC123").await,
        Err(CoreError::FacilityNotFound { .. })
    ));
    controller.stop().await;
}
