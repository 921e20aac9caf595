#![allow(clippy::unwrap_used)]
// Integration tests for the coalescing command dispatcher, against a
// recording executor under paused tokio time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::Instant;
use vrc9xx_api::ApiRequest;

use vrc9xx_core::{
    CommandDispatcher, CommandExecutor, CommandOutcome, CompletionHook, CoreError, HeatingMode,
};

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorded {
    sent: Mutex<Vec<(Instant, ApiRequest)>>,
    /// Paths that answer with a 409.
    rejected: Mutex<Vec<String>>,
}

#[derive(Clone, Default)]
struct RecordingExecutor(Arc<Recorded>);

impl std::ops::Deref for RecordingExecutor {
    type Target = Recorded;

    fn deref(&self) -> &Recorded {
        &self.0
    }
}

impl Recorded {
    fn sent(&self) -> Vec<(Instant, ApiRequest)> {
        self.sent.lock().unwrap().clone()
    }
}

impl CommandExecutor for RecordingExecutor {
    async fn execute(&self, request: &ApiRequest) -> Result<(), CoreError> {
        if self.rejected.lock().unwrap().contains(&request.path) {
            return Err(CoreError::Conflict {
                message: "409 Conflict".into(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((Instant::now(), request.clone()));
        Ok(())
    }
}

struct Harness {
    executor: RecordingExecutor,
    dispatcher: CommandDispatcher<RecordingExecutor>,
    completions: Arc<AtomicUsize>,
}

fn setup() -> Harness {
    let executor = RecordingExecutor::default();
    let completions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completions);
    let on_complete: CompletionHook = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let dispatcher = CommandDispatcher::new(
        executor.clone(),
        Duration::from_secs(2),
        Duration::from_secs(1),
        on_complete,
    );
    Harness {
        executor,
        dispatcher,
        completions,
    }
}

fn setpoint(temperature: f64) -> ApiRequest {
    ApiRequest::set_zone_setpoint("ABC123", "Z1", temperature)
}

// ── Coalescing ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn burst_is_coalesced_into_last_value() {
    let h = setup();
    let started = Instant::now();

    let first = h.dispatcher.dispatch(setpoint(18.0));
    tokio::time::sleep(Duration::from_millis(500)).await;
    let second = h.dispatcher.dispatch(setpoint(19.0));
    tokio::time::sleep(Duration::from_millis(500)).await;
    let third = h.dispatcher.dispatch(setpoint(20.0));

    assert!(matches!(first.outcome().await, CommandOutcome::Superseded));
    assert!(matches!(second.outcome().await, CommandOutcome::Superseded));
    assert!(third.outcome().await.is_sent());

    let sent = h.executor.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].1.body,
        Some(json!({ "setpoint_temperature": 20.0 }))
    );
    // Sent two seconds after the last request of the burst.
    let delay = sent[0].0 - started;
    assert!(delay >= Duration::from_secs(3));
    assert!(delay < Duration::from_millis(3100));
}

#[tokio::test(start_paused = true)]
async fn distinct_resources_are_sent_independently() {
    let h = setup();

    let zone = h.dispatcher.dispatch(setpoint(20.0));
    let mode = h
        .dispatcher
        .dispatch(ApiRequest::set_zone_mode("ABC123", "Z1", HeatingMode::Night));
    let other = h
        .dispatcher
        .dispatch(ApiRequest::set_zone_setpoint("ABC123", "Z2", 17.0));

    assert!(zone.outcome().await.is_sent());
    assert!(mode.outcome().await.is_sent());
    assert!(other.outcome().await.is_sent());
    assert_eq!(h.executor.sent().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn writes_after_a_send_wait_for_settle() {
    let h = setup();

    assert!(h.dispatcher.dispatch(setpoint(20.0)).outcome().await.is_sent());
    let next = h.dispatcher.dispatch(setpoint(21.0));
    assert!(next.outcome().await.is_sent());

    let sent = h.executor.sent();
    assert_eq!(sent.len(), 2);
    // Quiescence from the second request, after the first send's settle.
    assert!(sent[1].0 - sent[0].0 >= Duration::from_secs(2));
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn failure_is_reported_and_later_writes_proceed() {
    let h = setup();
    let rejected = setpoint(20.0).path;
    h.executor.rejected.lock().unwrap().push(rejected);

    let outcome = h.dispatcher.dispatch(setpoint(20.0)).outcome().await;
    assert!(matches!(
        outcome,
        CommandOutcome::Failed(CoreError::Conflict { .. })
    ));

    h.executor.rejected.lock().unwrap().clear();
    assert!(h.dispatcher.dispatch(setpoint(21.0)).outcome().await.is_sent());
    assert_eq!(h.executor.sent().len(), 1);
}

// ── Completion hook ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn completion_hook_runs_after_settle() {
    let h = setup();

    assert!(h.dispatcher.dispatch(setpoint(20.0)).outcome().await.is_sent());
    assert_eq!(h.completions.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(h.completions.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_sends_skip_completion_hook() {
    let h = setup();
    h.executor
        .rejected
        .lock()
        .unwrap()
        .push(setpoint(20.0).path);

    let _ = h.dispatcher.dispatch(setpoint(20.0)).outcome().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.completions.load(Ordering::SeqCst), 0);
}

// ── Shutdown ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn shutdown_fails_unsent_commands() {
    let h = setup();

    let pending = h.dispatcher.dispatch(setpoint(20.0));
    h.dispatcher.shutdown();
    assert!(matches!(
        pending.outcome().await,
        CommandOutcome::Failed(CoreError::PollerStopped)
    ));

    let late = h.dispatcher.dispatch(setpoint(21.0));
    assert!(matches!(
        late.outcome().await,
        CommandOutcome::Failed(CoreError::PollerStopped)
    ));
    assert!(h.executor.sent().is_empty());
}
