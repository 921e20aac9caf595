// ── Command dispatcher ──
//
// Coalesces outbound writes per resource key. Each key has one pending
// slot and one worker task: a newer request replaces an unsent one, the
// worker sends only after the key has been quiet for the quiescence
// window, then pauses for the settle delay before its next send.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vrc9xx_api::ApiRequest;

use crate::error::CoreError;
use crate::source::CommandExecutor;

/// Final outcome of one dispatched command.
#[derive(Debug)]
pub enum CommandOutcome {
    /// The write was accepted by the API.
    Sent,
    /// A newer command for the same resource replaced this one before it
    /// was sent.
    Superseded,
    /// The API rejected the write or the transport gave up.
    Failed(CoreError),
}

impl CommandOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Awaitable handle for a dispatched command.
#[derive(Debug)]
pub struct CommandTicket {
    rx: oneshot::Receiver<CommandOutcome>,
}

impl CommandTicket {
    /// Wait for the command to be sent, superseded or rejected.
    pub async fn outcome(self) -> CommandOutcome {
        self.rx
            .await
            .unwrap_or(CommandOutcome::Failed(CoreError::PollerStopped))
    }
}

/// Called after every successful send, once the settle delay has elapsed.
pub type CompletionHook = Arc<dyn Fn() + Send + Sync>;

struct Pending {
    request: ApiRequest,
    responder: oneshot::Sender<CommandOutcome>,
    arrived: Instant,
}

#[derive(Default)]
struct GroupState {
    pending: Option<Pending>,
    worker_running: bool,
}

/// Per-key state, shared between `dispatch` and the key's worker.
#[derive(Default)]
struct KeyGroup {
    state: Mutex<GroupState>,
}

impl KeyGroup {
    fn lock(&self) -> std::sync::MutexGuard<'_, GroupState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct DispatcherInner<E> {
    executor: E,
    groups: DashMap<String, Arc<KeyGroup>>,
    quiescence: Duration,
    settle: Duration,
    on_complete: CompletionHook,
    cancel: CancellationToken,
}

/// Per-resource coalescing write queue.
pub struct CommandDispatcher<E> {
    inner: Arc<DispatcherInner<E>>,
}

impl<E> Clone for CommandDispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: CommandExecutor> CommandDispatcher<E> {
    pub fn new(
        executor: E,
        quiescence: Duration,
        settle: Duration,
        on_complete: CompletionHook,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                executor,
                groups: DashMap::new(),
                quiescence,
                settle,
                on_complete,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Queue a write. A pending, unsent write for the same resource key is
    /// superseded.
    pub fn dispatch(&self, request: ApiRequest) -> CommandTicket {
        let (tx, rx) = oneshot::channel();
        if self.inner.cancel.is_cancelled() {
            let _ = tx.send(CommandOutcome::Failed(CoreError::PollerStopped));
            return CommandTicket { rx };
        }

        let key = request.resource_key().to_owned();
        let group = Arc::clone(
            self.inner
                .groups
                .entry(key.clone())
                .or_insert_with(|| Arc::new(KeyGroup::default()))
                .value(),
        );

        debug!(%key, "[{}] queued", request.description);
        let spawn_worker = {
            let mut state = group.lock();
            let replaced = state.pending.replace(Pending {
                request,
                responder: tx,
                arrived: Instant::now(),
            });
            if let Some(old) = replaced {
                debug!(%key, "[{}] superseded", old.request.description);
                let _ = old.responder.send(CommandOutcome::Superseded);
            }
            !std::mem::replace(&mut state.worker_running, true)
        };

        if spawn_worker {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(run_worker(inner, group, key));
        }
        CommandTicket { rx }
    }

    /// Cancel every worker. Unsent commands resolve as failed.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
        for group in &self.inner.groups {
            if let Some(pending) = group.lock().pending.take() {
                let _ = pending
                    .responder
                    .send(CommandOutcome::Failed(CoreError::PollerStopped));
            }
        }
    }
}

/// Worker for one resource key. Exits when the slot is empty after a send.
async fn run_worker<E: CommandExecutor>(
    inner: Arc<DispatcherInner<E>>,
    group: Arc<KeyGroup>,
    key: String,
) {
    loop {
        // Debounce: wait until the newest request is `quiescence` old.
        let pending = loop {
            let deadline = {
                let mut state = group.lock();
                let Some(arrived) = state.pending.as_ref().map(|p| p.arrived) else {
                    state.worker_running = false;
                    return;
                };
                let deadline = arrived + inner.quiescence;
                if deadline <= Instant::now() {
                    break state.pending.take();
                }
                deadline
            };
            tokio::select! {
                biased;
                _ = inner.cancel.cancelled() => return,
                _ = tokio::time::sleep_until(deadline) => {}
            }
        };
        let Some(Pending {
            request, responder, ..
        }) = pending
        else {
            continue;
        };

        let result = tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => return,
            result = inner.executor.execute(&request) => result,
        };

        let succeeded = match result {
            Ok(()) => {
                info!(%key, "[{}] sent", request.description);
                let _ = responder.send(CommandOutcome::Sent);
                true
            }
            Err(e) => {
                warn!(%key, error = %e, "[{}] failed", request.description);
                let _ = responder.send(CommandOutcome::Failed(e));
                false
            }
        };

        tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => return,
            _ = tokio::time::sleep(inner.settle) => {}
        }
        if succeeded {
            (inner.on_complete)();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_ticket_sender_reads_as_stopped() {
        let (tx, rx) = oneshot::channel::<CommandOutcome>();
        drop(tx);
        let ticket = CommandTicket { rx };
        let outcome = futures_util::FutureExt::now_or_never(ticket.outcome());
        assert!(matches!(
            outcome,
            Some(CommandOutcome::Failed(CoreError::PollerStopped))
        ));
    }
}
