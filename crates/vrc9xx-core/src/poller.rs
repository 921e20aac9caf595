// ── Facility poller ──
//
// One actor task owns the facility map and the observer registry. It is
// fed by a message channel, a delay queue of per-facility timers and a
// join set of in-flight fetches. Refreshes of one facility never overlap;
// a refresh requested while one is in flight is queued and runs next.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::time::{DelayQueue, delay_queue};
use tracing::{debug, info, warn};
use vrc9xx_api::models::FacilityInfo;

use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::model::{Facility, FacilityDescription, ObservedValue, Quantity, Snapshot};
use crate::observer::{Callback, ObserverRegistry, SubscriptionId};
use crate::source::FacilitySource;

/// Capacity of the poller event channel.
pub const EVENT_CHANNEL_SIZE: usize = 64;

/// Lifecycle events emitted by the poller.
#[derive(Debug, Clone)]
pub enum PollerEvent {
    /// First successful refresh of a facility. Emitted once per serial.
    FacilityDiscovered(Arc<Facility>),
    /// The initial facility list has been fully processed.
    DiscoveryComplete,
}

enum PollerMessage {
    Subscribe {
        serial: String,
        quantity: Quantity,
        callback: Callback,
        reply: oneshot::Sender<Result<SubscriptionId, CoreError>>,
    },
    Unsubscribe(SubscriptionId),
    Refresh {
        serial: String,
        force: bool,
    },
    CommandCompleted,
    Facility {
        serial: String,
        reply: oneshot::Sender<Option<Facility>>,
    },
    Facilities {
        reply: oneshot::Sender<Vec<Facility>>,
    },
    Stop,
}

#[derive(Debug)]
enum Timer {
    Refresh { serial: String, force: bool },
    Discovery,
}

enum FetchResult {
    Discovery(Result<Vec<FacilityInfo>, CoreError>),
    Refresh {
        serial: String,
        force: bool,
        result: Result<Snapshot, CoreError>,
    },
}

// ── Handle ───────────────────────────────────────────────────────

/// Cloneable handle to the poller actor.
#[derive(Clone)]
pub struct PollerHandle {
    tx: mpsc::UnboundedSender<PollerMessage>,
    events: broadcast::Sender<PollerEvent>,
}

impl PollerHandle {
    /// Spawn the actor and start facility discovery.
    pub fn spawn<S: FacilitySource>(
        source: Arc<S>,
        config: SyncConfig,
        events: broadcast::Sender<PollerEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = PollerActor {
            source,
            config,
            rx,
            events: events.clone(),
            cancel,
            facilities: BTreeMap::new(),
            registry: ObserverRegistry::new(),
            timers: DelayQueue::new(),
            discovery_timer: None,
            fetches: JoinSet::new(),
            replays: Vec::new(),
            phase: DiscoveryPhase::Listing,
        };
        tokio::spawn(actor.run());
        Self { tx, events }
    }

    /// Observe one quantity of a facility.
    ///
    /// The callback is invoked once with the value at subscription time
    /// (`previous: None`), then on every change.
    pub async fn subscribe(
        &self,
        serial: &str,
        quantity: Quantity,
        callback: Callback,
    ) -> Result<SubscriptionId, CoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(PollerMessage::Subscribe {
            serial: serial.to_owned(),
            quantity,
            callback,
            reply,
        })?;
        rx.await.map_err(|_| CoreError::PollerStopped)?
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let _ = self.send(PollerMessage::Unsubscribe(id));
    }

    /// Refresh one facility now. `force` notifies every observer even if
    /// its value did not change.
    pub fn refresh(&self, serial: &str, force: bool) {
        let _ = self.send(PollerMessage::Refresh {
            serial: serial.to_owned(),
            force,
        });
    }

    /// A write succeeded: refresh every facility after the settle delay.
    pub fn command_completed(&self) {
        let _ = self.send(PollerMessage::CommandCompleted);
    }

    pub async fn facility(&self, serial: &str) -> Result<Option<Facility>, CoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(PollerMessage::Facility {
            serial: serial.to_owned(),
            reply,
        })?;
        rx.await.map_err(|_| CoreError::PollerStopped)
    }

    pub async fn facilities(&self) -> Result<Vec<Facility>, CoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(PollerMessage::Facilities { reply })?;
        rx.await.map_err(|_| CoreError::PollerStopped)
    }

    pub fn events(&self) -> broadcast::Receiver<PollerEvent> {
        self.events.subscribe()
    }

    /// Ask the actor to stop. Timers are dropped and in-flight fetches
    /// detached.
    pub fn stop(&self) {
        let _ = self.send(PollerMessage::Stop);
    }

    /// Resolves once the actor has exited.
    pub async fn stopped(&self) {
        self.tx.closed().await;
    }

    fn send(&self, message: PollerMessage) -> Result<(), CoreError> {
        self.tx.send(message).map_err(|_| CoreError::PollerStopped)
    }
}

// ── Actor ────────────────────────────────────────────────────────

struct FacilityEntry {
    facility: Facility,
    in_flight: bool,
    /// A refresh requested during the in-flight one, with its force flag.
    queued: Option<bool>,
    timer: Option<delay_queue::Key>,
    last_success: Option<Instant>,
}

enum DiscoveryPhase {
    /// Waiting for the first successful facility list.
    Listing,
    /// Initial refreshes still running for these serials.
    Settling(HashSet<String>),
    Done,
}

struct PollerActor<S> {
    source: Arc<S>,
    config: SyncConfig,
    rx: mpsc::UnboundedReceiver<PollerMessage>,
    events: broadcast::Sender<PollerEvent>,
    cancel: CancellationToken,
    facilities: BTreeMap<String, FacilityEntry>,
    registry: ObserverRegistry,
    timers: DelayQueue<Timer>,
    discovery_timer: Option<delay_queue::Key>,
    fetches: JoinSet<FetchResult>,
    /// Subscription replays, delivered at the top of the next loop turn.
    replays: Vec<(SubscriptionId, Option<ObservedValue>)>,
    phase: DiscoveryPhase,
}

impl<S: FacilitySource> PollerActor<S> {
    async fn run(mut self) {
        info!(
            polling_secs = self.config.polling_interval().as_secs(),
            "poller started"
        );
        self.start_discovery();

        loop {
            self.flush_replays();

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                message = self.rx.recv() => match message {
                    None | Some(PollerMessage::Stop) => break,
                    Some(message) => self.handle_message(message),
                },
                Some(expired) = self.timers.next() => self.handle_timer(expired.into_inner()),
                Some(joined) = self.fetches.join_next() => match joined {
                    Ok(result) => self.handle_fetch(result),
                    Err(e) => warn!(error = %e, "fetch task failed"),
                },
            }
        }

        self.timers.clear();
        self.fetches.detach_all();
        info!("poller stopped");
    }

    fn handle_message(&mut self, message: PollerMessage) {
        match message {
            PollerMessage::Subscribe {
                serial,
                quantity,
                callback,
                reply,
            } => {
                let result = match self.facilities.get(&serial) {
                    None => Err(CoreError::FacilityNotFound { serial }),
                    Some(entry) => {
                        let current = quantity.read(&entry.facility);
                        let id = self
                            .registry
                            .register(&serial, quantity, callback, current.clone());
                        self.replays.push((id, current));
                        Ok(id)
                    }
                };
                let _ = reply.send(result);
            }
            PollerMessage::Unsubscribe(id) => {
                if self.registry.remove(id) {
                    debug!(subscription = %id, "observer removed");
                }
            }
            PollerMessage::Refresh { serial, force } => self.request_refresh(&serial, force),
            PollerMessage::CommandCompleted => self.schedule_refresh_all(),
            PollerMessage::Facility { serial, reply } => {
                let facility = self.facilities.get(&serial).map(|e| e.facility.clone());
                let _ = reply.send(facility);
            }
            PollerMessage::Facilities { reply } => {
                let facilities = self
                    .facilities
                    .values()
                    .map(|e| e.facility.clone())
                    .collect();
                let _ = reply.send(facilities);
            }
            PollerMessage::Stop => {}
        }
    }

    fn handle_timer(&mut self, timer: Timer) {
        match timer {
            Timer::Refresh { serial, force } => {
                if let Some(entry) = self.facilities.get_mut(&serial) {
                    entry.timer = None;
                }
                self.request_refresh(&serial, force);
            }
            Timer::Discovery => {
                self.discovery_timer = None;
                self.start_discovery();
            }
        }
    }

    fn handle_fetch(&mut self, result: FetchResult) {
        match result {
            FetchResult::Discovery(result) => self.complete_discovery(result),
            FetchResult::Refresh {
                serial,
                force,
                result,
            } => self.complete_refresh(&serial, force, result),
        }
    }

    fn flush_replays(&mut self) {
        for (id, current) in std::mem::take(&mut self.replays) {
            self.registry.replay(id, current);
        }
    }

    // ── Discovery ────────────────────────────────────────────────

    fn start_discovery(&mut self) {
        debug!("listing facilities");
        let source = Arc::clone(&self.source);
        self.fetches
            .spawn(async move { FetchResult::Discovery(source.list_facilities().await) });
    }

    fn complete_discovery(&mut self, result: Result<Vec<FacilityInfo>, CoreError>) {
        let list = match result {
            Ok(list) => list,
            Err(e) => {
                let retry = self.config.discovery_retry;
                warn!(error = %e, retry_secs = retry.as_secs(), "facility discovery failed");
                if let Some(key) = self.discovery_timer.take() {
                    self.timers.remove(&key);
                }
                self.discovery_timer = Some(self.timers.insert(Timer::Discovery, retry));
                return;
            }
        };

        info!(count = list.len(), "facilities listed");
        let mut fresh = Vec::new();
        for info in list {
            if self.facilities.contains_key(&info.serial_number) {
                continue;
            }
            let description = FacilityDescription::from_info(info, self.config.rooms_disabled);
            let serial = description.serial.clone();
            self.facilities.insert(
                serial.clone(),
                FacilityEntry {
                    facility: Facility::new(description),
                    in_flight: false,
                    queued: None,
                    timer: None,
                    last_success: None,
                },
            );
            fresh.push(serial);
        }

        if matches!(self.phase, DiscoveryPhase::Listing) {
            if fresh.is_empty() {
                self.finish_discovery();
            } else {
                self.phase = DiscoveryPhase::Settling(fresh.iter().cloned().collect());
            }
        }

        for serial in fresh {
            self.request_refresh(&serial, false);
        }
    }

    /// Mark the initial refresh of `serial` as settled, successful or not.
    fn settle_initial(&mut self, serial: &str) {
        if let DiscoveryPhase::Settling(pending) = &mut self.phase {
            pending.remove(serial);
            if pending.is_empty() {
                self.finish_discovery();
            }
        }
    }

    fn finish_discovery(&mut self) {
        self.phase = DiscoveryPhase::Done;
        info!(facilities = self.facilities.len(), "discovery complete");
        let _ = self.events.send(PollerEvent::DiscoveryComplete);
    }

    // ── Refresh ──────────────────────────────────────────────────

    fn request_refresh(&mut self, serial: &str, force: bool) {
        let Some(entry) = self.facilities.get_mut(serial) else {
            warn!(%serial, "refresh requested for unknown facility");
            return;
        };
        if let Some(key) = entry.timer.take() {
            self.timers.remove(&key);
        }
        if entry.in_flight {
            debug!(%serial, "refresh in flight, queueing");
            entry.queued = Some(entry.queued.unwrap_or(false) || force);
            return;
        }

        entry.in_flight = true;
        let include_rooms = entry.facility.description.room_by_room;
        let source = Arc::clone(&self.source);
        let serial = serial.to_owned();
        self.fetches.spawn(async move {
            let result = source.fetch_state(&serial, include_rooms).await;
            FetchResult::Refresh {
                serial,
                force,
                result,
            }
        });
    }

    fn complete_refresh(&mut self, serial: &str, force: bool, result: Result<Snapshot, CoreError>) {
        let interval = self.config.polling_interval();
        let Some(entry) = self.facilities.get_mut(serial) else {
            return;
        };
        entry.in_flight = false;

        let mut discovered = false;
        match result {
            Ok(snapshot) => {
                let status = &mut entry.facility.status;
                status.stale = false;
                status.last_refresh = Some(Utc::now());
                if !status.initialized {
                    status.initialized = true;
                    discovered = true;
                }
                entry.facility.snapshot = Some(Arc::new(snapshot));
                entry.last_success = Some(Instant::now());
                debug!(%serial, name = %entry.facility.name(), "facility refreshed");
            }
            Err(e) => {
                if e.is_conflict() {
                    entry.facility.status.stale = true;
                }
                warn!(%serial, name = %entry.facility.name(), error = %e, "facility refresh failed");
            }
        }

        if entry.facility.status.initialized {
            let desynchronized = entry
                .facility
                .snapshot
                .as_ref()
                .is_some_and(|s| s.desynchronized);
            let disconnected = entry
                .last_success
                .is_none_or(|at| at.elapsed() > interval * 2);
            let status = &mut entry.facility.status;
            status.cloud_disconnected = disconnected;
            status.stale |= desynchronized;
        }

        if discovered {
            info!(%serial, name = %entry.facility.name(), "facility discovered");
            let _ = self
                .events
                .send(PollerEvent::FacilityDiscovered(Arc::new(entry.facility.clone())));
        }

        let fired = self.registry.notify(&entry.facility, force);
        if fired > 0 {
            debug!(%serial, fired, "observers notified");
        }

        let queued = entry.queued.take();
        let timer_pending = entry.timer.is_some();
        self.settle_initial(serial);

        match queued {
            Some(force) => self.request_refresh(serial, force),
            // A post-command refresh scheduled during the fetch wins.
            None if timer_pending => {}
            None => self.schedule_refresh(serial, false, interval),
        }
    }

    fn schedule_refresh(&mut self, serial: &str, force: bool, delay: Duration) {
        let Some(entry) = self.facilities.get_mut(serial) else {
            return;
        };
        if let Some(key) = entry.timer.take() {
            self.timers.remove(&key);
        }
        entry.timer = Some(self.timers.insert(
            Timer::Refresh {
                serial: serial.to_owned(),
                force,
            },
            delay,
        ));
    }

    fn schedule_refresh_all(&mut self) {
        let delay = self.config.post_command_refresh;
        debug!(delay_secs = delay.as_secs(), "command completed, scheduling refresh");
        let serials: Vec<String> = self.facilities.keys().cloned().collect();
        for serial in serials {
            self.schedule_refresh(&serial, true, delay);
        }
    }
}
