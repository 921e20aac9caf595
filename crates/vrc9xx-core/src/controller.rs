// ── Controller abstraction ──
//
// Lifecycle facade for one multiMATIC account: logs in, runs the facility
// poller and the command dispatcher, and exposes subscriptions, events
// and writes to the presentation layer.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vrc9xx_api::models::FacilityInfo;
use vrc9xx_api::{
    AuthState, DhwMode, HeatingMode, QueryLog, RoomMode, Session, TransportConfig, VaillantClient,
};

use crate::command::Command;
use crate::config::ControllerConfig;
use crate::dispatcher::{CommandDispatcher, CommandTicket, CompletionHook};
use crate::error::CoreError;
use crate::model::{Change, Facility, Quantity};
use crate::observer::SubscriptionId;
use crate::poller::{EVENT_CHANNEL_SIZE, PollerEvent, PollerHandle};
use crate::source::FacilitySource;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    client: VaillantClient,
    events: broadcast::Sender<PollerEvent>,
    running: Mutex<Option<Running>>,
}

/// Background machinery that exists between `start` and `stop`.
struct Running {
    poller: PollerHandle,
    dispatcher: CommandDispatcher<VaillantClient>,
    cancel: CancellationToken,
}

impl Controller {
    /// Create a controller. Does NOT log in -- call
    /// [`connect()`](Self::connect), then [`start()`](Self::start).
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let query_log = config
            .query_log_dir
            .as_deref()
            .map(QueryLog::create)
            .transpose()?
            .map(Arc::new);
        let transport = TransportConfig {
            base_url: config.base_url.clone(),
            timeout: config.timeout,
            retry: config.retry,
        };
        let session = Session::new(config.credentials.clone(), transport, query_log)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                client: VaillantClient::new(Arc::new(session)),
                events,
                running: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &VaillantClient {
        &self.inner.client
    }

    /// Observe session state transitions.
    pub fn auth_state(&self) -> watch::Receiver<AuthState> {
        self.inner.client.session().state_changes()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Log in. Failures here are fatal to the caller; later session
    /// expiries are recovered transparently.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.inner.client.session().log_in(false).await?;
        info!(username = %self.inner.client.session().username(), "connected");
        Ok(())
    }

    /// Start discovery, polling and the command dispatcher.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut running = self.inner.running.lock().await;
        if running.is_some() {
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let sync = self.inner.config.sync.clone();
        let poller = PollerHandle::spawn(
            Arc::new(self.inner.client.clone()),
            sync.clone(),
            self.inner.events.clone(),
            cancel.child_token(),
        );

        let notify = poller.clone();
        let on_complete: CompletionHook = Arc::new(move || notify.command_completed());
        let dispatcher = CommandDispatcher::new(
            self.inner.client.clone(),
            sync.quiescence,
            sync.settle,
            on_complete,
        );

        *running = Some(Running {
            poller,
            dispatcher,
            cancel,
        });
        info!("controller started");
        Ok(())
    }

    /// Stop the poller and dispatcher. Pending commands resolve as failed.
    pub async fn stop(&self) {
        let Some(running) = self.inner.running.lock().await.take() else {
            return;
        };
        running.dispatcher.shutdown();
        running.poller.stop();
        running.poller.stopped().await;
        running.cancel.cancel();
        debug!("controller stopped");
    }

    // ── Observation ──────────────────────────────────────────────

    /// Discovery events. Subscribe before [`start()`](Self::start) to see
    /// every facility.
    pub fn events(&self) -> broadcast::Receiver<PollerEvent> {
        self.inner.events.subscribe()
    }

    pub async fn subscribe<F>(
        &self,
        serial: &str,
        quantity: Quantity,
        callback: F,
    ) -> Result<SubscriptionId, CoreError>
    where
        F: FnMut(Change) + Send + 'static,
    {
        self.poller()
            .await?
            .subscribe(serial, quantity, Box::new(callback))
            .await
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), CoreError> {
        self.poller().await?.unsubscribe(id);
        Ok(())
    }

    /// Refresh one facility now, notifying every observer.
    pub async fn refresh(&self, serial: &str) -> Result<(), CoreError> {
        self.poller().await?.refresh(serial, true);
        Ok(())
    }

    pub async fn facility(&self, serial: &str) -> Result<Facility, CoreError> {
        self.poller()
            .await?
            .facility(serial)
            .await?
            .ok_or_else(|| CoreError::FacilityNotFound {
                serial: serial.to_owned(),
            })
    }

    pub async fn facilities(&self) -> Result<Vec<Facility>, CoreError> {
        self.poller().await?.facilities().await
    }

    /// One-off facility listing, without starting the poller.
    pub async fn list_facilities(&self) -> Result<Vec<FacilityInfo>, CoreError> {
        FacilitySource::list_facilities(&self.inner.client).await
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Queue a write through the dispatcher.
    pub async fn execute(&self, command: Command) -> Result<CommandTicket, CoreError> {
        let running = self.inner.running.lock().await;
        let running = running.as_ref().ok_or(CoreError::PollerStopped)?;
        debug!(serial = %command.serial(), ?command, "dispatching command");
        Ok(running.dispatcher.dispatch(command.to_request()))
    }

    pub async fn set_zone_setpoint(
        &self,
        serial: &str,
        zone: &str,
        temperature: f64,
    ) -> Result<CommandTicket, CoreError> {
        self.execute(Command::SetZoneSetpoint {
            serial: serial.to_owned(),
            zone: zone.to_owned(),
            temperature,
        })
        .await
    }

    pub async fn set_zone_setback(
        &self,
        serial: &str,
        zone: &str,
        temperature: f64,
    ) -> Result<CommandTicket, CoreError> {
        self.execute(Command::SetZoneSetback {
            serial: serial.to_owned(),
            zone: zone.to_owned(),
            temperature,
        })
        .await
    }

    pub async fn set_zone_mode(
        &self,
        serial: &str,
        zone: &str,
        mode: HeatingMode,
    ) -> Result<CommandTicket, CoreError> {
        self.execute(Command::SetZoneMode {
            serial: serial.to_owned(),
            zone: zone.to_owned(),
            mode,
        })
        .await
    }

    pub async fn set_dhw_setpoint(
        &self,
        serial: &str,
        dhw: &str,
        temperature: f64,
    ) -> Result<CommandTicket, CoreError> {
        self.execute(Command::SetDhwSetpoint {
            serial: serial.to_owned(),
            dhw: dhw.to_owned(),
            temperature,
        })
        .await
    }

    pub async fn set_dhw_mode(
        &self,
        serial: &str,
        dhw: &str,
        mode: DhwMode,
    ) -> Result<CommandTicket, CoreError> {
        self.execute(Command::SetDhwMode {
            serial: serial.to_owned(),
            dhw: dhw.to_owned(),
            mode,
        })
        .await
    }

    pub async fn set_room_setpoint(
        &self,
        serial: &str,
        room: u32,
        temperature: f64,
    ) -> Result<CommandTicket, CoreError> {
        self.execute(Command::SetRoomSetpoint {
            serial: serial.to_owned(),
            room,
            temperature,
        })
        .await
    }

    /// Temporary room override. `duration_minutes` defaults to the
    /// configured veto duration.
    pub async fn set_room_quick_veto(
        &self,
        serial: &str,
        room: u32,
        temperature: f64,
        duration_minutes: Option<u32>,
    ) -> Result<CommandTicket, CoreError> {
        self.execute(Command::SetRoomQuickVeto {
            serial: serial.to_owned(),
            room,
            temperature,
            duration_minutes: duration_minutes.unwrap_or(self.inner.config.sync.veto_duration),
        })
        .await
    }

    pub async fn set_room_mode(
        &self,
        serial: &str,
        room: u32,
        mode: RoomMode,
    ) -> Result<CommandTicket, CoreError> {
        self.execute(Command::SetRoomMode {
            serial: serial.to_owned(),
            room,
            mode,
        })
        .await
    }

    async fn poller(&self) -> Result<PollerHandle, CoreError> {
        self.inner
            .running
            .lock()
            .await
            .as_ref()
            .map(|running| running.poller.clone())
            .ok_or(CoreError::PollerStopped)
    }
}
