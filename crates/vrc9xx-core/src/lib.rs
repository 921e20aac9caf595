//! Synchronization layer between `vrc9xx-api` and presentation consumers.
//!
//! - **[`Controller`]**: Facade over the whole lifecycle:
//!   [`connect()`](Controller::connect) logs in,
//!   [`start()`](Controller::start) spawns the facility poller and the
//!   command dispatcher, [`stop()`](Controller::stop) tears both down.
//!
//! - **[`PollerHandle`]**: Actor that discovers facilities, refreshes each
//!   one on its own timer and notifies observers of changed quantities.
//!   Refreshes of one facility never overlap.
//!
//! - **[`ObserverRegistry`]**: Per-facility `(quantity, callback, last
//!   value)` entries, owned by the poller.
//!
//! - **[`CommandDispatcher`]**: Coalesces writes per resource key: only the
//!   newest request of a burst is sent.
//!
//! - **Domain model** ([`model`]): Normalized [`Snapshot`]s and the typed
//!   [`Quantity`] paths into them.
//!
//! - **[`FacilityDescriptor`]**: Named sensors, regulators and switches
//!   derived from a refreshed facility.

pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod observer;
pub mod poller;
pub mod source;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::Command;
pub use config::{ControllerConfig, SyncConfig};
pub use controller::Controller;
pub use descriptor::{
    DhwRegulator, FacilityDescriptor, RoomRegulator, SensorDescriptor, SwitchDescriptor,
    ZoneRegulator,
};
pub use dispatcher::{CommandDispatcher, CommandOutcome, CommandTicket, CompletionHook};
pub use error::CoreError;
pub use observer::{Callback, ObserverRegistry, SubscriptionId};
pub use poller::{EVENT_CHANNEL_SIZE, PollerEvent, PollerHandle};
pub use source::{CommandExecutor, FacilitySource};

pub use model::{
    Change, Facility, FacilityDescription, FacilityStatus, HotWater, Measurement, ObservedValue,
    Quantity, Room, Snapshot, Zone,
};

// API types consumers need to build configs and commands.
pub use vrc9xx_api::{AuthState, Credentials, DEFAULT_BASE_URL, DhwMode, HeatingMode, RoomMode};
