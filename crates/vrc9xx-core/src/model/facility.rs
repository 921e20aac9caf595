use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use vrc9xx_api::models::FacilityInfo;

use super::snapshot::Snapshot;

/// Static description of an installation, from the facility list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacilityDescription {
    pub serial: String,
    pub name: String,
    pub firmware: Option<String>,
    pub capabilities: Vec<String>,
    /// Room-by-room data is available and not disabled by configuration.
    pub room_by_room: bool,
}

impl FacilityDescription {
    pub fn from_info(info: FacilityInfo, rooms_disabled: bool) -> Self {
        let mut room_by_room = info.has_room_by_room();
        if room_by_room && rooms_disabled {
            info!(
                serial = %info.serial_number,
                "facility reports room-by-room but it is disabled by config"
            );
            room_by_room = false;
        }
        Self {
            serial: info.serial_number,
            name: info.name.trim().to_owned(),
            firmware: info.firmware_version,
            capabilities: info.capabilities,
            room_by_room,
        }
    }
}

/// Health of a facility's data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FacilityStatus {
    /// The first refresh succeeded.
    pub initialized: bool,
    /// Last refresh hit a 409, or the gateway reported unsynchronized data.
    pub stale: bool,
    /// No successful refresh for more than twice the polling interval.
    pub cloud_disconnected: bool,
    pub last_refresh: Option<DateTime<Utc>>,
}

/// One installation: description, health and the latest snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facility {
    pub description: FacilityDescription,
    pub status: FacilityStatus,
    pub snapshot: Option<Arc<Snapshot>>,
}

impl Facility {
    /// A freshly discovered facility: not initialized, stale, no snapshot.
    pub fn new(description: FacilityDescription) -> Self {
        Self {
            description,
            status: FacilityStatus {
                stale: true,
                ..FacilityStatus::default()
            },
            snapshot: None,
        }
    }

    pub fn serial(&self) -> &str {
        &self.description.serial
    }

    pub fn name(&self) -> &str {
        &self.description.name
    }
}
