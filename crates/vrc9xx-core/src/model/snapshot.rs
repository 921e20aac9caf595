// Facility state snapshot
//
// Typed, immutable view of one facility as of its last successful refresh.
// Built by `convert::normalize` and replaced wholesale on every poll.

use std::collections::BTreeMap;

use serde::Serialize;

/// Normalized composite state of one facility.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    /// Controller clock as reported by the system status.
    pub datetime: Option<String>,
    pub outside_temperature: Option<f64>,
    /// Active heating zones keyed by zone id.
    pub zones: BTreeMap<String, Zone>,
    /// Hot water circuits keyed by circuit id.
    pub dhw: BTreeMap<String, HotWater>,
    /// Rooms keyed by room index. `None` when room-by-room is not fetched.
    pub rooms: Option<BTreeMap<u32, Room>>,
    pub gateway_type: Option<String>,
    /// Some upstream resource state was not `SYNCED`.
    pub desynchronized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub inside_temperature: Option<f64>,
    pub active_function: Option<String>,
    pub mode: Option<String>,
    pub setpoint_temperature: Option<f64>,
    pub setback_temperature: Option<f64>,
    /// Name of the controlling function, e.g. `RBR` when rooms drive the zone.
    pub controlled_by: Option<String>,
}

impl Zone {
    pub const ROOM_BY_ROOM_CONTROLLER: &'static str = "RBR";

    /// `true` when room-by-room regulation drives this zone.
    pub fn is_room_controlled(&self) -> bool {
        self.controlled_by.as_deref() == Some(Self::ROOM_BY_ROOM_CONTROLLER)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotWater {
    pub id: String,
    pub operation_mode: Option<String>,
    pub temperature_setpoint: Option<f64>,
    /// TEMPERATURE live-report measurements keyed by report id.
    pub measurements: BTreeMap<String, Measurement>,
}

impl HotWater {
    pub const TANK_TEMPERATURE: &'static str = "DomesticHotWaterTankTemperature";
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub id: String,
    pub name: String,
    pub value: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Room {
    pub index: u32,
    pub name: String,
    pub current_temperature: Option<f64>,
    pub temperature_setpoint: Option<f64>,
    pub operation_mode: Option<String>,
    /// Any device in the room reports a low battery.
    pub battery_low: bool,
}
