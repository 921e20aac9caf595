// Wire models
//
// Deserialization targets for the multiMATIC JSON responses. Every response
// is wrapped in an `{ "body": ..., "meta": { "resourceState": [...] } }`
// envelope. Fields the API omits on some installations are optional or
// defaulted; unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// Response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub body: T,
    #[serde(default)]
    pub meta: Option<ResponseMeta>,
}

impl<T> Envelope<T> {
    /// `true` when any resource state reports something other than `SYNCED`.
    pub fn is_desynchronized(&self) -> bool {
        self.meta
            .as_ref()
            .is_some_and(|meta| meta.resource_state.iter().any(|s| s.state != "SYNCED"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    #[serde(default)]
    pub resource_state: Vec<ResourceState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceState {
    pub state: String,
}

// ── Facilities ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitiesList {
    #[serde(default)]
    pub facilities_list: Vec<FacilityInfo>,
}

/// One entry of `GET /facilities`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityInfo {
    pub serial_number: String,
    pub name: String,
    #[serde(default)]
    pub firmware_version: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl FacilityInfo {
    pub const ROOM_BY_ROOM: &'static str = "ROOM_BY_ROOM";

    pub fn has_room_by_room(&self) -> bool {
        self.capabilities.iter().any(|c| c == Self::ROOM_BY_ROOM)
    }
}

// ── System control ──────────────────────────────────────────────────

/// `GET /facilities/{serial}/systemcontrol/v1`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemBody {
    #[serde(default)]
    pub status: SystemStatus,
    #[serde(default)]
    pub zones: Vec<ZoneBody>,
    #[serde(default)]
    pub dhw: Vec<DhwBody>,
}

/// Also the body of `GET /facilities/{serial}/systemcontrol/v1/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub outside_temperature: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneBody {
    #[serde(rename = "_id")]
    pub id: String,
    pub configuration: ZoneConfiguration,
    #[serde(default)]
    pub heating: Option<ZoneHeating>,
    #[serde(default)]
    pub currently_controlled_by: Option<ControlledBy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneConfiguration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub inside_temperature: Option<f64>,
    #[serde(default)]
    pub active_function: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneHeating {
    pub configuration: ZoneHeatingConfiguration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneHeatingConfiguration {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub setpoint_temperature: Option<f64>,
    #[serde(default)]
    pub setback_temperature: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlledBy {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DhwBody {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub hotwater: Option<DhwHotwater>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DhwHotwater {
    pub configuration: DhwConfiguration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DhwConfiguration {
    #[serde(default)]
    pub operation_mode: Option<String>,
    #[serde(default)]
    pub temperature_setpoint: Option<f64>,
}

// ── Live report ─────────────────────────────────────────────────────

/// `GET /facilities/{serial}/livereport/v1`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveReport {
    #[serde(default)]
    pub devices: Vec<ReportDevice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportDevice {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub reports: Vec<Report>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Report {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub measurement_category: Option<String>,
}

impl Report {
    pub const TEMPERATURE: &'static str = "TEMPERATURE";

    pub fn is_temperature(&self) -> bool {
        self.measurement_category.as_deref() == Some(Self::TEMPERATURE)
    }
}

// ── Gateway ─────────────────────────────────────────────────────────

/// `GET /facilities/{serial}/public/v1/gatewayType`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayInfo {
    #[serde(default)]
    pub gateway_type: Option<String>,
}

// ── Room by room ────────────────────────────────────────────────────

/// `GET /facilities/{serial}/rbr/v1/rooms`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomsBody {
    #[serde(default)]
    pub rooms: Vec<RoomBody>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBody {
    pub room_index: u32,
    pub configuration: RoomConfiguration,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomConfiguration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub temperature_setpoint: Option<f64>,
    #[serde(default)]
    pub operation_mode: Option<String>,
    #[serde(default)]
    pub current_temperature: Option<f64>,
    #[serde(default)]
    pub devices: Vec<RoomDevice>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDevice {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_battery_low: bool,
}
