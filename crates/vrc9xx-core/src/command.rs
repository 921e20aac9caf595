// ── Command API ──
//
// All writes flow through the `Command` enum. Each variant maps to exactly
// one `ApiRequest`; its path is the resource key the dispatcher coalesces on.

use vrc9xx_api::{ApiRequest, DhwMode, HeatingMode, RoomMode};

/// All write operations against a facility.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ── Heating zones ────────────────────────────────────────────────
    SetZoneSetpoint {
        serial: String,
        zone: String,
        temperature: f64,
    },
    SetZoneSetback {
        serial: String,
        zone: String,
        temperature: f64,
    },
    SetZoneMode {
        serial: String,
        zone: String,
        mode: HeatingMode,
    },

    // ── Hot water ────────────────────────────────────────────────────
    SetDhwSetpoint {
        serial: String,
        dhw: String,
        temperature: f64,
    },
    SetDhwMode {
        serial: String,
        dhw: String,
        mode: DhwMode,
    },

    // ── Rooms ────────────────────────────────────────────────────────
    SetRoomSetpoint {
        serial: String,
        room: u32,
        temperature: f64,
    },
    SetRoomQuickVeto {
        serial: String,
        room: u32,
        temperature: f64,
        duration_minutes: u32,
    },
    SetRoomMode {
        serial: String,
        room: u32,
        mode: RoomMode,
    },
}

impl Command {
    pub fn serial(&self) -> &str {
        match self {
            Self::SetZoneSetpoint { serial, .. }
            | Self::SetZoneSetback { serial, .. }
            | Self::SetZoneMode { serial, .. }
            | Self::SetDhwSetpoint { serial, .. }
            | Self::SetDhwMode { serial, .. }
            | Self::SetRoomSetpoint { serial, .. }
            | Self::SetRoomQuickVeto { serial, .. }
            | Self::SetRoomMode { serial, .. } => serial,
        }
    }

    /// The HTTP request carrying this write.
    pub fn to_request(&self) -> ApiRequest {
        match self {
            Self::SetZoneSetpoint {
                serial,
                zone,
                temperature,
            } => ApiRequest::set_zone_setpoint(serial, zone, *temperature),
            Self::SetZoneSetback {
                serial,
                zone,
                temperature,
            } => ApiRequest::set_zone_setback(serial, zone, *temperature),
            Self::SetZoneMode { serial, zone, mode } => {
                ApiRequest::set_zone_mode(serial, zone, *mode)
            }
            Self::SetDhwSetpoint {
                serial,
                dhw,
                temperature,
            } => ApiRequest::set_dhw_setpoint(serial, dhw, *temperature),
            Self::SetDhwMode { serial, dhw, mode } => ApiRequest::set_dhw_mode(serial, dhw, *mode),
            Self::SetRoomSetpoint {
                serial,
                room,
                temperature,
            } => ApiRequest::set_room_setpoint(serial, *room, *temperature),
            Self::SetRoomQuickVeto {
                serial,
                room,
                temperature,
                duration_minutes,
            } => ApiRequest::set_room_quick_veto(serial, *room, *temperature, *duration_minutes),
            Self::SetRoomMode { serial, room, mode } => {
                ApiRequest::set_room_mode(serial, *room, *mode)
            }
        }
    }
}
