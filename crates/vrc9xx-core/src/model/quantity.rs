// Observable quantities
//
// A `Quantity` names one scalar inside a facility record. Observers
// subscribe to quantities; after each refresh the poller reads them back
// and compares against the last delivered value.

use std::fmt;

use serde::Serialize;

use super::facility::Facility;

/// A scalar value read from a facility.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ObservedValue {
    Number(f64),
    Text(String),
    Flag(bool),
}

impl fmt::Display for ObservedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Flag(b) => write!(f, "{b}"),
        }
    }
}

/// Delivered to an observer callback.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub current: Option<ObservedValue>,
    /// `None` on the subscription replay.
    pub previous: Option<ObservedValue>,
}

/// Typed path to one value in a facility record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Quantity {
    ZoneInsideTemperature { zone: String },
    ZoneActiveFunction { zone: String },
    ZoneSetpoint { zone: String },
    ZoneSetback { zone: String },
    ZoneMode { zone: String },
    /// A live-report measurement attached to a hot water circuit.
    DhwMeasurement { dhw: String, report: String },
    DhwSetpoint { dhw: String },
    DhwMode { dhw: String },
    RoomCurrentTemperature { room: u32 },
    RoomSetpoint { room: u32 },
    RoomMode { room: u32 },
    RoomBatteryLow { room: u32 },
    OutsideTemperature,
    /// Stale or unsynchronized gateway data.
    GatewayDesynchronized,
    CloudDisconnected,
}

impl Quantity {
    /// Resolve this quantity against a facility. `None` when the path does
    /// not exist (unknown zone, missing field, no snapshot yet).
    pub fn read(&self, facility: &Facility) -> Option<ObservedValue> {
        use ObservedValue::{Flag, Number, Text};

        match self {
            Self::GatewayDesynchronized => return Some(Flag(facility.status.stale)),
            Self::CloudDisconnected => return Some(Flag(facility.status.cloud_disconnected)),
            _ => {}
        }

        let snapshot = facility.snapshot.as_deref()?;
        match self {
            Self::ZoneInsideTemperature { zone } => {
                snapshot.zones.get(zone)?.inside_temperature.map(Number)
            }
            Self::ZoneActiveFunction { zone } => {
                snapshot.zones.get(zone)?.active_function.clone().map(Text)
            }
            Self::ZoneSetpoint { zone } => {
                snapshot.zones.get(zone)?.setpoint_temperature.map(Number)
            }
            Self::ZoneSetback { zone } => snapshot.zones.get(zone)?.setback_temperature.map(Number),
            Self::ZoneMode { zone } => snapshot.zones.get(zone)?.mode.clone().map(Text),
            Self::DhwMeasurement { dhw, report } => snapshot
                .dhw
                .get(dhw)?
                .measurements
                .get(report)?
                .value
                .map(Number),
            Self::DhwSetpoint { dhw } => snapshot.dhw.get(dhw)?.temperature_setpoint.map(Number),
            Self::DhwMode { dhw } => snapshot.dhw.get(dhw)?.operation_mode.clone().map(Text),
            Self::RoomCurrentTemperature { room } => {
                snapshot.rooms.as_ref()?.get(room)?.current_temperature.map(Number)
            }
            Self::RoomSetpoint { room } => {
                snapshot.rooms.as_ref()?.get(room)?.temperature_setpoint.map(Number)
            }
            Self::RoomMode { room } => snapshot
                .rooms
                .as_ref()?
                .get(room)?
                .operation_mode
                .clone()
                .map(Text),
            Self::RoomBatteryLow { room } => {
                Some(Flag(snapshot.rooms.as_ref()?.get(room)?.battery_low))
            }
            Self::OutsideTemperature => snapshot.outside_temperature.map(Number),
            Self::GatewayDesynchronized | Self::CloudDisconnected => None,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZoneInsideTemperature { zone } => write!(f, "zones.{zone}.inside_temperature"),
            Self::ZoneActiveFunction { zone } => write!(f, "zones.{zone}.active_function"),
            Self::ZoneSetpoint { zone } => write!(f, "zones.{zone}.setpoint_temperature"),
            Self::ZoneSetback { zone } => write!(f, "zones.{zone}.setback_temperature"),
            Self::ZoneMode { zone } => write!(f, "zones.{zone}.mode"),
            Self::DhwMeasurement { dhw, report } => write!(f, "dhw.{dhw}.measurements.{report}"),
            Self::DhwSetpoint { dhw } => write!(f, "dhw.{dhw}.temperature_setpoint"),
            Self::DhwMode { dhw } => write!(f, "dhw.{dhw}.operation_mode"),
            Self::RoomCurrentTemperature { room } => write!(f, "rooms.{room}.current_temperature"),
            Self::RoomSetpoint { room } => write!(f, "rooms.{room}.temperature_setpoint"),
            Self::RoomMode { room } => write!(f, "rooms.{room}.operation_mode"),
            Self::RoomBatteryLow { room } => write!(f, "rooms.{room}.battery_low"),
            Self::OutsideTemperature => f.write_str("outside_temperature"),
            Self::GatewayDesynchronized => f.write_str("gateway_desynchronized"),
            Self::CloudDisconnected => f.write_str("cloud_disconnected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::model::{FacilityDescription, Room, Snapshot, Zone};

    fn facility() -> Facility {
        let mut zones = BTreeMap::new();
        zones.insert(
            "Z1".to_owned(),
            Zone {
                id: "Z1".into(),
                name: "Living".into(),
                inside_temperature: Some(21.0),
                active_function: Some("HEATING".into()),
                mode: Some("AUTO".into()),
                setpoint_temperature: Some(21.5),
                setback_temperature: None,
                controlled_by: None,
            },
        );
        let mut rooms = BTreeMap::new();
        rooms.insert(
            2,
            Room {
                index: 2,
                name: "Bedroom".into(),
                current_temperature: Some(19.5),
                temperature_setpoint: Some(20.0),
                operation_mode: Some("MANUAL".into()),
                battery_low: true,
            },
        );
        let mut facility = Facility::new(FacilityDescription {
            serial: "ABC123".into(),
            name: "Home".into(),
            firmware: None,
            capabilities: Vec::new(),
            room_by_room: true,
        });
        facility.snapshot = Some(Arc::new(Snapshot {
            zones,
            rooms: Some(rooms),
            outside_temperature: Some(3.5),
            ..Snapshot::default()
        }));
        facility
    }

    #[test]
    fn reads_typed_values() {
        let facility = facility();
        let zone = || "Z1".to_owned();

        assert_eq!(
            Quantity::ZoneInsideTemperature { zone: zone() }.read(&facility),
            Some(ObservedValue::Number(21.0))
        );
        assert_eq!(
            Quantity::ZoneMode { zone: zone() }.read(&facility),
            Some(ObservedValue::Text("AUTO".into()))
        );
        assert_eq!(
            Quantity::RoomBatteryLow { room: 2 }.read(&facility),
            Some(ObservedValue::Flag(true))
        );
        assert_eq!(
            Quantity::OutsideTemperature.read(&facility),
            Some(ObservedValue::Number(3.5))
        );
    }

    #[test]
    fn missing_paths_resolve_to_none() {
        let facility = facility();
        assert_eq!(Quantity::ZoneSetback { zone: "Z1".into() }.read(&facility), None);
        assert_eq!(Quantity::ZoneSetpoint { zone: "Z9".into() }.read(&facility), None);
        assert_eq!(Quantity::RoomMode { room: 7 }.read(&facility), None);
        assert_eq!(Quantity::DhwMode { dhw: "Control_DHW".into() }.read(&facility), None);
    }

    #[test]
    fn status_flags_resolve_without_snapshot() {
        let mut facility = facility();
        facility.snapshot = None;
        facility.status.cloud_disconnected = true;
        assert_eq!(
            Quantity::CloudDisconnected.read(&facility),
            Some(ObservedValue::Flag(true))
        );
        assert_eq!(
            Quantity::GatewayDesynchronized.read(&facility),
            Some(ObservedValue::Flag(true))
        );
        assert_eq!(Quantity::OutsideTemperature.read(&facility), None);
    }
}
