// ── Facility descriptor ──
//
// Pure transform from a refreshed facility into the named sensors,
// regulators and switches a presentation layer exposes. Every entry
// carries the `Quantity` it observes.

use std::collections::HashSet;

use serde::Serialize;

use crate::model::{Facility, HotWater, Quantity};

/// Read-only temperature sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorDescriptor {
    pub id: String,
    pub name: String,
    pub quantity: Quantity,
}

/// Heating zone regulated directly (not through room-by-room).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneRegulator {
    pub name: String,
    pub zone: String,
    pub current_temperature: Quantity,
    pub active_function: Quantity,
    pub setpoint: Quantity,
    pub setback: Quantity,
    pub mode: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DhwRegulator {
    pub name: String,
    pub dhw: String,
    pub tank_temperature: Quantity,
    pub setpoint: Quantity,
    pub operation_mode: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomRegulator {
    pub name: String,
    pub room: u32,
    pub current_temperature: Quantity,
    pub battery_low: Quantity,
    pub setpoint: Quantity,
    pub operation_mode: Quantity,
}

/// Health switch. On while the underlying flag is `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchDescriptor {
    pub name: String,
    pub quantity: Quantity,
}

/// Everything a presentation layer needs to expose one facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacilityDescriptor {
    pub serial: String,
    pub name: String,
    pub firmware: Option<String>,
    pub gateway: Option<String>,
    pub sensors: Vec<SensorDescriptor>,
    pub zone_regulators: Vec<ZoneRegulator>,
    pub dhw_regulators: Vec<DhwRegulator>,
    pub room_regulators: Vec<RoomRegulator>,
    pub switches: Vec<SwitchDescriptor>,
}

impl FacilityDescriptor {
    /// Build the descriptor. `None` until the facility has a snapshot.
    pub fn build(facility: &Facility) -> Option<Self> {
        let snapshot = facility.snapshot.as_deref()?;
        let serial = facility.serial();
        let name = facility.name();

        let mut sensors = Vec::new();
        let mut zone_regulators = Vec::new();
        for (key, zone) in &snapshot.zones {
            if zone.is_room_controlled() {
                continue;
            }
            let zone_name = zone.name.trim();
            let zone_id = || key.clone();
            sensors.push(SensorDescriptor {
                id: format!("{serial}-{key}-inside_temperature"),
                name: format!("{name} - {zone_name} - Inside"),
                quantity: Quantity::ZoneInsideTemperature { zone: zone_id() },
            });
            zone_regulators.push(ZoneRegulator {
                name: format!("{name} - {zone_name}"),
                zone: zone_id(),
                current_temperature: Quantity::ZoneInsideTemperature { zone: zone_id() },
                active_function: Quantity::ZoneActiveFunction { zone: zone_id() },
                setpoint: Quantity::ZoneSetpoint { zone: zone_id() },
                setback: Quantity::ZoneSetback { zone: zone_id() },
                mode: Quantity::ZoneMode { zone: zone_id() },
            });
        }

        let mut room_regulators = Vec::new();
        for (&index, room) in snapshot.rooms.iter().flatten() {
            let room_name = room.name.trim();
            sensors.push(SensorDescriptor {
                id: format!("{serial}-{index}-room_temperature"),
                name: format!("{name} - {room_name} - Room"),
                quantity: Quantity::RoomCurrentTemperature { room: index },
            });
            room_regulators.push(RoomRegulator {
                name: format!("{name} - {room_name}"),
                room: index,
                current_temperature: Quantity::RoomCurrentTemperature { room: index },
                battery_low: Quantity::RoomBatteryLow { room: index },
                setpoint: Quantity::RoomSetpoint { room: index },
                operation_mode: Quantity::RoomMode { room: index },
            });
        }

        if snapshot.outside_temperature.is_some() {
            sensors.push(SensorDescriptor {
                id: format!("{serial}-outside_temperature"),
                name: format!("{name} - Outside"),
                quantity: Quantity::OutsideTemperature,
            });
        }

        let mut dhw_regulators = Vec::new();
        for (key, dhw) in &snapshot.dhw {
            for (report, measurement) in &dhw.measurements {
                sensors.push(SensorDescriptor {
                    id: format!("{serial}-{key}-{report}"),
                    name: format!("{name} - {}", measurement.name.trim()),
                    quantity: Quantity::DhwMeasurement {
                        dhw: key.clone(),
                        report: report.clone(),
                    },
                });
            }
            dhw_regulators.push(DhwRegulator {
                name: format!("{name} - Hot Water - {}", key.replacen('_', " ", 1)),
                dhw: key.clone(),
                tank_temperature: Quantity::DhwMeasurement {
                    dhw: key.clone(),
                    report: HotWater::TANK_TEMPERATURE.to_owned(),
                },
                setpoint: Quantity::DhwSetpoint { dhw: key.clone() },
                operation_mode: Quantity::DhwMode { dhw: key.clone() },
            });
        }

        let switches = vec![
            SwitchDescriptor {
                name: format!("{name} - Gateway Synced"),
                quantity: Quantity::GatewayDesynchronized,
            },
            SwitchDescriptor {
                name: format!("{name} - Cloud Connected"),
                quantity: Quantity::CloudDisconnected,
            },
        ];

        Some(Self {
            serial: serial.to_owned(),
            name: name.to_owned(),
            firmware: facility.description.firmware.clone(),
            gateway: snapshot.gateway_type.clone(),
            sensors,
            zone_regulators,
            dhw_regulators,
            room_regulators,
            switches,
        })
    }

    /// Every distinct quantity with a label, in declaration order.
    pub fn quantities(&self) -> Vec<(String, Quantity)> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut push = |label: &str, quantity: &Quantity| {
            if seen.insert(quantity.clone()) {
                out.push((label.to_owned(), quantity.clone()));
            }
        };

        for sensor in &self.sensors {
            push(&sensor.name, &sensor.quantity);
        }
        for r in &self.zone_regulators {
            for q in [&r.current_temperature, &r.active_function, &r.setpoint, &r.setback, &r.mode] {
                push(&r.name, q);
            }
        }
        for r in &self.dhw_regulators {
            for q in [&r.tank_temperature, &r.setpoint, &r.operation_mode] {
                push(&r.name, q);
            }
        }
        for r in &self.room_regulators {
            for q in [&r.current_temperature, &r.battery_low, &r.setpoint, &r.operation_mode] {
                push(&r.name, q);
            }
        }
        for switch in &self.switches {
            push(&switch.name, &switch.quantity);
        }
        out
    }
}
