// ── Wire to domain conversion ──
//
// Folds the composite API responses of one facility into a `Snapshot`:
// zones, hot water circuits and rooms are re-keyed by id, inactive zones
// dropped, TEMPERATURE reports attached to their circuit and room battery
// state collapsed into one flag.

use std::collections::BTreeMap;

use vrc9xx_api::models::{
    Envelope, GatewayInfo, LiveReport, RoomBody, RoomsBody, SystemBody, SystemStatus,
};

use crate::model::{HotWater, Measurement, Room, Snapshot, Zone};

/// Raw responses of one refresh cycle.
#[derive(Debug, Clone)]
pub struct RawFacilityState {
    pub system: Envelope<SystemBody>,
    pub live_report: Envelope<LiveReport>,
    pub status: Envelope<SystemStatus>,
    pub gateway: Envelope<GatewayInfo>,
    pub rooms: Option<Envelope<RoomsBody>>,
}

impl RawFacilityState {
    fn is_desynchronized(&self) -> bool {
        self.system.is_desynchronized()
            || self.live_report.is_desynchronized()
            || self.status.is_desynchronized()
            || self.gateway.is_desynchronized()
            || self.rooms.as_ref().is_some_and(Envelope::is_desynchronized)
    }
}

/// Normalize one refresh cycle into a snapshot.
pub fn normalize(raw: RawFacilityState) -> Snapshot {
    let desynchronized = raw.is_desynchronized();
    let RawFacilityState {
        system,
        live_report,
        status,
        gateway,
        rooms,
    } = raw;
    let system = system.body;

    let zones = system
        .zones
        .into_iter()
        .filter(|zone| zone.configuration.enabled)
        .map(|zone| {
            let heating = zone.heating.map(|h| h.configuration);
            let zone = Zone {
                name: zone.configuration.name.trim().to_owned(),
                inside_temperature: zone.configuration.inside_temperature,
                active_function: zone.configuration.active_function,
                mode: heating.as_ref().and_then(|h| h.mode.clone()),
                setpoint_temperature: heating.as_ref().and_then(|h| h.setpoint_temperature),
                setback_temperature: heating.as_ref().and_then(|h| h.setback_temperature),
                controlled_by: zone.currently_controlled_by.map(|c| c.name),
                id: zone.id,
            };
            (zone.id.clone(), zone)
        })
        .collect();

    let mut devices = live_report.body.devices;
    let dhw = system
        .dhw
        .into_iter()
        .map(|circuit| {
            let measurements = devices
                .iter_mut()
                .find(|device| device.id == circuit.id)
                .map(|device| {
                    std::mem::take(&mut device.reports)
                        .into_iter()
                        .filter(|report| report.is_temperature())
                        .map(|report| {
                            let measurement = Measurement {
                                name: report.name.trim().to_owned(),
                                value: report.value,
                                unit: report.unit,
                                id: report.id,
                            };
                            (measurement.id.clone(), measurement)
                        })
                        .collect()
                })
                .unwrap_or_default();
            let config = circuit.hotwater.map(|h| h.configuration);
            let hot_water = HotWater {
                operation_mode: config.as_ref().and_then(|c| c.operation_mode.clone()),
                temperature_setpoint: config.as_ref().and_then(|c| c.temperature_setpoint),
                measurements,
                id: circuit.id,
            };
            (hot_water.id.clone(), hot_water)
        })
        .collect();

    let rooms = rooms.map(|envelope| {
        envelope
            .body
            .rooms
            .into_iter()
            .map(|room| (room.room_index, room_from_wire(room)))
            .collect::<BTreeMap<_, _>>()
    });

    Snapshot {
        datetime: system.status.datetime.or(status.body.datetime),
        outside_temperature: system
            .status
            .outside_temperature
            .or(status.body.outside_temperature),
        zones,
        dhw,
        rooms,
        gateway_type: gateway.body.gateway_type,
        desynchronized,
    }
}

fn room_from_wire(room: RoomBody) -> Room {
    let config = room.configuration;
    Room {
        index: room.room_index,
        name: config.name.trim().to_owned(),
        current_temperature: config.current_temperature,
        temperature_setpoint: config.temperature_setpoint,
        operation_mode: config.operation_mode,
        battery_low: config.devices.iter().any(|device| device.is_battery_low),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::de::DeserializeOwned;
    use serde_json::{Value, json};

    use super::*;

    fn envelope<T: DeserializeOwned>(value: Value) -> Envelope<T> {
        serde_json::from_value(value).unwrap()
    }

    fn raw(system: Value, rooms: Option<Value>) -> RawFacilityState {
        RawFacilityState {
            system: envelope(system),
            live_report: envelope(json!({
                "body": {
                    "devices": [{
                        "_id": "Control_DHW",
                        "name": "Hot water",
                        "reports": [
                            {
                                "_id": "DomesticHotWaterTankTemperature",
                                "name": " Tank temperature ",
                                "value": 48.5,
                                "unit": "°C",
                                "measurement_category": "TEMPERATURE"
                            },
                            {
                                "_id": "WaterPressureSensor",
                                "name": "Pressure",
                                "value": 1.8,
                                "unit": "bar",
                                "measurement_category": "PRESSURE"
                            }
                        ]
                    }]
                }
            })),
            status: envelope(json!({ "body": { "datetime": "2024-01-01T10:00:00Z" } })),
            gateway: envelope(json!({ "body": { "gatewayType": "VR920" } })),
            rooms: rooms.map(envelope),
        }
    }

    fn system() -> Value {
        json!({
            "body": {
                "status": { "outside_temperature": 4.5 },
                "zones": [
                    {
                        "_id": "Z2",
                        "configuration": { "name": "Attic", "enabled": false }
                    },
                    {
                        "_id": "Z1",
                        "configuration": {
                            "name": " Living ",
                            "enabled": true,
                            "inside_temperature": 21.0,
                            "active_function": "HEATING"
                        },
                        "heating": {
                            "configuration": {
                                "mode": "AUTO",
                                "setpoint_temperature": 21.5,
                                "setback_temperature": 17.0
                            }
                        },
                        "currently_controlled_by": { "name": "RBR" }
                    }
                ],
                "dhw": [{
                    "_id": "Control_DHW",
                    "hotwater": {
                        "configuration": { "operation_mode": "ON", "temperature_setpoint": 50.0 }
                    }
                }]
            },
            "meta": { "resourceState": [{ "state": "SYNCED" }] }
        })
    }

    #[test]
    fn filters_inactive_zones_and_keys_by_id() {
        let snapshot = normalize(raw(system(), None));

        assert_eq!(snapshot.zones.keys().collect::<Vec<_>>(), vec!["Z1"]);
        let zone = &snapshot.zones["Z1"];
        assert_eq!(zone.name, "Living");
        assert_eq!(zone.setpoint_temperature, Some(21.5));
        assert!(zone.is_room_controlled());
        assert_eq!(snapshot.outside_temperature, Some(4.5));
        assert_eq!(snapshot.datetime.as_deref(), Some("2024-01-01T10:00:00Z"));
        assert_eq!(snapshot.gateway_type.as_deref(), Some("VR920"));
        assert!(snapshot.rooms.is_none());
        assert!(!snapshot.desynchronized);
    }

    #[test]
    fn attaches_temperature_reports_to_hot_water() {
        let snapshot = normalize(raw(system(), None));

        let circuit = &snapshot.dhw["Control_DHW"];
        assert_eq!(circuit.operation_mode.as_deref(), Some("ON"));
        assert_eq!(
            circuit.measurements.keys().collect::<Vec<_>>(),
            vec!["DomesticHotWaterTankTemperature"]
        );
        let tank = &circuit.measurements[HotWater::TANK_TEMPERATURE];
        assert_eq!(tank.name, "Tank temperature");
        assert_eq!(tank.value, Some(48.5));
    }

    #[test]
    fn rooms_carry_battery_flag() {
        let rooms = json!({
            "body": {
                "rooms": [
                    {
                        "roomIndex": 1,
                        "configuration": {
                            "name": "Office",
                            "currentTemperature": 20.5,
                            "devices": [{ "isBatteryLow": false }, { "isBatteryLow": true }]
                        }
                    },
                    {
                        "roomIndex": 0,
                        "configuration": { "name": "Kitchen", "devices": [] }
                    }
                ]
            },
            "meta": { "resourceState": [{ "state": "OUTDATED" }] }
        });
        let snapshot = normalize(raw(system(), Some(rooms)));

        let rooms = snapshot.rooms.as_ref().unwrap();
        assert_eq!(rooms.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert!(rooms[&1].battery_low);
        assert!(!rooms[&0].battery_low);
        assert!(snapshot.desynchronized);
    }

    #[test]
    fn equivalent_payloads_normalize_identically() {
        let reordered = json!({
            "meta": { "resourceState": [{ "state": "SYNCED" }] },
            "body": {
                "dhw": [{
                    "hotwater": {
                        "configuration": { "temperature_setpoint": 50.0, "operation_mode": "ON" }
                    },
                    "_id": "Control_DHW",
                    "extra": "ignored"
                }],
                "zones": [
                    {
                        "heating": {
                            "configuration": {
                                "setback_temperature": 17.0,
                                "setpoint_temperature": 21.5,
                                "mode": "AUTO"
                            }
                        },
                        "currently_controlled_by": { "name": "RBR" },
                        "configuration": {
                            "active_function": "HEATING",
                            "inside_temperature": 21.0,
                            "enabled": true,
                            "name": " Living "
                        },
                        "_id": "Z1"
                    },
                    {
                        "configuration": { "enabled": false, "name": "Attic" },
                        "_id": "Z2"
                    }
                ],
                "status": { "outside_temperature": 4.5 }
            }
        });

        assert_eq!(normalize(raw(system(), None)), normalize(raw(reordered, None)));
    }
}
