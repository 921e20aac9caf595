// Request catalogue
//
// Every call the client makes is described by an `ApiRequest`: verb, path
// relative to the API base, optional JSON payload and a short description
// used in logs and the query log. Write requests double as command
// descriptors -- their path is the resource key the dispatcher groups on.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{Display, EnumString};

/// HTTP verbs used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        }
    }
}

/// One logical HTTP call against the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    pub description: &'static str,
    /// Login-phase request: sent without an established session and never
    /// written to the query log (carries credentials).
    #[serde(skip)]
    pub unauthenticated: bool,
}

impl ApiRequest {
    fn get(path: String, description: &'static str) -> Self {
        Self {
            method: Method::Get,
            path,
            body: None,
            description,
            unauthenticated: false,
        }
    }

    fn put(path: String, body: Value, description: &'static str) -> Self {
        Self {
            method: Method::Put,
            path,
            body: Some(body),
            description,
            unauthenticated: false,
        }
    }

    /// The resource key of a write: requests sharing it replace each other.
    pub fn resource_key(&self) -> &str {
        &self.path
    }

    // ── Authentication ──────────────────────────────────────────────

    /// `POST /account/authentication/v1/token/new`
    pub fn token_exchange(body: Value) -> Self {
        Self {
            method: Method::Post,
            path: "/account/authentication/v1/token/new".into(),
            body: Some(body),
            description: "Login",
            unauthenticated: true,
        }
    }

    /// `POST /account/authentication/v1/authenticate`
    pub fn authorize(body: Value) -> Self {
        Self {
            method: Method::Post,
            path: "/account/authentication/v1/authenticate".into(),
            body: Some(body),
            description: "Authorization",
            unauthenticated: true,
        }
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn facilities() -> Self {
        Self::get("/facilities".into(), "Get facilities")
    }

    pub fn full_system(serial: &str) -> Self {
        Self::get(
            format!("/facilities/{serial}/systemcontrol/v1"),
            "Get facility details",
        )
    }

    pub fn status(serial: &str) -> Self {
        Self::get(
            format!("/facilities/{serial}/systemcontrol/v1/status"),
            "Get facility status",
        )
    }

    pub fn live_report(serial: &str) -> Self {
        Self::get(
            format!("/facilities/{serial}/livereport/v1"),
            "Get facility live report",
        )
    }

    pub fn gateway(serial: &str) -> Self {
        Self::get(
            format!("/facilities/{serial}/public/v1/gatewayType"),
            "Get facility gateway information",
        )
    }

    pub fn rooms(serial: &str) -> Self {
        Self::get(
            format!("/facilities/{serial}/rbr/v1/rooms"),
            "Get facility room-by-room information",
        )
    }

    // ── Writes ──────────────────────────────────────────────────────

    pub fn set_zone_setpoint(serial: &str, zone: &str, temperature: f64) -> Self {
        Self::put(
            format!("{}/setpoint_temperature", zone_config(serial, zone)),
            json!({ "setpoint_temperature": temperature }),
            "Set Target Day Temp",
        )
    }

    pub fn set_zone_setback(serial: &str, zone: &str, temperature: f64) -> Self {
        Self::put(
            format!("{}/setback_temperature", zone_config(serial, zone)),
            json!({ "setback_temperature": temperature }),
            "Set Target Night Temp",
        )
    }

    pub fn set_zone_mode(serial: &str, zone: &str, mode: HeatingMode) -> Self {
        Self::put(
            format!("{}/mode", zone_config(serial, zone)),
            json!({ "mode": mode }),
            "Set Heating Mode",
        )
    }

    pub fn set_dhw_setpoint(serial: &str, dhw: &str, temperature: f64) -> Self {
        Self::put(
            format!("{}/temperature_setpoint", dhw_config(serial, dhw)),
            json!({ "temperature_setpoint": temperature }),
            "Set Water Target Temp",
        )
    }

    pub fn set_dhw_mode(serial: &str, dhw: &str, mode: DhwMode) -> Self {
        Self::put(
            format!("{}/operation_mode", dhw_config(serial, dhw)),
            json!({ "operation_mode": mode }),
            "Set Hot Water Mode",
        )
    }

    pub fn set_room_setpoint(serial: &str, room: u32, temperature: f64) -> Self {
        Self::put(
            format!("{}/temperatureSetpoint", room_config(serial, room)),
            json!({ "temperatureSetpoint": temperature }),
            "Set Room Target Temp",
        )
    }

    pub fn set_room_quick_veto(serial: &str, room: u32, temperature: f64, minutes: u32) -> Self {
        Self::put(
            format!("{}/quickVeto", room_config(serial, room)),
            json!({ "temperatureSetpoint": temperature, "duration": minutes }),
            "Set Room Quick Veto",
        )
    }

    pub fn set_room_mode(serial: &str, room: u32, mode: RoomMode) -> Self {
        Self::put(
            format!("{}/operationMode", room_config(serial, room)),
            json!({ "operationMode": mode }),
            "Set Room Operation Mode",
        )
    }
}

fn zone_config(serial: &str, zone: &str) -> String {
    format!("/facilities/{serial}/systemcontrol/v1/zones/{zone}/heating/configuration")
}

fn dhw_config(serial: &str, dhw: &str) -> String {
    format!("/facilities/{serial}/systemcontrol/v1/dhw/{dhw}/hotwater/configuration")
}

fn room_config(serial: &str, room: u32) -> String {
    format!("/facilities/{serial}/rbr/v1/rooms/{room}/configuration")
}

// ── Operating modes ─────────────────────────────────────────────────

/// Heating zone operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum HeatingMode {
    Auto,
    Day,
    Night,
    Off,
}

/// Domestic hot water operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum DhwMode {
    Auto,
    On,
    Off,
}

/// Room-by-room operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum RoomMode {
    Auto,
    Manual,
    Off,
}
