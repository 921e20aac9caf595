// Typed API client
//
// Thin layer over the session: one method per remote read, each decoding
// the response envelope into its wire model. Writes go through `send`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, snippet};
use crate::models::{
    Envelope, FacilitiesList, GatewayInfo, LiveReport, RoomsBody, SystemBody, SystemStatus,
};
use crate::request::ApiRequest;
use crate::session::Session;

/// multiMATIC cloud client.
#[derive(Clone)]
pub struct VaillantClient {
    session: Arc<Session>,
}

impl VaillantClient {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Execute an arbitrary request (used for writes).
    pub async fn send(&self, request: &ApiRequest) -> Result<Value, Error> {
        self.session.query(request).await
    }

    pub async fn list_facilities(&self) -> Result<Envelope<FacilitiesList>, Error> {
        self.fetch(&ApiRequest::facilities()).await
    }

    pub async fn get_full_system(&self, serial: &str) -> Result<Envelope<SystemBody>, Error> {
        self.fetch(&ApiRequest::full_system(serial)).await
    }

    pub async fn get_status(&self, serial: &str) -> Result<Envelope<SystemStatus>, Error> {
        self.fetch(&ApiRequest::status(serial)).await
    }

    pub async fn get_live_report(&self, serial: &str) -> Result<Envelope<LiveReport>, Error> {
        self.fetch(&ApiRequest::live_report(serial)).await
    }

    pub async fn get_gateway(&self, serial: &str) -> Result<Envelope<GatewayInfo>, Error> {
        self.fetch(&ApiRequest::gateway(serial)).await
    }

    pub async fn get_rooms(&self, serial: &str) -> Result<Envelope<RoomsBody>, Error> {
        self.fetch(&ApiRequest::rooms(serial)).await
    }

    async fn fetch<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<Envelope<T>, Error> {
        let value = self.session.query(request).await?;
        decode(value)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    serde_json::from_value(value.clone()).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: snippet(&value.to_string()),
    })
}
