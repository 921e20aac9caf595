// ── Remote seams ──
//
// The poller and the dispatcher talk to the API through these two traits.
// `VaillantClient` implements both; tests substitute in-memory fakes.

use std::future::Future;

use vrc9xx_api::models::FacilityInfo;
use vrc9xx_api::{ApiRequest, VaillantClient};

use crate::convert::{RawFacilityState, normalize};
use crate::error::CoreError;
use crate::model::Snapshot;

/// Where facility lists and snapshots come from.
pub trait FacilitySource: Send + Sync + 'static {
    fn list_facilities(&self) -> impl Future<Output = Result<Vec<FacilityInfo>, CoreError>> + Send;

    /// Fetch and normalize the composite state of one facility.
    fn fetch_state(
        &self,
        serial: &str,
        include_rooms: bool,
    ) -> impl Future<Output = Result<Snapshot, CoreError>> + Send;
}

/// Sends one outbound write.
pub trait CommandExecutor: Send + Sync + 'static {
    fn execute(&self, request: &ApiRequest) -> impl Future<Output = Result<(), CoreError>> + Send;
}

impl FacilitySource for VaillantClient {
    async fn list_facilities(&self) -> Result<Vec<FacilityInfo>, CoreError> {
        Ok(VaillantClient::list_facilities(self)
            .await?
            .body
            .facilities_list)
    }

    async fn fetch_state(&self, serial: &str, include_rooms: bool) -> Result<Snapshot, CoreError> {
        let rooms = async {
            if include_rooms {
                self.get_rooms(serial).await.map(Some)
            } else {
                Ok(None)
            }
        };
        let (system, live_report, status, gateway, rooms) = futures_util::try_join!(
            self.get_full_system(serial),
            self.get_live_report(serial),
            self.get_status(serial),
            self.get_gateway(serial),
            rooms,
        )?;
        Ok(normalize(RawFacilityState {
            system,
            live_report,
            status,
            gateway,
            rooms,
        }))
    }
}

impl CommandExecutor for VaillantClient {
    async fn execute(&self, request: &ApiRequest) -> Result<(), CoreError> {
        self.send(request).await?;
        Ok(())
    }
}
