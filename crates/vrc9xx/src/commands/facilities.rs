//! Facility listing.

use tabled::Tabled;
use vrc9xx_core::{Controller, FacilityDescription};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct FacilityRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
    #[tabled(rename = "Room-by-room")]
    room_by_room: String,
}

impl From<&FacilityDescription> for FacilityRow {
    fn from(f: &FacilityDescription) -> Self {
        Self {
            serial: f.serial.clone(),
            name: f.name.clone(),
            firmware: f.firmware.clone().unwrap_or_default(),
            room_by_room: if f.room_by_room { "yes" } else { "no" }.into(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    controller.connect().await?;
    let rooms_disabled = controller.config().sync.rooms_disabled;
    let facilities: Vec<FacilityDescription> = controller
        .list_facilities()
        .await?
        .into_iter()
        .map(|info| FacilityDescription::from_info(info, rooms_disabled))
        .collect();

    let out = output::render_list(
        &global.output,
        &facilities,
        |f| FacilityRow::from(f),
        |f| f.serial.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
