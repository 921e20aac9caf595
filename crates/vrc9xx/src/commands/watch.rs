//! Watch: subscribe to every quantity of every discovered facility and
//! print each change until Ctrl-C.

use std::io::Write;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use vrc9xx_core::{Change, Controller, Facility, FacilityDescriptor, ObservedValue, PollerEvent};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;

pub async fn handle(
    controller: &Controller,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    controller.connect().await?;

    // Subscribe before start so no discovery event is missed.
    let mut events = controller.events();
    controller.start().await?;

    let result = loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break Ok(()),
            event = events.recv() => match event {
                Ok(PollerEvent::FacilityDiscovered(facility)) => {
                    if args.serial.as_deref().is_some_and(|s| s != facility.serial()) {
                        continue;
                    }
                    if let Err(e) = watch_facility(controller, &facility, global.quiet).await {
                        break Err(e);
                    }
                }
                Ok(PollerEvent::DiscoveryComplete) => info!("discovery complete, watching"),
                Err(RecvError::Lagged(missed)) => warn!(missed, "event receiver lagged"),
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    controller.stop().await;
    result
}

async fn watch_facility(
    controller: &Controller,
    facility: &Facility,
    quiet: bool,
) -> Result<(), CliError> {
    let Some(descriptor) = FacilityDescriptor::build(facility) else {
        return Ok(());
    };
    info!(
        serial = %descriptor.serial,
        name = %descriptor.name,
        sensors = descriptor.sensors.len(),
        zones = descriptor.zone_regulators.len(),
        rooms = descriptor.room_regulators.len(),
        "watching facility"
    );

    for (label, quantity) in descriptor.quantities() {
        let key = quantity.to_string();
        controller
            .subscribe(&descriptor.serial, quantity, move |change: Change| {
                info!(%label, quantity = %key, current = ?change.current, "changed");
                if !quiet {
                    let line = format!(
                        "{label} [{key}]: {} -> {}",
                        display(change.previous.as_ref()),
                        display(change.current.as_ref())
                    );
                    let _ = writeln!(std::io::stdout().lock(), "{line}");
                }
            })
            .await?;
    }
    Ok(())
}

fn display(value: Option<&ObservedValue>) -> String {
    value.map_or_else(|| "-".into(), ToString::to_string)
}
