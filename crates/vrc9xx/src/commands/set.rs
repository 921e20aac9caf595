//! Write command handlers.
//!
//! Every write goes through the controller's dispatcher, so the process
//! stays up for the quiescence window before the request is sent.

use vrc9xx_core::{Command as CoreCommand, CommandOutcome, Controller};

use crate::cli::{GlobalOpts, SetArgs, SetCommand};
use crate::error::CliError;

pub async fn handle(
    controller: &Controller,
    args: SetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    controller.connect().await?;
    let serial = match args.serial {
        Some(serial) => serial,
        None => only_facility(controller).await?,
    };
    let veto_duration = controller.config().sync.veto_duration;
    let command = to_core_command(serial, args.command, veto_duration)?;

    controller.start().await?;
    let outcome = match controller.execute(command).await {
        Ok(ticket) => ticket.outcome().await,
        Err(e) => CommandOutcome::Failed(e),
    };
    controller.stop().await;

    match outcome {
        CommandOutcome::Sent => {
            if !global.quiet {
                eprintln!("Command sent");
            }
            Ok(())
        }
        CommandOutcome::Superseded => {
            if !global.quiet {
                eprintln!("Command superseded by a newer one");
            }
            Ok(())
        }
        CommandOutcome::Failed(e) => Err(e.into()),
    }
}

/// The account's only facility, for invocations without `--serial`.
async fn only_facility(controller: &Controller) -> Result<String, CliError> {
    let mut facilities = controller.list_facilities().await?;
    match facilities.len() {
        1 => Ok(facilities.remove(0).serial_number),
        n => Err(CliError::Validation {
            field: "--serial".into(),
            reason: format!("required when the account has {n} facilities"),
        }),
    }
}

fn to_core_command(
    serial: String,
    command: SetCommand,
    veto_duration: u32,
) -> Result<CoreCommand, CliError> {
    Ok(match command {
        SetCommand::ZoneSetpoint { zone, temperature } => CoreCommand::SetZoneSetpoint {
            serial,
            zone,
            temperature: check_temperature(temperature)?,
        },
        SetCommand::ZoneSetback { zone, temperature } => CoreCommand::SetZoneSetback {
            serial,
            zone,
            temperature: check_temperature(temperature)?,
        },
        SetCommand::ZoneMode { zone, mode } => CoreCommand::SetZoneMode { serial, zone, mode },
        SetCommand::DhwSetpoint { dhw, temperature } => CoreCommand::SetDhwSetpoint {
            serial,
            dhw,
            temperature: check_temperature(temperature)?,
        },
        SetCommand::DhwMode { dhw, mode } => CoreCommand::SetDhwMode { serial, dhw, mode },
        SetCommand::RoomSetpoint { room, temperature } => CoreCommand::SetRoomSetpoint {
            serial,
            room,
            temperature: check_temperature(temperature)?,
        },
        SetCommand::RoomQuickVeto {
            room,
            temperature,
            duration,
        } => CoreCommand::SetRoomQuickVeto {
            serial,
            room,
            temperature: check_temperature(temperature)?,
            duration_minutes: duration.unwrap_or(veto_duration),
        },
        SetCommand::RoomMode { room, mode } => CoreCommand::SetRoomMode { serial, room, mode },
    })
}

fn check_temperature(temperature: f64) -> Result<f64, CliError> {
    if temperature.is_finite() {
        Ok(temperature)
    } else {
        Err(CliError::Validation {
            field: "temperature".into(),
            reason: format!("not a number: {temperature}"),
        })
    }
}
