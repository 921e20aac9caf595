//! Clap derive structures for the `vrc9xx` CLI.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};
use vrc9xx_core::{DhwMode, HeatingMode, RoomMode};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vrc9xx -- watch and control Vaillant multiMATIC heating systems
#[derive(Debug, Parser)]
#[command(
    name = "vrc9xx",
    version,
    about = "Watch and control Vaillant multiMATIC (VRC9xx) heating systems",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, env = "VRC9XX_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default)
    Table,
    /// Pretty-printed JSON
    Json,
    /// One identifier per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the facilities registered with the account
    #[command(alias = "ls")]
    Facilities,

    /// Poll facilities and print every observed change until Ctrl-C
    Watch(WatchArgs),

    /// Change a setpoint or operating mode
    Set(SetArgs),

    /// Inspect the configuration
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only watch this facility
    #[arg(long, short = 's')]
    pub serial: Option<String>,
}

// ── Set ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Facility serial number
    #[arg(long, short = 's', env = "VRC9XX_SERIAL", global = true)]
    pub serial: Option<String>,

    #[command(subcommand)]
    pub command: SetCommand,
}

#[derive(Debug, Subcommand)]
pub enum SetCommand {
    /// Heating zone target temperature
    ZoneSetpoint {
        /// Zone id, e.g. Control_ZO1
        #[arg(long)]
        zone: String,
        temperature: f64,
    },

    /// Heating zone reduced (night) temperature
    ZoneSetback {
        #[arg(long)]
        zone: String,
        temperature: f64,
    },

    /// Heating zone operating mode (auto, day, night, off)
    ZoneMode {
        #[arg(long)]
        zone: String,
        #[arg(value_parser = parse_mode::<HeatingMode>)]
        mode: HeatingMode,
    },

    /// Hot water target temperature
    DhwSetpoint {
        /// Hot water circuit id, e.g. Control_DHW
        #[arg(long)]
        dhw: String,
        temperature: f64,
    },

    /// Hot water operating mode (auto, on, off)
    DhwMode {
        #[arg(long)]
        dhw: String,
        #[arg(value_parser = parse_mode::<DhwMode>)]
        mode: DhwMode,
    },

    /// Room target temperature
    RoomSetpoint {
        /// Room index
        #[arg(long)]
        room: u32,
        temperature: f64,
    },

    /// Temporary room override
    RoomQuickVeto {
        #[arg(long)]
        room: u32,
        temperature: f64,
        /// Override duration in minutes (defaults to api.rooms.veto_duration)
        #[arg(long)]
        duration: Option<u32>,
    },

    /// Room operating mode (auto, manual, off)
    RoomMode {
        #[arg(long)]
        room: u32,
        #[arg(value_parser = parse_mode::<RoomMode>)]
        mode: RoomMode,
    },
}

fn parse_mode<T>(s: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    T::from_str(s).map_err(|e| format!("{e}: {s}"))
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Print the effective configuration (password masked)
    Show,
}
