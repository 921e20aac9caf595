//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod config_cmd;
pub mod facilities;
pub mod set;
pub mod watch;

use vrc9xx_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a controller-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Facilities => facilities::handle(controller, global).await,
        Command::Watch(args) => watch::handle(controller, args, global).await,
        Command::Set(args) => set::handle(controller, args, global).await,
        // Handled before a controller is built
        Command::Config(args) => config_cmd::handle(args, global),
    }
}
