//! Command dispatch: bridges CLI args -> core workflows -> output formatting.

pub mod config_cmd;
pub mod disconnect;
pub mod ip;
pub mod regions;
pub mod resolve;
pub mod rotate;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Settings;
use crate::error::CliError;

/// Dispatch a profile-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    settings: &Settings,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Rotate(args) => rotate::handle(args, settings, global).await,
        Command::Watch(args) => watch::handle(args, settings, global).await,
        Command::Disconnect => disconnect::handle(settings, global).await,
        Command::Ip => ip::handle(settings, global).await,
        Command::Regions(args) => regions::handle(&args, settings, global),
        Command::Resolve(args) => resolve::handle(&args, settings, global),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
