//! Command dispatch: bridges CLI args -> page actions -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod query;
pub mod share;
pub mod window;

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// Dispatch a state-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Query(args) => query::handle(args, resolved, global).await,
        Command::Devices(args) => devices::handle(args, resolved, global),
        Command::Window(args) => window::handle(&args.bounds, resolved, global),
        Command::Share => share::handle(resolved, global),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
