//! Command dispatch: bridges CLI args -> core workflows -> output formatting.

pub mod config_cmd;
pub mod probe;
pub mod profiles;
pub mod scan;
pub mod util;
pub mod vlan;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Probe(args) => probe::probe(args, global).await,
        Command::ProbeRange(args) => probe::probe_range(args, global).await,
        Command::Scan(args) => scan::handle(args, global).await,
        Command::Vlan(args) => vlan::handle(args, global).await,
        Command::Profiles(args) => profiles::handle(args, global),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
