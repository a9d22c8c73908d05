//! Command dispatch: bridges CLI args -> polling coordinator -> output formatting.

pub mod config_cmd;
pub mod fetch;
pub mod sensors;
pub mod watch;

use poolcare_core::PoolConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command that needs account credentials.
pub async fn dispatch(
    cmd: Command,
    config: PoolConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Fetch => fetch::handle(config, global).await,
        Command::Sensors => sensors::handle(config, global).await,
        Command::Watch => watch::handle(config, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Config {
            message: "command does not take a pool connection".into(),
        }),
    }
}
