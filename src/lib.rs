pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod logging;

use anyhow::Result;

/// Entry point for CLI subcommands.
///
/// # Errors
/// Returns an error if the invoked subcommand fails.
pub fn run(cli: &cli::Cli, ctx: &app::context::AppContext) -> Result<()> {
    let result = commands::dispatch(cli, ctx);
    logging::init::flush_logs();
    result
}
