use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// git-autocommit command-line interface
#[derive(Parser, Debug, Clone)]
#[command(
    name = "git-autocommit",
    version,
    about = "Monitor directory changes and create automatic commits",
    long_about = None
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv). `RUST_LOG` overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start monitoring a directory
    Start {
        /// Directory to monitor (defaults to the current directory)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
}
