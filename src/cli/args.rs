//! CLI argument definitions using clap
//!
//! Commands:
//! - relstore serve --config <path> [--port <port>]
//! - relstore check --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// relstore - typed JSON records over HTTP
#[derive(Parser, Debug)]
#[command(name = "relstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the schema and serve the REST API
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./relstore.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate the configuration and snapshot, then exit
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./relstore.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
