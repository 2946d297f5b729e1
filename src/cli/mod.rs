//! CLI module
//!
//! Provides command-line interface for:
//! - serve: Load config and snapshot, then serve HTTP
//! - check: Validate config and snapshot without serving

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check, open_store, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
