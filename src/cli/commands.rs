//! CLI command implementations
//!
//! Both commands start from the same boot sequence: load config, build the
//! schema registry, open the record store. `serve` then starts the HTTP
//! server on a tokio runtime owned by this thread.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::logging;
use crate::rest_api::RestServer;
use crate::store::RecordStore;

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Entry point: parse CLI args and dispatch
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(&config, port),
        Command::Check { config } => check(&config).map(|summary| println!("{}", summary)),
    }
}

/// Builds the store described by `config`, loading its snapshot if any.
pub fn open_store(config: &Config) -> CliResult<RecordStore> {
    let registry = config.registry()?;
    let store = match &config.data_file {
        Some(path) => RecordStore::open(registry, path)?,
        None => RecordStore::new(registry),
    };
    Ok(store)
}

/// Validate config and snapshot, returning a short summary.
pub fn check(config_path: &Path) -> CliResult<String> {
    let config = Config::load(config_path)?;
    let store = open_store(&config)?;

    let mut lines = vec![format!("config: {}", config_path.display())];
    for name in store.collection_names()? {
        let schema = store.schema(&name)?;
        let records = store.count(&name, None)?;
        lines.push(format!(
            "  {} ({} fields, {} records)",
            name,
            schema.fields.len(),
            records
        ));
    }
    for assoc in &config.associations {
        lines.push(format!(
            "  {} -> {} via {}",
            assoc.parent, assoc.child, assoc.foreign_key
        ));
    }
    Ok(lines.join("\n"))
}

/// Boot and serve until ctrl-c.
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = Config::load(config_path)?;
    if let Some(port) = port {
        config.port = port;
    }
    logging::init(config.log_format);

    let addr = config.socket_addr()?;
    let store = Arc::new(open_store(&config)?);
    info!(
        collections = config.collections.len(),
        associations = config.associations.len(),
        persistent = config.data_file.is_some(),
        "store ready"
    );

    let server = RestServer::new(store).with_cors_origins(config.cors_origins.clone());

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start(addr)
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })?;

    Ok(())
}
