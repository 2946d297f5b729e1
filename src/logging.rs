//! Logging initialization
//!
//! One `tracing` subscriber per process. `RUST_LOG` overrides the default
//! filter of `relstore=info`.

use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "relstore=info,tower_http=info";

/// Output format of log events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

static INIT_ONCE: Once = Once::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Later calls are no-ops, as is a call made
/// after some other subscriber was installed.
pub fn init(format: LogFormat) {
    INIT_ONCE.call_once(|| {
        let result = match format {
            LogFormat::Pretty => tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .try_init(),
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(env_filter())
                .try_init(),
        };
        if let Err(e) = result {
            eprintln!("logging already initialized: {}", e);
        }
    });
}
