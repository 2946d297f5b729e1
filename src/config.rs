//! Service configuration
//!
//! Loaded from a JSON file. Every key except `collections` has a default.
//!
//! ```json
//! {
//!   "port": 3000,
//!   "data_file": "./data/relstore.snapshot",
//!   "collections": [
//!     { "name": "users", "fields": { "name": { "type": "string", "required": true } } }
//!   ],
//!   "associations": [
//!     { "parent": "users", "child": "posts", "foreignKey": "userId" }
//!   ]
//! }
//! ```

use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LogFormat;
use crate::schema::{AssociationDef, CollectionSchema, SchemaError, SchemaRegistry};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid listen address '{0}'")]
    InvalidAddress(String),

    #[error("No collections configured")]
    NoCollections,

    #[error("Invalid schema: {0}")]
    Schema(#[from] SchemaError),
}

/// Top-level configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Snapshot file; absent keeps everything in memory
    #[serde(default)]
    pub data_file: Option<PathBuf>,

    #[serde(default)]
    pub log_format: LogFormat,

    /// CORS allowed origins, empty allows any
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub collections: Vec<CollectionSchema>,

    #[serde(default)]
    pub associations: Vec<AssociationDef>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Checks everything that can be checked without touching the data file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        if self.collections.is_empty() {
            return Err(ConfigError::NoCollections);
        }
        self.registry()?;
        Ok(())
    }

    /// Builds the schema registry from the declared collections.
    pub fn registry(&self) -> Result<SchemaRegistry, ConfigError> {
        Ok(SchemaRegistry::build(
            self.collections.clone(),
            self.associations.clone(),
        )?)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or(ConfigError::InvalidAddress(addr))
    }
}
