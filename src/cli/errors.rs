//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status.

use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StoreError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// Snapshot could not be loaded or written
    StorageError,
    /// Runtime or listener failed
    BootFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "RELSTORE_CONFIG_ERROR",
            Self::StorageError => "RELSTORE_STORAGE_ERROR",
            Self::BootFailed => "RELSTORE_BOOT_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error("RELSTORE_CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    #[error("RELSTORE_STORAGE_ERROR: {0}")]
    Storage(#[from] StoreError),

    #[error("RELSTORE_BOOT_FAILED: {0}")]
    Boot(String),
}

impl CliError {
    /// Boot failed
    pub fn boot_failed(msg: impl Into<String>) -> Self {
        CliError::Boot(msg.into())
    }

    /// Get the error code
    pub fn code(&self) -> CliErrorCode {
        match self {
            CliError::Config(_) => CliErrorCode::ConfigError,
            CliError::Storage(_) => CliErrorCode::StorageError,
            CliError::Boot(_) => CliErrorCode::BootFailed,
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
