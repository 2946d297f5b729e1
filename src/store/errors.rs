//! Record store errors
//!
//! Every failure falls into one of four kinds: validation, not found,
//! constraint, storage. None of them is fatal to the process.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::schema::SchemaError;

/// Broad classification used by callers to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing fields, bad predicate, bad schema
    Validation,
    /// Collection or record does not exist
    NotFound,
    /// Association link target missing
    Constraint,
    /// Underlying storage failure
    Storage,
}

/// Errors raised by the record store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Payload or schema rejected
    #[error("{0}")]
    Validation(SchemaError),

    /// Predicate references something the collection does not have
    #[error("Invalid predicate on '{collection}': {reason}")]
    InvalidPredicate { collection: String, reason: String },

    /// Collection not declared
    #[error("Collection not found: '{0}'")]
    CollectionNotFound(String),

    /// Record required by the caller does not exist
    #[error("{collection} with id {id} not found")]
    RecordNotFound { collection: String, id: u64 },

    /// No association declared between two collections
    #[error("No association '{name}' declared on '{parent}'")]
    AssociationNotFound { parent: String, name: String },

    /// Foreign key references a parent that does not exist
    #[error("{child}.{foreign_key} references missing {parent} with id {parent_id}")]
    Constraint {
        parent: String,
        child: String,
        foreign_key: String,
        parent_id: String,
    },

    /// Snapshot file could not be read or written
    #[error("Snapshot I/O failed on '{path}': {source}")]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Snapshot file is damaged
    #[error("Snapshot '{path}' is corrupted: {details}")]
    CorruptSnapshot { path: PathBuf, details: String },

    /// Internal storage failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<SchemaError> for StoreError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::UnknownCollection(name) => StoreError::CollectionNotFound(name),
            other => StoreError::Validation(other),
        }
    }
}

impl StoreError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation(_) | StoreError::InvalidPredicate { .. } => ErrorKind::Validation,
            StoreError::CollectionNotFound(_)
            | StoreError::RecordNotFound { .. }
            | StoreError::AssociationNotFound { .. } => ErrorKind::NotFound,
            StoreError::Constraint { .. } => ErrorKind::Constraint,
            StoreError::SnapshotIo { .. }
            | StoreError::CorruptSnapshot { .. }
            | StoreError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn lock_poisoned() -> Self {
        StoreError::Storage("store lock poisoned".to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
