//! Schema error types
//!
//! Structural errors are raised while a schema set is being built and abort
//! startup. Validation errors reject a single write.

use std::fmt;

use thiserror::Error;

/// Validation failure details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Field name
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// What was found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "field to be present", "missing")
    }

    pub fn extra_field(field: impl Into<String>) -> Self {
        Self::new(field, "no undeclared fields", "extra field present")
    }

    pub fn reserved_field(field: impl Into<String>) -> Self {
        Self::new(field, "field not set by caller", "system-managed field")
    }

    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(field, expected, actual)
    }

    pub fn null_value(field: impl Into<String>) -> Self {
        Self::new(field, "non-null value", "null")
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}': expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Schema errors
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// Collection declaration is malformed
    #[error("Invalid collection '{collection}': {reason}")]
    InvalidCollection { collection: String, reason: String },

    /// Collection declared twice
    #[error("Collection '{0}' is already defined")]
    DuplicateCollection(String),

    /// Collection name not declared
    #[error("Unknown collection: '{0}'")]
    UnknownCollection(String),

    /// Association declaration is malformed
    #[error("Invalid association {parent} -> {child}: {reason}")]
    InvalidAssociation {
        parent: String,
        child: String,
        reason: String,
    },

    /// Payload is not an object
    #[error("Payload for '{collection}' must be a JSON object, got {actual}")]
    NotAnObject { collection: String, actual: String },

    /// Payload violates the collection schema
    #[error("Validation failed for '{collection}': {details}")]
    ValidationFailed {
        collection: String,
        details: ValidationDetails,
    },
}

impl SchemaError {
    /// Create a validation failed error
    pub fn validation_failed(collection: impl Into<String>, details: ValidationDetails) -> Self {
        SchemaError::ValidationFailed {
            collection: collection.into(),
            details,
        }
    }

    /// Validation details if applicable
    pub fn details(&self) -> Option<&ValidationDetails> {
        match self {
            SchemaError::ValidationFailed { details, .. } => Some(details),
            _ => None,
        }
    }

    /// Whether the error is raised by a rejected payload (as opposed to a bad schema)
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            SchemaError::NotAnObject { .. } | SchemaError::ValidationFailed { .. }
        )
    }
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
