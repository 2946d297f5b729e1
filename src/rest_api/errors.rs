//! # REST API Errors
//!
//! Error types for the REST API module and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::schema::SchemaError;
use crate::store::{ErrorKind, StoreError};

/// Result type for REST operations
pub type RestResult<T> = Result<T, RestError>;

/// REST API errors
#[derive(Debug, Clone, Error)]
pub enum RestError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Invalid query parameter
    #[error("Invalid query parameter: {0}")]
    InvalidQueryParam(String),

    /// Path id is not a record identifier
    #[error("Invalid id: '{0}'")]
    InvalidId(String),

    /// Invalid request body
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Limit exceeds maximum
    #[error("Limit {0} exceeds maximum {1}")]
    LimitExceeded(usize, usize),

    /// Payload or predicate rejected by the schema
    #[error("{0}")]
    Validation(String),

    /// Collection, record or association not found
    #[error("{0}")]
    NotFound(String),

    /// Association target missing
    #[error("{0}")]
    Constraint(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Storage failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RestError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            RestError::InvalidQueryParam(_) => StatusCode::BAD_REQUEST,
            RestError::InvalidId(_) => StatusCode::BAD_REQUEST,
            RestError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            RestError::LimitExceeded(_, _) => StatusCode::BAD_REQUEST,
            RestError::Validation(_) => StatusCode::BAD_REQUEST,

            // 404 Not Found
            RestError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            RestError::Constraint(_) => StatusCode::CONFLICT,

            // 500 Internal Server Error
            RestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Record `id` of `collection` does not exist
    pub fn record_not_found(collection: &str, id: u64) -> Self {
        RestError::NotFound(format!("{} with id {} not found", collection, id))
    }
}

impl From<StoreError> for RestError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => RestError::Validation(message),
            ErrorKind::NotFound => RestError::NotFound(message),
            ErrorKind::Constraint => RestError::Constraint(message),
            ErrorKind::Storage => RestError::Internal(message),
        }
    }
}

impl From<SchemaError> for RestError {
    fn from(err: SchemaError) -> Self {
        RestError::from(StoreError::from(err))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<RestError> for ErrorResponse {
    fn from(err: RestError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}
