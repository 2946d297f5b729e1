//! # Response Formatting
//!
//! Standard response bodies for the REST API.

use serde::Serialize;

/// List response with pagination
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub data: Vec<T>,
    /// Records in this page
    pub count: usize,
    /// Records matching before paging
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(data: Vec<T>, total: usize, limit: usize, offset: usize) -> Self {
        let count = data.len();
        Self {
            data,
            count,
            total,
            limit,
            offset,
        }
    }
}

/// Single record response
#[derive(Debug, Clone, Serialize)]
pub struct SingleResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> SingleResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Delete confirmation
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub deleted: usize,
}

impl DeleteResponse {
    pub fn new(collection: &str, id: u64, deleted: usize) -> Self {
        Self {
            message: format!("{} with id {} deleted", collection, id),
            deleted,
        }
    }
}
