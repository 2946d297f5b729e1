//! relstore - typed JSON records over HTTP
//!
//! Collections of schema-checked records with one-to-many associations,
//! served as a CRUD REST API and optionally persisted to a snapshot file.

pub mod cli;
pub mod config;
pub mod logging;
pub mod rest_api;
pub mod schema;
pub mod store;
