//! # REST API Module
//!
//! HTTP endpoints for CRUD operations on every configured collection.

pub mod errors;
pub mod handler;
pub mod parser;
pub mod response;
pub mod server;

pub use errors::{RestError, RestResult};
pub use handler::{HandledRequest, Operation, Payload, RequestState, ResourceHandler, ResourceRequest};
pub use parser::QueryParams;
pub use server::RestServer;
