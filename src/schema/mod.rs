//! Schema subsystem
//!
//! Every collection declares its fields with explicit types. Payloads are
//! validated against the declaration before any write reaches the store.
//!
//! # Rules
//!
//! - Undeclared fields are rejected
//! - `id`, `createdAt` and `updatedAt` are managed by the store
//! - No implicit coercion (integers are accepted where floats are declared)
//! - Associations reference declared collections and integer foreign keys

mod errors;
mod registry;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaResult, ValidationDetails};
pub use registry::SchemaRegistry;
pub use types::{
    is_valid_collection_name, AssociationDef, CollectionSchema, FieldDef, FieldType,
    RESERVED_FIELDS,
};
pub use validator::{json_type_name, SchemaValidator, WriteMode};
