//! Record store
//!
//! Typed records grouped in collections, one-to-many association
//! bookkeeping, and optional snapshot persistence.
//!
//! # Usage
//!
//! ```ignore
//! let store = RecordStore::new(registry);
//! let user = store.insert("users", &json!({"name": "John"}))?;
//! let post = store.insert("posts", &json!({"title": "Hi", "userId": user.id}))?;
//! let posts = store.children_of("users", user.id, "posts")?;
//! ```

mod association;
mod errors;
mod predicate;
mod record;
mod record_store;
mod snapshot;

pub use association::AssociationIndex;
pub use errors::{ErrorKind, StoreError, StoreResult};
pub use predicate::{
    canonical_timestamp, compare, compare_typed, field_type_of, Condition, Operator, Predicate,
};
pub use record::Record;
pub use record_store::RecordStore;
pub use snapshot::{SnapshotData, SnapshotFile};
