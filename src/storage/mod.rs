//! Storage backends for TruthLens
//!
//! Persistence goes through the `DocumentStore` trait: collection-scoped
//! JSON documents with store-assigned ids and creation timestamps. The
//! primary implementation is `SqliteStore`.

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{
    check_field_name, Direction, Document, DocumentQuery, DocumentStore, IndexSpec, OpenStore,
    OrderBy, StorageError, StorageResult, StoredDocument, CREATED_AT,
};
