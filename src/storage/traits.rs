//! Storage trait definitions

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Document body: a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Name of the server-assigned creation timestamp, usable as an order key.
pub const CREATED_AT: &str = "createdAt";

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid field name: {0:?}")]
    InvalidField(String),

    #[error("{0}")]
    IndexRequired(IndexSpec),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A document as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Store-assigned (or caller-keyed, for merges) identifier
    pub id: String,
    /// Set once, when the document is first written
    pub created_at: DateTime<Utc>,
    pub data: Document,
}

/// Sort direction for an ordered query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

/// Order clause. The field may be [`CREATED_AT`] or any top-level document field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Query over one collection
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// Equality filters on top-level fields
    pub filters: Vec<(String, serde_json::Value)>,
    pub order: Option<OrderBy>,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The composite index this query needs, if any.
    ///
    /// Single-field queries (filters only, or an order only) are served
    /// without a declared index. An equality filter combined with an order
    /// needs one.
    pub fn required_index(&self, collection: &str) -> Option<IndexSpec> {
        let order = self.order.as_ref()?;
        if self.filters.is_empty() {
            return None;
        }
        Some(IndexSpec {
            collection: collection.to_string(),
            equality_fields: self.filters.iter().map(|(f, _)| f.clone()).collect(),
            order_field: order.field.clone(),
            direction: order.direction,
        })
    }
}

/// A composite index: equality fields followed by one ordered field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSpec {
    pub collection: String,
    pub equality_fields: Vec<String>,
    pub order_field: String,
    pub direction: Direction,
}

impl IndexSpec {
    /// Stable key for the registry of declared indexes.
    pub fn key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.equality_fields.join(","),
            self.order_field,
            self.direction.as_sql()
        )
    }
}

impl fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "query on '{}' requires a composite index on ({} ASC, {} {})",
            self.collection,
            self.equality_fields.join(" ASC, "),
            self.order_field,
            self.direction.as_sql()
        )
    }
}

/// Trait for document storage backends
///
/// Implementations must be thread-safe (Send + Sync) to support
/// concurrent access from multiple threads.
pub trait DocumentStore: Send + Sync {
    /// Insert a new document. The store assigns the id and `createdAt`.
    fn create(&self, collection: &str, data: &Document) -> StorageResult<StoredDocument>;

    /// Load a document by ID
    fn get(&self, collection: &str, id: &str) -> StorageResult<Option<StoredDocument>>;

    /// Create the document at `id` or merge `fields` into it.
    ///
    /// Fields not present in `fields` are left untouched; `createdAt` is
    /// assigned on first write only.
    fn merge(&self, collection: &str, id: &str, fields: &Document) -> StorageResult<StoredDocument>;

    /// Find documents matching a query
    fn query(&self, collection: &str, query: &DocumentQuery) -> StorageResult<Vec<StoredDocument>>;

    /// Declare a composite index. Returns `true` if it was newly created.
    fn ensure_index(&self, index: &IndexSpec) -> StorageResult<bool>;

    /// Cheapest possible read, used for health checks.
    fn probe(&self) -> StorageResult<()>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: DocumentStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}

/// Field names are interpolated into JSON paths; keep them to identifiers.
pub fn check_field_name(field: &str) -> StorageResult<()> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidField(field.to_string()))
    }
}
