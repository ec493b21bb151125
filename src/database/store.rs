//! Document Store
//!
//! The storage seam used by every route handler. A store holds JSON documents
//! in named collections and answers a small query vocabulary: one filter,
//! an optional sort, and skip/limit.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// A stored or to-be-stored JSON object.
pub type Document = Map<String, Value>;

/// Key under which a document's identifier is exposed.
pub const ID_FIELD: &str = "_id";

/// Named collections known to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Foods,
    Users,
    Orders,
}

impl Collection {
    /// Table/collection name. Only ever one of a fixed set of identifiers.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Foods => "foods",
            Collection::Users => "users",
            Collection::Orders => "orders",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Store-assigned document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for DocumentId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(DocumentId)
            .map_err(|_| StoreError::InvalidId(s.to_string()))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Document selection. Field paths use dots for nesting (`addBy.email`).
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    ById(DocumentId),
    Eq { field: String, value: Value },
    /// Case-insensitive literal substring match on a string field.
    Contains { field: String, needle: String },
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq { field: field.into(), value: value.into() }
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Filter::Contains { field: field.into(), needle: needle.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Ascending }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Descending }
    }
}

/// Options applied to a `find` after filtering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<Sort>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted_id: DocumentId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("failed to get database connection: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("database query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] refinery::Error),

    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("stored document is not a JSON object")]
    NotAnObject,
}

/// CRUD and query operations over named document collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document, assigning it a fresh identifier. Any `_id` in the
    /// input is ignored.
    async fn insert_one(&self, collection: Collection, doc: Document) -> Result<InsertOutcome, StoreError>;

    /// Documents matching `filter`, each carrying its `_id`.
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let mut docs = self.find(collection, filter, &FindOptions::default().limit(1)).await?;
        Ok(docs.pop())
    }

    /// Set top-level fields on the first document matching `filter`.
    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Document,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Document count; may be approximate.
    async fn estimated_count(&self, collection: Collection) -> Result<u64, StoreError>;

    /// Connectivity check
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Resolve a dotted field path inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Attach an identifier to a document for output.
pub fn with_id(mut doc: Document, id: DocumentId) -> Document {
    doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    doc
}
