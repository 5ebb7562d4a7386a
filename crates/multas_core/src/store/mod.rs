//! Record store contracts and implementations.
//!
//! # Responsibility
//! - Define the document-store capability the scoreboard depends on.
//! - Keep storage details (SQL, in-process maps) behind one trait.
//!
//! # Invariants
//! - `commit_batch` applies every queued update or none of them.
//! - Updates address existing documents only; a missing id is `NotFound`.
//! - Stores never create or delete documents on behalf of the scoreboard.
//!
//! # See also
//! - docs/architecture/record-store.md

use crate::db::DbError;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub use memory::{InMemoryRecordStore, StoreFault};
pub use sqlite::SqliteRecordStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Field map of one stored document.
pub type Fields = Map<String, Value>;

/// Record store error for read and write paths.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    NotFound { collection: String, id: String },
    InvalidData(String),
    /// Store rejected or could not be reached for this request.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { collection, id } => {
                write!(f, "document not found: {collection}/{id}")
            }
            Self::InvalidData(message) => write!(f, "invalid stored document: {message}"),
            Self::Unavailable(message) => write!(f, "record store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// One stored document: store-assigned id plus its field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Builds a document from a JSON object value.
    ///
    /// # Errors
    /// - Returns `InvalidData` when `value` is not a JSON object.
    pub fn from_json(id: impl Into<String>, value: Value) -> StoreResult<Self> {
        let id = id.into();
        match value {
            Value::Object(fields) => Ok(Self { id, fields }),
            other => Err(StoreError::InvalidData(format!(
                "document `{id}` must be a JSON object, got {other}"
            ))),
        }
    }
}

/// One queued partial update inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchWrite {
    pub collection: String,
    pub id: String,
    pub fields: Fields,
}

/// Ordered set of partial updates committed atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<BatchWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a partial update merging `fields` into one document.
    pub fn update(&mut self, collection: &str, id: &str, fields: Fields) -> &mut Self {
        self.writes.push(BatchWrite {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[BatchWrite] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<BatchWrite> {
        self.writes
    }
}

/// Document store capability used by the scoreboard.
pub trait RecordStore {
    /// Reads every document of `collection` in stable store order.
    fn fetch_all(&self, collection: &str) -> StoreResult<Vec<Document>>;

    /// Sets one field on one existing document.
    fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<()>;

    /// Starts an empty batch.
    fn begin_batch(&self) -> WriteBatch {
        WriteBatch::new()
    }

    /// Applies every update of `batch` atomically.
    fn commit_batch(&self, batch: WriteBatch) -> StoreResult<()>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn fetch_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        (**self).fetch_all(collection)
    }

    fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<()> {
        (**self).update_field(collection, id, field, value)
    }

    fn begin_batch(&self) -> WriteBatch {
        (**self).begin_batch()
    }

    fn commit_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        (**self).commit_batch(batch)
    }
}

/// Merges `patch` into `target`, replacing existing keys.
pub(crate) fn merge_fields(target: &mut Fields, patch: &Fields) {
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
}
