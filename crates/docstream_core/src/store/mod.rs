//! Document store contracts and implementations.
//!
//! # Responsibility
//! - Define the minimal store contract the codec depends on:
//!   `find`, `save` (upsert by identifier) and `close`.
//! - Provide SQLite-backed and in-memory implementations.
//!
//! # Invariants
//! - `save` replaces an existing document with the same `_id` in place.
//! - `save` assigns an identifier when the document has none.
//! - `find` yields documents in first-insert order.
//! - After `close`, every call except `close` fails with `StoreError::Closed`.

use crate::db::DbError;
use crate::model::document::{Document, RECORD_ID_KEY};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod filter;
mod memory_store;
mod sqlite_store;

pub use filter::Filter;
pub use memory_store::MemoryDocumentStore;
pub use sqlite_store::SqliteDocumentStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by document store implementations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Stored body could not be (de)serialized.
    Json(serde_json::Error),
    /// The store was closed before this call.
    Closed,
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// A document or stored row violates the store's shape rules.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "invalid document json: {err}"),
            Self::Closed => write!(f, "document store is closed"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid document data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Closed | Self::UninitializedConnection { .. } | Self::InvalidData(_) => None,
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
        Self::Json(value)
    }
}

/// Documents matched by one `find` call, in store order.
#[derive(Debug)]
pub struct DocumentCursor {
    documents: std::vec::IntoIter<Document>,
}

impl DocumentCursor {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: documents.into_iter(),
        }
    }
}

impl Iterator for DocumentCursor {
    type Item = Document;

    fn next(&mut self) -> Option<Self::Item> {
        self.documents.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.documents.size_hint()
    }
}

impl ExactSizeIterator for DocumentCursor {}

/// Storage contract used by document writers and readers.
///
/// Implemented for `&S` so several components can share one store; only the
/// component constructed as owner should close it.
pub trait DocumentStore {
    /// Returns every document matching `filter`.
    fn find(&self, filter: &Filter) -> StoreResult<DocumentCursor>;

    /// Inserts or replaces `document`, keyed by its `_id`.
    ///
    /// Returns the identifier the document is stored under.
    fn save(&self, document: &Document) -> StoreResult<String>;

    /// Releases the underlying connection. Repeated calls are no-ops.
    fn close(&self) -> StoreResult<()>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn find(&self, filter: &Filter) -> StoreResult<DocumentCursor> {
        (**self).find(filter)
    }

    fn save(&self, document: &Document) -> StoreResult<String> {
        (**self).save(document)
    }

    fn close(&self) -> StoreResult<()> {
        (**self).close()
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for Box<S> {
    fn find(&self, filter: &Filter) -> StoreResult<DocumentCursor> {
        (**self).find(filter)
    }

    fn save(&self, document: &Document) -> StoreResult<String> {
        (**self).save(document)
    }

    fn close(&self) -> StoreResult<()> {
        (**self).close()
    }
}

/// Resolves the identifier a document is stored under.
///
/// Missing `_id` yields a fresh UUID v4; non-string `_id` values are rejected.
pub(crate) fn resolve_document_id(document: &Document) -> StoreResult<(String, bool)> {
    match document.get(RECORD_ID_KEY) {
        None | Some(Value::Null) => Ok((uuid::Uuid::new_v4().to_string(), true)),
        Some(Value::String(id)) => Ok((id.clone(), false)),
        Some(other) => Err(StoreError::InvalidData(format!(
            "`{RECORD_ID_KEY}` must be a string, got `{other}`"
        ))),
    }
}

/// Returns `document` with `_id` set to `id`.
pub(crate) fn with_document_id(document: &Document, id: &str) -> Document {
    let mut stored = document.clone();
    stored.insert(RECORD_ID_KEY.to_string(), Value::String(id.to_string()));
    stored
}
