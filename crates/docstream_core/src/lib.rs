//! Record event streams stored as nested documents.
//!
//! `DocumentWriter` receives record events and saves one document per
//! record; `DocumentReader` resolves query lines and replays stored
//! documents as the same events.

pub mod codec;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod store;
pub mod stream;

pub use codec::query::parse_query;
pub use codec::reader::{decode_document, DocumentReader};
pub use codec::writer::{DocumentBuilder, DocumentWriter};
pub use codec::{CodecError, CodecResult};
pub use config::{ConfigError, ConfigResult, StoreConfig, StoreLocation};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::{Document, DATA_KEY, KEY_PREFIX, RECORD_ID_KEY};
pub use model::event::StreamEvent;
pub use model::record::{Node, Record};
pub use store::{
    DocumentCursor, DocumentStore, Filter, MemoryDocumentStore, SqliteDocumentStore, StoreError,
    StoreResult,
};
pub use stream::{replay_events, EventList, StreamReceiver};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
