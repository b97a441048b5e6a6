//! Record stream to document codec.
//!
//! # Responsibility
//! - `writer`: turn record events into one stored document per record.
//! - `reader`: turn query lines into stored documents and replay them as
//!   record events.
//! - `query`: parse the `[field:]value` query line syntax.
//!
//! # Invariants
//! - `decode(encode(events)) == events` for every balanced record.
//! - No partial record is ever persisted or delivered downstream.

use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod query;
pub mod reader;
pub mod writer;

pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding or decoding record streams.
#[derive(Debug)]
pub enum CodecError {
    /// Event protocol misuse, e.g. `end_entity` with no open entity.
    InvalidState(String),
    /// The store failed to save a finished record.
    Persistence(StoreError),
    /// A stored document does not follow the wrapper layout.
    MalformedDocument(String),
    /// A store call other than `save` failed.
    Store(StoreError),
    /// A downstream receiver rejected an event.
    Receiver(String),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidState(message) => write!(f, "invalid stream state: {message}"),
            Self::Persistence(err) => write!(f, "failed to persist record: {err}"),
            Self::MalformedDocument(message) => write!(f, "malformed document: {message}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Receiver(message) => write!(f, "receiver failed: {message}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) | Self::Store(err) => Some(err),
            Self::InvalidState(_) | Self::MalformedDocument(_) | Self::Receiver(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CodecError;
    use crate::store::StoreError;
    use std::error::Error;

    #[test]
    fn persistence_error_exposes_store_cause() {
        let err = CodecError::Persistence(StoreError::Closed);
        assert_eq!(
            err.to_string(),
            "failed to persist record: document store is closed"
        );
        assert!(err.source().is_some());
        assert!(CodecError::InvalidState("x".into()).source().is_none());
    }
}
