//! Stored documents to record events.
//!
//! # Responsibility
//! - Resolve query lines against the store.
//! - Replay each matched document as one framed record event sequence.
//!
//! # Invariants
//! - Every matched document is decoded before the first event is sent, so a
//!   malformed document aborts the pass without partial output.
//! - Wrappers are replayed in stored order.

use crate::codec::query::parse_query;
use crate::codec::{CodecError, CodecResult};
use crate::model::document::{unescape_key, wrapper_entry, Document, DATA_KEY, RECORD_ID_KEY};
use crate::model::event::StreamEvent;
use crate::store::DocumentStore;
use crate::stream::{replay_events, StreamReceiver};
use log::{debug, error};
use serde_json::Value;
use std::time::Instant;

/// Decodes one stored document into its record event sequence.
///
/// # Errors
/// - `MalformedDocument` when `_id` is not a string or number, `data` is
///   missing or not an array, a wrapper does not hold exactly one prefixed
///   key, or a value is neither a scalar nor an array.
pub fn decode_document(document: &Document) -> CodecResult<Vec<StreamEvent>> {
    let id = match document.get(RECORD_ID_KEY) {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        Some(other) => {
            return Err(CodecError::MalformedDocument(format!(
                "`{RECORD_ID_KEY}` must be a string, got `{other}`"
            )))
        }
    };
    let data = document
        .get(DATA_KEY)
        .ok_or_else(|| CodecError::MalformedDocument(format!("missing `{DATA_KEY}` field")))?
        .as_array()
        .ok_or_else(|| CodecError::MalformedDocument(format!("`{DATA_KEY}` must be an array")))?;

    let mut events = vec![StreamEvent::StartRecord(id)];
    let mut stack = vec![data.iter()];

    while let Some(siblings) = stack.last_mut() {
        let Some(wrapper) = siblings.next() else {
            stack.pop();
            if !stack.is_empty() {
                events.push(StreamEvent::EndEntity);
            }
            continue;
        };

        let (key, value) = wrapper_entry(wrapper).ok_or_else(|| {
            CodecError::MalformedDocument(format!(
                "expected a single-entry object, got `{wrapper}`"
            ))
        })?;
        let name = unescape_key(key).ok_or_else(|| {
            CodecError::MalformedDocument(format!("key `{key}` lacks the name prefix"))
        })?;

        match value {
            Value::Array(children) => {
                events.push(StreamEvent::start_entity(name));
                stack.push(children.iter());
            }
            Value::String(text) => events.push(StreamEvent::literal(name, text.as_str())),
            Value::Number(number) => events.push(StreamEvent::literal(name, number.to_string())),
            Value::Bool(flag) => events.push(StreamEvent::literal(name, flag.to_string())),
            Value::Null | Value::Object(_) => {
                return Err(CodecError::MalformedDocument(format!(
                    "value of `{key}` must be a scalar or an array, got `{value}`"
                )))
            }
        }
    }

    events.push(StreamEvent::EndRecord);
    Ok(events)
}

/// Query-driven source of record events.
///
/// A reader constructed with [`DocumentReader::shared`] never closes its
/// store; the owner of the store is responsible for that.
pub struct DocumentReader<S: DocumentStore, R: StreamReceiver> {
    store: S,
    owns_store: bool,
    receiver: R,
}

impl<S: DocumentStore, R: StreamReceiver> DocumentReader<S, R> {
    /// Creates a reader that closes `store` on `close_stream`.
    pub fn new(store: S, receiver: R) -> Self {
        Self::with_ownership(store, receiver, true)
    }

    /// Creates a reader over a store owned elsewhere.
    pub fn shared(store: S, receiver: R) -> Self {
        Self::with_ownership(store, receiver, false)
    }

    pub fn with_ownership(store: S, receiver: R, owns_store: bool) -> Self {
        Self {
            store,
            owns_store,
            receiver,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn owns_store(&self) -> bool {
        self.owns_store
    }

    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    pub fn receiver_mut(&mut self) -> &mut R {
        &mut self.receiver
    }

    /// Replaces the downstream receiver and returns the previous one.
    pub fn set_receiver(&mut self, receiver: R) -> R {
        std::mem::replace(&mut self.receiver, receiver)
    }

    pub fn into_receiver(self) -> R {
        self.receiver
    }

    /// Runs one query line and replays every matched document.
    ///
    /// Returns the number of records sent downstream.
    ///
    /// # Errors
    /// - `Store` when the lookup fails.
    /// - `MalformedDocument` when any matched document is malformed; nothing
    ///   is sent in that case.
    /// - Any error returned by the receiver.
    pub fn process(&mut self, query: &str) -> CodecResult<usize> {
        let started_at = Instant::now();
        let filter = parse_query(query);
        let cursor = self.store.find(&filter).map_err(CodecError::Store)?;

        let mut records = Vec::with_capacity(cursor.len());
        for document in cursor {
            match decode_document(&document) {
                Ok(events) => records.push(events),
                Err(err) => {
                    error!(
                        "event=record_decode module=codec status=error path={} error_code=malformed_document error={}",
                        filter.dotted_path(),
                        err
                    );
                    return Err(err);
                }
            }
        }

        for events in &records {
            replay_events(events, &mut self.receiver)?;
        }

        debug!(
            "event=record_decode module=codec status=ok path={} records={} duration_ms={}",
            filter.dotted_path(),
            records.len(),
            started_at.elapsed().as_millis()
        );
        Ok(records.len())
    }

    pub fn reset_stream(&mut self) -> CodecResult<()> {
        self.receiver.reset_stream()
    }

    /// Closes the receiver, then the store when this reader owns it.
    pub fn close_stream(&mut self) -> CodecResult<()> {
        self.receiver.close_stream()?;
        if self.owns_store {
            self.store.close().map_err(CodecError::Store)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::decode_document;
    use crate::codec::CodecError;
    use crate::model::document::Document;
    use crate::model::event::StreamEvent;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn decodes_nested_wrappers_in_order() {
        let events = decode_document(&doc(json!({
            "_id": "23",
            "data": [
                { "#c": "value1" },
                { "#C": [
                    { "#D": [{ "#d": "value2" }] },
                    { "#c": "value3" }
                ]}
            ]
        })))
        .unwrap();

        assert_eq!(
            events,
            vec![
                StreamEvent::start_record("23"),
                StreamEvent::literal("c", "value1"),
                StreamEvent::start_entity("C"),
                StreamEvent::start_entity("D"),
                StreamEvent::literal("d", "value2"),
                StreamEvent::EndEntity,
                StreamEvent::literal("c", "value3"),
                StreamEvent::EndEntity,
                StreamEvent::EndRecord,
            ]
        );
    }

    #[test]
    fn missing_identifier_passes_through() {
        let events = decode_document(&doc(json!({ "data": [] }))).unwrap();
        assert_eq!(
            events,
            vec![StreamEvent::StartRecord(None), StreamEvent::EndRecord]
        );
    }

    #[test]
    fn empty_entity_is_replayed() {
        let events = decode_document(&doc(json!({ "_id": "1", "data": [{ "#E": [] }] }))).unwrap();
        assert_eq!(
            events,
            vec![
                StreamEvent::start_record("1"),
                StreamEvent::start_entity("E"),
                StreamEvent::EndEntity,
                StreamEvent::EndRecord,
            ]
        );
    }

    #[test]
    fn scalar_literals_are_stringified() {
        let events =
            decode_document(&doc(json!({ "_id": 7, "data": [{ "#n": 12 }, { "#b": true }] })))
                .unwrap();
        assert_eq!(
            events,
            vec![
                StreamEvent::start_record("7"),
                StreamEvent::literal("n", "12"),
                StreamEvent::literal("b", "true"),
                StreamEvent::EndRecord,
            ]
        );
    }

    #[test]
    fn malformed_shapes_are_rejected() {
        let cases = [
            json!({ "_id": "1" }),
            json!({ "_id": "1", "data": { "#a": "x" } }),
            json!({ "_id": "1", "data": [{ "#a": "x", "#b": "y" }] }),
            json!({ "_id": "1", "data": [{}] }),
            json!({ "_id": "1", "data": ["bare"] }),
            json!({ "_id": "1", "data": [{ "a": "unprefixed" }] }),
            json!({ "_id": "1", "data": [{ "#a": null }] }),
            json!({ "_id": "1", "data": [{ "#A": [{ "#a": { "nested": "object" } }] }] }),
            json!({ "_id": ["1"], "data": [] }),
        ];

        for case in cases {
            let result = decode_document(&doc(case.clone()));
            assert!(
                matches!(result, Err(CodecError::MalformedDocument(_))),
                "expected malformed document for {case}"
            );
        }
    }
}
