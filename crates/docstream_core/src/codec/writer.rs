//! Record events to stored documents.
//!
//! # Responsibility
//! - Build one document per record with an explicit stack of open frames.
//! - Persist each finished record with exactly one `save` call.
//!
//! # Invariants
//! - The bottom frame holds the record's top-level wrappers; every frame
//!   above it is one open entity.
//! - A closed entity is appended to its parent when it ends; no sibling can
//!   be emitted between its start and end, so stored order equals emission
//!   order.
//! - Frame state never outlives the record: `end_record`, `reset_stream` and
//!   `close_stream` all discard it, on success and on failure.

use crate::codec::{CodecError, CodecResult};
use crate::model::document::{build_document, escape_key, wrap, wrap_escaped, Document};
use crate::store::DocumentStore;
use crate::stream::StreamReceiver;
use log::{debug, error, warn};
use serde_json::Value;

#[derive(Debug)]
struct Frame {
    /// Escaped entity key; `None` for the record-level frame.
    key: Option<String>,
    children: Vec<Value>,
}

#[derive(Debug)]
struct OpenRecord {
    id: Option<String>,
    frames: Vec<Frame>,
}

/// Store-independent document assembly for one record at a time.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    record: Option<OpenRecord>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.record.is_some()
    }

    /// Number of entities currently open.
    pub fn depth(&self) -> usize {
        self.record
            .as_ref()
            .map_or(0, |record| record.frames.len().saturating_sub(1))
    }

    /// Starts a new record, discarding any unfinished one.
    ///
    /// Empty identifiers are treated as absent.
    pub fn begin(&mut self, id: Option<&str>) {
        if let Some(stale) = self.record.take() {
            warn!(
                "event=record_encode module=codec status=discarded doc_id={} open_entities={}",
                stale.id.as_deref().unwrap_or("-"),
                stale.frames.len().saturating_sub(1)
            );
        }
        self.record = Some(OpenRecord {
            id: id.filter(|id| !id.is_empty()).map(str::to_string),
            frames: vec![Frame {
                key: None,
                children: Vec::new(),
            }],
        });
    }

    pub fn add_literal(&mut self, name: &str, value: &str) -> CodecResult<()> {
        self.top_frame("literal")?
            .children
            .push(wrap(name, Value::String(value.to_string())));
        Ok(())
    }

    pub fn open_entity(&mut self, name: &str) -> CodecResult<()> {
        let record = self.open_record("start_entity")?;
        record.frames.push(Frame {
            key: Some(escape_key(name)),
            children: Vec::new(),
        });
        Ok(())
    }

    pub fn close_entity(&mut self) -> CodecResult<()> {
        let record = self.open_record("end_entity")?;
        if record.frames.len() <= 1 {
            return Err(CodecError::InvalidState(
                "end_entity without open entity".to_string(),
            ));
        }

        let closed = record.frames.pop().ok_or_else(|| {
            CodecError::InvalidState("end_entity without open entity".to_string())
        })?;
        let key = closed.key.ok_or_else(|| {
            CodecError::InvalidState("record frame cannot be closed as entity".to_string())
        })?;
        let parent = record.frames.last_mut().ok_or_else(|| {
            CodecError::InvalidState("end_entity without parent frame".to_string())
        })?;
        parent
            .children
            .push(wrap_escaped(key, Value::Array(closed.children)));
        Ok(())
    }

    /// Completes the open record and returns its identifier and document.
    ///
    /// The builder is empty afterwards, whether or not this succeeds.
    ///
    /// # Errors
    /// - `InvalidState` when no record is open or entities are still open.
    pub fn finish(&mut self) -> CodecResult<(Option<String>, Document)> {
        let mut record = self
            .record
            .take()
            .ok_or_else(|| CodecError::InvalidState("end_record outside of a record".to_string()))?;

        if record.frames.len() != 1 {
            return Err(CodecError::InvalidState(format!(
                "end_record with {} open entities",
                record.frames.len().saturating_sub(1)
            )));
        }
        let root = record.frames.pop().map(|frame| frame.children).unwrap_or_default();

        let document = build_document(record.id.as_deref(), root);
        Ok((record.id, document))
    }

    /// Drops the open record, if any, without producing a document.
    pub fn discard(&mut self) {
        self.record = None;
    }

    fn open_record(&mut self, event: &str) -> CodecResult<&mut OpenRecord> {
        self.record
            .as_mut()
            .ok_or_else(|| CodecError::InvalidState(format!("{event} outside of a record")))
    }

    fn top_frame(&mut self, event: &str) -> CodecResult<&mut Frame> {
        self.open_record(event)?
            .frames
            .last_mut()
            .ok_or_else(|| CodecError::InvalidState(format!("{event} without open frame")))
    }
}

/// Stream receiver that saves every record it receives into a store.
///
/// A writer constructed with [`DocumentWriter::shared`] never closes its
/// store; the owner of the store is responsible for that.
pub struct DocumentWriter<S: DocumentStore> {
    store: S,
    owns_store: bool,
    builder: DocumentBuilder,
}

impl<S: DocumentStore> DocumentWriter<S> {
    /// Creates a writer that closes `store` on `close_stream`.
    pub fn new(store: S) -> Self {
        Self::with_ownership(store, true)
    }

    /// Creates a writer over a store owned elsewhere.
    pub fn shared(store: S) -> Self {
        Self::with_ownership(store, false)
    }

    pub fn with_ownership(store: S, owns_store: bool) -> Self {
        Self {
            store,
            owns_store,
            builder: DocumentBuilder::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn owns_store(&self) -> bool {
        self.owns_store
    }

    /// Returns whether a record is currently being built.
    pub fn in_record(&self) -> bool {
        self.builder.is_open()
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S: DocumentStore> StreamReceiver for DocumentWriter<S> {
    fn start_record(&mut self, id: Option<&str>) -> CodecResult<()> {
        self.builder.begin(id);
        Ok(())
    }

    fn start_entity(&mut self, name: &str) -> CodecResult<()> {
        self.builder.open_entity(name)
    }

    fn literal(&mut self, name: &str, value: &str) -> CodecResult<()> {
        self.builder.add_literal(name, value)
    }

    fn end_entity(&mut self) -> CodecResult<()> {
        self.builder.close_entity()
    }

    fn end_record(&mut self) -> CodecResult<()> {
        let (id, document) = self.builder.finish()?;

        match self.store.save(&document) {
            Ok(stored_id) => {
                debug!(
                    "event=record_encode module=codec status=ok doc_id={} assigned_id={}",
                    stored_id,
                    id.is_none()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=record_encode module=codec status=error doc_id={} error_code=save_failed error={}",
                    id.as_deref().unwrap_or("-"),
                    err
                );
                Err(CodecError::Persistence(err))
            }
        }
    }

    fn reset_stream(&mut self) -> CodecResult<()> {
        self.builder.discard();
        Ok(())
    }

    fn close_stream(&mut self) -> CodecResult<()> {
        self.builder.discard();
        if self.owns_store {
            self.store.close().map_err(CodecError::Store)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentBuilder;
    use crate::codec::CodecError;
    use serde_json::{json, Value};

    #[test]
    fn builder_nests_entities_in_emission_order() {
        let mut builder = DocumentBuilder::new();
        builder.begin(Some("42"));
        builder.add_literal("a", "value1").unwrap();
        builder.open_entity("A").unwrap();
        builder.open_entity("B").unwrap();
        assert_eq!(builder.depth(), 2);
        builder.add_literal("b", "value2").unwrap();
        builder.close_entity().unwrap();
        builder.add_literal("a", "value3").unwrap();
        builder.close_entity().unwrap();

        let (id, document) = builder.finish().unwrap();
        assert_eq!(id.as_deref(), Some("42"));
        assert_eq!(
            Value::Object(document),
            json!({ "_id": "42", "data": [
                { "#a": "value1" },
                { "#A": [
                    { "#B": [{ "#b": "value2" }] },
                    { "#a": "value3" }
                ]}
            ]})
        );
        assert!(!builder.is_open());
    }

    #[test]
    fn builder_treats_empty_identifier_as_absent() {
        let mut builder = DocumentBuilder::new();
        builder.begin(Some(""));
        let (id, document) = builder.finish().unwrap();
        assert_eq!(id, None);
        assert!(!document.contains_key("_id"));
    }

    #[test]
    fn builder_rejects_events_outside_record() {
        let mut builder = DocumentBuilder::new();
        assert!(matches!(
            builder.add_literal("a", "1"),
            Err(CodecError::InvalidState(_))
        ));
        assert!(matches!(
            builder.open_entity("A"),
            Err(CodecError::InvalidState(_))
        ));
        assert!(matches!(
            builder.close_entity(),
            Err(CodecError::InvalidState(_))
        ));
        assert!(matches!(builder.finish(), Err(CodecError::InvalidState(_))));
    }

    #[test]
    fn finish_with_open_entities_discards_record() {
        let mut builder = DocumentBuilder::new();
        builder.begin(Some("1"));
        builder.open_entity("A").unwrap();

        assert!(matches!(builder.finish(), Err(CodecError::InvalidState(_))));
        assert!(!builder.is_open());
        assert_eq!(builder.depth(), 0);
    }

    #[test]
    fn begin_discards_unfinished_record() {
        let mut builder = DocumentBuilder::new();
        builder.begin(Some("1"));
        builder.open_entity("A").unwrap();
        builder.add_literal("x", "stale").unwrap();

        builder.begin(Some("2"));
        builder.add_literal("y", "fresh").unwrap();
        let (_, document) = builder.finish().unwrap();
        assert_eq!(
            Value::Object(document),
            json!({ "_id": "2", "data": [{ "#y": "fresh" }] })
        );
    }
}
