//! In-process document store.
//!
//! Mirrors the SQLite store's upsert and ordering rules without any I/O.
//! Used for embedding and by tests that need to inspect saved documents.

use super::{
    resolve_document_id, with_document_id, DocumentCursor, DocumentStore, Filter, StoreError,
    StoreResult,
};
use crate::model::document::Document;
use log::debug;
use std::cell::{Cell, RefCell};

/// Document store holding documents in insertion order.
#[derive(Debug)]
pub struct MemoryDocumentStore {
    documents: RefCell<Option<Vec<(String, Document)>>>,
    saves: Cell<usize>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self {
            documents: RefCell::new(Some(Vec::new())),
            saves: Cell::new(0),
        }
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of stored documents in insertion order.
    ///
    /// Empty once the store is closed.
    pub fn documents(&self) -> Vec<Document> {
        self.documents
            .borrow()
            .as_ref()
            .map(|documents| documents.iter().map(|(_, doc)| doc.clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.documents.borrow().as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful `save` calls since creation.
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }

    pub fn is_closed(&self) -> bool {
        self.documents.borrow().is_none()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn find(&self, filter: &Filter) -> StoreResult<DocumentCursor> {
        let guard = self.documents.borrow();
        let documents = guard.as_ref().ok_or(StoreError::Closed)?;
        let matched = documents
            .iter()
            .filter(|(_, document)| filter.matches(document))
            .map(|(_, document)| document.clone())
            .collect::<Vec<_>>();
        debug!(
            "event=store_find module=store status=ok backend=memory path={} matched={}",
            filter.dotted_path(),
            matched.len()
        );
        Ok(DocumentCursor::new(matched))
    }

    fn save(&self, document: &Document) -> StoreResult<String> {
        let mut guard = self.documents.borrow_mut();
        let documents = guard.as_mut().ok_or(StoreError::Closed)?;
        let (id, assigned) = resolve_document_id(document)?;
        let stored = with_document_id(document, &id);

        match documents.iter_mut().find(|(existing, _)| existing == &id) {
            Some((_, slot)) => *slot = stored,
            None => documents.push((id.clone(), stored)),
        }
        self.saves.set(self.saves.get() + 1);

        debug!(
            "event=store_save module=store status=ok backend=memory doc_id={} assigned_id={}",
            id, assigned
        );
        Ok(id)
    }

    fn close(&self) -> StoreResult<()> {
        if self.documents.borrow_mut().take().is_some() {
            debug!("event=store_close module=store status=ok backend=memory");
        }
        Ok(())
    }
}
