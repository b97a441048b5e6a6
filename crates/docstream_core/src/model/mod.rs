//! Domain model shared by the writer and reader.
//!
//! # Responsibility
//! - Define the stored document layout and its reserved keys.
//! - Define the record event vocabulary and the in-memory record tree.
//!
//! # Invariants
//! - Node names are namespaced under `KEY_PREFIX` in stored documents.
//! - Sibling order is significant everywhere.

pub mod document;
pub mod event;
pub mod record;
