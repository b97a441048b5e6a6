//! Equality filters over stored documents.
//!
//! Paths are dotted field names. Descending into an array fans out over its
//! elements (a numeric segment additionally selects one element), so
//! `data.#A.#b` reaches every `#b` value of every `#A` entity. A filter
//! matches when any reached value equals the filter value, or is an array
//! holding it.

use crate::model::document::{Document, RECORD_ID_KEY};
use serde_json::Value;

/// Field path equality filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    path: Vec<String>,
    value: String,
}

impl Filter {
    /// Matches documents whose `_id` equals `id`.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            path: vec![RECORD_ID_KEY.to_string()],
            value: id.into(),
        }
    }

    /// Matches documents where the dotted `path` reaches `value`.
    pub fn by_path(path: &str, value: impl Into<String>) -> Self {
        Self {
            path: path.split('.').map(str::to_string).collect(),
            value: value.into(),
        }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the identifier when this filter targets `_id` only.
    pub fn id_value(&self) -> Option<&str> {
        match self.path.as_slice() {
            [field] if field == RECORD_ID_KEY => Some(&self.value),
            _ => None,
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        let Some((first, rest)) = self.path.split_first() else {
            return false;
        };
        let mut reached: Vec<&Value> = document.get(first).into_iter().collect();

        for segment in rest {
            let mut next = Vec::new();
            for value in reached {
                match value {
                    Value::Object(object) => next.extend(object.get(segment)),
                    Value::Array(items) => {
                        if let Ok(index) = segment.parse::<usize>() {
                            next.extend(items.get(index));
                        }
                        next.extend(
                            items
                                .iter()
                                .filter_map(Value::as_object)
                                .filter_map(|object| object.get(segment)),
                        );
                    }
                    _ => {}
                }
            }
            if next.is_empty() {
                return false;
            }
            reached = next;
        }

        reached.into_iter().any(|value| self.equals(value))
    }

    fn equals(&self, value: &Value) -> bool {
        match value {
            Value::String(text) => text == &self.value,
            Value::Array(items) => items
                .iter()
                .any(|item| item.as_str() == Some(self.value.as_str())),
            _ => false,
        }
    }
}
