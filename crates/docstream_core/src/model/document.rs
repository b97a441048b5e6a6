//! Stored document layout.
//!
//! A record is stored as
//!
//! ```text
//! { "_id": "<record id>",
//!   "data": [ { "#<name>": "<value>" }, { "#<name>": [ ... ] } ] }
//! ```
//!
//! Children live in arrays of single-entry objects (wrappers) because a plain
//! object would neither keep sibling order nor hold repeated names.

use serde_json::{Map, Value};

/// Field holding the record identifier.
pub const RECORD_ID_KEY: &str = "_id";

/// Field holding the top-level wrapper array.
pub const DATA_KEY: &str = "data";

/// Prefix put in front of every entity and literal name.
pub const KEY_PREFIX: &str = "#";

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Returns the field name used for node `name`.
pub fn escape_key(name: &str) -> String {
    format!("{KEY_PREFIX}{name}")
}

/// Recovers the node name from a stored field name.
///
/// Returns `None` when `key` does not carry the prefix.
pub fn unescape_key(key: &str) -> Option<&str> {
    key.strip_prefix(KEY_PREFIX)
}

/// Builds the single-entry wrapper `{ "#<name>": value }`.
pub fn wrap(name: &str, value: Value) -> Value {
    wrap_escaped(escape_key(name), value)
}

pub(crate) fn wrap_escaped(key: String, value: Value) -> Value {
    let mut wrapper = Map::with_capacity(1);
    wrapper.insert(key, value);
    Value::Object(wrapper)
}

/// Returns the only entry of a wrapper object.
///
/// Returns `None` for non-objects and for objects without exactly one entry.
pub fn wrapper_entry(wrapper: &Value) -> Option<(&str, &Value)> {
    let object = wrapper.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.iter().next().map(|(key, value)| (key.as_str(), value))
}

/// Assembles a record document from its identifier and top-level wrappers.
///
/// `_id` is omitted when `id` is `None`.
pub fn build_document(id: Option<&str>, data: Vec<Value>) -> Document {
    let mut document = Map::new();
    if let Some(id) = id {
        document.insert(RECORD_ID_KEY.to_string(), Value::String(id.to_string()));
    }
    document.insert(DATA_KEY.to_string(), Value::Array(data));
    document
}

/// Returns the string identifier of `document`, if it has one.
pub fn document_id(document: &Document) -> Option<&str> {
    document.get(RECORD_ID_KEY).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::{build_document, escape_key, unescape_key, wrap, wrapper_entry};
    use serde_json::{json, Value};

    #[test]
    fn escape_and_unescape_are_inverse() {
        for name in ["a", "A", "", "with space", "dotted.name", "#already"] {
            let key = escape_key(name);
            assert_eq!(unescape_key(&key), Some(name));
        }
        assert_eq!(unescape_key("data"), None);
        assert_eq!(unescape_key("_id"), None);
    }

    #[test]
    fn wrap_builds_single_entry_object() {
        let wrapper = wrap("a", Value::String("value1".into()));
        assert_eq!(wrapper, json!({ "#a": "value1" }));
        assert_eq!(wrapper_entry(&wrapper), Some(("#a", &json!("value1"))));
    }

    #[test]
    fn wrapper_entry_rejects_other_shapes() {
        assert_eq!(wrapper_entry(&json!({})), None);
        assert_eq!(wrapper_entry(&json!({ "#a": "1", "#b": "2" })), None);
        assert_eq!(wrapper_entry(&json!("scalar")), None);
        assert_eq!(wrapper_entry(&json!([{ "#a": "1" }])), None);
    }

    #[test]
    fn build_document_omits_missing_id() {
        let without_id = build_document(None, vec![]);
        assert_eq!(Value::Object(without_id), json!({ "data": [] }));

        let with_id = build_document(Some("42"), vec![wrap("a", json!("v"))]);
        assert_eq!(
            Value::Object(with_id),
            json!({ "_id": "42", "data": [{ "#a": "v" }] })
        );
    }
}
