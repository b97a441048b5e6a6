use docstream_core::{
    CodecError, Document, DocumentReader, DocumentStore, EventList, MemoryDocumentStore,
    StreamEvent,
};
use serde_json::json;

fn doc(value: serde_json::Value) -> Document {
    value.as_object().unwrap().clone()
}

fn reference_document(id: &str) -> Document {
    doc(json!({ "_id": id,
        "data": [
            { "#a": "value1" },
            { "#A": [
                { "#B": [{ "#b": "value2" }] },
                { "#a": "value3" }
            ]}
        ]
    }))
}

fn reference_events(id: &str) -> Vec<StreamEvent> {
    vec![
        StreamEvent::start_record(id),
        StreamEvent::literal("a", "value1"),
        StreamEvent::start_entity("A"),
        StreamEvent::start_entity("B"),
        StreamEvent::literal("b", "value2"),
        StreamEvent::EndEntity,
        StreamEvent::literal("a", "value3"),
        StreamEvent::EndEntity,
        StreamEvent::EndRecord,
    ]
}

#[test]
fn retrieves_single_document_as_stream() {
    let store = MemoryDocumentStore::new();
    store.save(&reference_document("42")).unwrap();
    store.save(&reference_document("43")).unwrap();

    let mut reader = DocumentReader::shared(&store, EventList::new());
    assert_eq!(reader.process("42").unwrap(), 1);
    reader.close_stream().unwrap();

    let receiver = reader.into_receiver();
    assert_eq!(receiver.events(), reference_events("42").as_slice());
    assert!(receiver.is_closed());
    assert!(!store.is_closed());
}

#[test]
fn unknown_identifier_emits_nothing() {
    let store = MemoryDocumentStore::new();
    store.save(&reference_document("42")).unwrap();

    let mut reader = DocumentReader::shared(&store, EventList::new());
    assert_eq!(reader.process("99").unwrap(), 0);
    assert!(reader.receiver().events().is_empty());
}

#[test]
fn field_query_matches_nested_literal() {
    let store = MemoryDocumentStore::new();
    store.save(&reference_document("1")).unwrap();
    store
        .save(&doc(json!({ "_id": "2", "data": [{ "#A": [{ "#a": "other" }] }] })))
        .unwrap();
    store.save(&reference_document("3")).unwrap();

    let mut reader = DocumentReader::shared(&store, EventList::new());
    assert_eq!(reader.process("#A.#a:value3").unwrap(), 2);

    let mut expected = reference_events("1");
    expected.extend(reference_events("3"));
    assert_eq!(reader.receiver().events(), expected.as_slice());
}

#[test]
fn explicit_identifier_field_is_supported() {
    let store = MemoryDocumentStore::new();
    store.save(&reference_document("42")).unwrap();

    let mut reader = DocumentReader::shared(&store, EventList::new());
    assert_eq!(reader.process("_id:42").unwrap(), 1);
}

#[test]
fn malformed_document_aborts_without_partial_events() {
    let store = MemoryDocumentStore::new();
    store
        .save(&doc(json!({ "_id": "1", "data": [{ "#a": "x" }] })))
        .unwrap();
    store
        .save(&doc(json!({ "_id": "2", "data": [{ "#a": "x", "#b": "y" }] })))
        .unwrap();

    let mut reader = DocumentReader::shared(&store, EventList::new());
    let err = reader.process("#a:x").unwrap_err();
    assert!(matches!(err, CodecError::MalformedDocument(_)), "{err}");
    assert!(reader.receiver().events().is_empty());

    assert_eq!(reader.process("1").unwrap(), 1);
    assert_eq!(
        reader.receiver().events(),
        [
            StreamEvent::start_record("1"),
            StreamEvent::literal("a", "x"),
            StreamEvent::EndRecord,
        ]
        .as_slice()
    );
}

#[test]
fn reset_is_forwarded_to_receiver() {
    let store = MemoryDocumentStore::new();
    let mut reader = DocumentReader::shared(&store, EventList::new());
    reader.reset_stream().unwrap();
    assert_eq!(reader.receiver().resets(), 1);
}

#[test]
fn owning_reader_closes_store() {
    let store = MemoryDocumentStore::new();
    store.save(&reference_document("42")).unwrap();

    let mut reader = DocumentReader::new(store, EventList::new());
    assert!(reader.owns_store());
    reader.process("42").unwrap();
    reader.close_stream().unwrap();
    assert!(reader.store().is_closed());
}

#[test]
fn receiver_can_be_swapped_between_queries() {
    let store = MemoryDocumentStore::new();
    store.save(&reference_document("1")).unwrap();
    store.save(&reference_document("2")).unwrap();

    let mut reader = DocumentReader::shared(&store, EventList::new());
    reader.process("1").unwrap();
    let first = reader.set_receiver(EventList::new());
    reader.process("2").unwrap();

    assert_eq!(first.events(), reference_events("1").as_slice());
    assert_eq!(reader.receiver().events(), reference_events("2").as_slice());
}
