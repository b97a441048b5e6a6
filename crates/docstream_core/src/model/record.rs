//! In-memory record tree.
//!
//! # Responsibility
//! - Hold one record as an ordered tree of literals and entities.
//! - Convert between the tree, its event sequence and its stored document.
//!
//! # Invariants
//! - `events()` always yields a balanced sequence framed by `StartRecord` and
//!   `EndRecord`.
//! - Conversions walk the tree with explicit stacks; nesting depth is bounded
//!   by memory only.

use crate::codec::reader::decode_document;
use crate::codec::writer::DocumentBuilder;
use crate::codec::{CodecError, CodecResult};
use crate::model::document::Document;
use crate::model::event::StreamEvent;
use crate::stream::{replay_events, StreamReceiver};

/// A named scalar or a named ordered container of nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Literal { name: String, value: String },
    Entity { name: String, children: Vec<Node> },
}

impl Node {
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Literal {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn entity(name: impl Into<String>, children: Vec<Node>) -> Self {
        Self::Entity {
            name: name.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Literal { name, .. } | Self::Entity { name, .. } => name,
        }
    }
}

/// One top-level unit of the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// `None` lets the store assign an identifier on save.
    pub id: Option<String>,
    pub nodes: Vec<Node>,
}

impl Record {
    pub fn new(id: Option<String>, nodes: Vec<Node>) -> Self {
        Self { id, nodes }
    }

    /// Flattens the tree into its event sequence.
    pub fn events(&self) -> Vec<StreamEvent> {
        let mut events = vec![StreamEvent::StartRecord(self.id.clone())];
        let mut stack = vec![self.nodes.iter()];

        while let Some(siblings) = stack.last_mut() {
            match siblings.next() {
                Some(Node::Literal { name, value }) => {
                    events.push(StreamEvent::literal(name.as_str(), value.as_str()));
                }
                Some(Node::Entity { name, children }) => {
                    events.push(StreamEvent::start_entity(name.as_str()));
                    stack.push(children.iter());
                }
                None => {
                    stack.pop();
                    if !stack.is_empty() {
                        events.push(StreamEvent::EndEntity);
                    }
                }
            }
        }

        events.push(StreamEvent::EndRecord);
        events
    }

    /// Sends the record to `receiver` as one framed event sequence.
    pub fn replay<R: StreamReceiver>(&self, receiver: &mut R) -> CodecResult<()> {
        replay_events(&self.events(), receiver)
    }

    /// Rebuilds a record from exactly one balanced event sequence.
    ///
    /// # Errors
    /// - `InvalidState` when the sequence is not framed by one
    ///   `StartRecord`/`EndRecord` pair or entities are unbalanced.
    pub fn from_events(events: &[StreamEvent]) -> CodecResult<Self> {
        let mut iter = events.iter();
        let id = match iter.next() {
            Some(StreamEvent::StartRecord(id)) => id.clone(),
            _ => {
                return Err(CodecError::InvalidState(
                    "record events must begin with start_record".to_string(),
                ))
            }
        };

        let mut root = Vec::new();
        let mut open: Vec<(String, Vec<Node>)> = Vec::new();
        let mut ended = false;

        for event in iter {
            if ended {
                return Err(CodecError::InvalidState(
                    "events found after end_record".to_string(),
                ));
            }
            match event {
                StreamEvent::StartRecord(_) => {
                    return Err(CodecError::InvalidState(
                        "start_record inside an open record".to_string(),
                    ));
                }
                StreamEvent::StartEntity(name) => open.push((name.clone(), Vec::new())),
                StreamEvent::Literal { name, value } => {
                    current_children(&mut root, &mut open).push(Node::literal(name, value));
                }
                StreamEvent::EndEntity => {
                    let (name, children) = open.pop().ok_or_else(|| {
                        CodecError::InvalidState("end_entity without open entity".to_string())
                    })?;
                    current_children(&mut root, &mut open).push(Node::entity(name, children));
                }
                StreamEvent::EndRecord => {
                    if !open.is_empty() {
                        return Err(CodecError::InvalidState(format!(
                            "end_record with {} open entities",
                            open.len()
                        )));
                    }
                    ended = true;
                }
            }
        }

        if !ended {
            return Err(CodecError::InvalidState(
                "record events must end with end_record".to_string(),
            ));
        }

        Ok(Self { id, nodes: root })
    }

    /// Encodes the record into its stored document shape.
    pub fn to_document(&self) -> CodecResult<Document> {
        let mut builder = DocumentBuilder::default();
        for event in self.events() {
            match event {
                StreamEvent::StartRecord(id) => builder.begin(id.as_deref()),
                StreamEvent::StartEntity(name) => builder.open_entity(&name)?,
                StreamEvent::Literal { name, value } => builder.add_literal(&name, &value)?,
                StreamEvent::EndEntity => builder.close_entity()?,
                StreamEvent::EndRecord => {}
            }
        }
        let (_, document) = builder.finish()?;
        Ok(document)
    }

    /// Decodes a stored document into a record tree.
    pub fn from_document(document: &Document) -> CodecResult<Self> {
        Self::from_events(&decode_document(document)?)
    }
}

fn current_children<'a>(
    root: &'a mut Vec<Node>,
    open: &'a mut [(String, Vec<Node>)],
) -> &'a mut Vec<Node> {
    match open.last_mut() {
        Some((_, children)) => children,
        None => root,
    }
}

#[cfg(test)]
mod tests {
    use super::{Node, Record};
    use crate::codec::CodecError;
    use crate::model::event::StreamEvent;
    use crate::stream::EventList;

    fn sample() -> Record {
        Record::new(
            Some("42".to_string()),
            vec![
                Node::literal("a", "value1"),
                Node::entity(
                    "A",
                    vec![
                        Node::entity("B", vec![Node::literal("b", "value2")]),
                        Node::literal("a", "value3"),
                    ],
                ),
            ],
        )
    }

    #[test]
    fn events_follow_tree_order() {
        assert_eq!(
            sample().events(),
            vec![
                StreamEvent::start_record("42"),
                StreamEvent::literal("a", "value1"),
                StreamEvent::start_entity("A"),
                StreamEvent::start_entity("B"),
                StreamEvent::literal("b", "value2"),
                StreamEvent::EndEntity,
                StreamEvent::literal("a", "value3"),
                StreamEvent::EndEntity,
                StreamEvent::EndRecord,
            ]
        );
    }

    #[test]
    fn from_events_inverts_events() {
        let record = sample();
        assert_eq!(Record::from_events(&record.events()).unwrap(), record);
    }

    #[test]
    fn from_events_rejects_unbalanced_sequences() {
        let missing_end = [StreamEvent::start_record("1"), StreamEvent::start_entity("A")];
        assert!(matches!(
            Record::from_events(&missing_end),
            Err(CodecError::InvalidState(_))
        ));

        let extra_close = [
            StreamEvent::start_record("1"),
            StreamEvent::EndEntity,
            StreamEvent::EndRecord,
        ];
        assert!(matches!(
            Record::from_events(&extra_close),
            Err(CodecError::InvalidState(_))
        ));

        let no_start = [StreamEvent::EndRecord];
        assert!(matches!(
            Record::from_events(&no_start),
            Err(CodecError::InvalidState(_))
        ));
    }

    #[test]
    fn node_name_covers_both_variants() {
        assert_eq!(Node::literal("x", "1").name(), "x");
        assert_eq!(Node::entity("Y", vec![]).name(), "Y");
    }

    #[test]
    fn replay_sends_framed_events() {
        let record = sample();
        let mut receiver = EventList::new();
        record.replay(&mut receiver).unwrap();
        record.replay(&mut receiver).unwrap();

        let mut expected = record.events();
        expected.extend(record.events());
        assert_eq!(receiver.events(), expected.as_slice());
    }
}
