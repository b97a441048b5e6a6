//! Record event vocabulary.

use crate::codec::CodecResult;
use crate::stream::StreamReceiver;
use serde::{Deserialize, Serialize};

/// One call of the record stream protocol.
///
/// Serialized as externally tagged snake_case JSON, e.g.
/// `{"start_record":"42"}`, `{"literal":{"name":"a","value":"v"}}`,
/// `"end_entity"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEvent {
    StartRecord(Option<String>),
    StartEntity(String),
    Literal { name: String, value: String },
    EndEntity,
    EndRecord,
}

impl StreamEvent {
    pub fn start_record(id: impl Into<String>) -> Self {
        Self::StartRecord(Some(id.into()))
    }

    pub fn start_entity(name: impl Into<String>) -> Self {
        Self::StartEntity(name.into())
    }

    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Literal {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Delivers this event to `receiver`.
    pub fn send_to<R: StreamReceiver + ?Sized>(&self, receiver: &mut R) -> CodecResult<()> {
        match self {
            Self::StartRecord(id) => receiver.start_record(id.as_deref()),
            Self::StartEntity(name) => receiver.start_entity(name),
            Self::Literal { name, value } => receiver.literal(name, value),
            Self::EndEntity => receiver.end_entity(),
            Self::EndRecord => receiver.end_record(),
        }
    }
}
