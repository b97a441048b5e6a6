use crate::codec::CodecResult;
use crate::model::event::StreamEvent;
use crate::stream::StreamReceiver;

/// Receiver that records every event it is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventList {
    events: Vec<StreamEvent>,
    resets: usize,
    closed: bool,
}

impl EventList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<StreamEvent> {
        self.events
    }

    /// Number of `reset_stream` calls received.
    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl StreamReceiver for EventList {
    fn start_record(&mut self, id: Option<&str>) -> CodecResult<()> {
        self.events
            .push(StreamEvent::StartRecord(id.map(str::to_string)));
        Ok(())
    }

    fn start_entity(&mut self, name: &str) -> CodecResult<()> {
        self.events.push(StreamEvent::start_entity(name));
        Ok(())
    }

    fn literal(&mut self, name: &str, value: &str) -> CodecResult<()> {
        self.events.push(StreamEvent::literal(name, value));
        Ok(())
    }

    fn end_entity(&mut self) -> CodecResult<()> {
        self.events.push(StreamEvent::EndEntity);
        Ok(())
    }

    fn end_record(&mut self) -> CodecResult<()> {
        self.events.push(StreamEvent::EndRecord);
        Ok(())
    }

    fn reset_stream(&mut self) -> CodecResult<()> {
        self.resets += 1;
        Ok(())
    }

    fn close_stream(&mut self) -> CodecResult<()> {
        self.closed = true;
        Ok(())
    }
}
