use crate::codec::CodecResult;

/// Consumer of the record event protocol.
///
/// A well-formed session is any number of records, each framed by
/// `start_record`/`end_record` with balanced `start_entity`/`end_entity`
/// calls in between, followed by at most one `close_stream`.
pub trait StreamReceiver {
    /// Opens a record. `id` is `None` when the record has no identifier.
    fn start_record(&mut self, id: Option<&str>) -> CodecResult<()>;

    fn start_entity(&mut self, name: &str) -> CodecResult<()>;

    fn literal(&mut self, name: &str, value: &str) -> CodecResult<()>;

    fn end_entity(&mut self) -> CodecResult<()>;

    fn end_record(&mut self) -> CodecResult<()>;

    /// Drops any in-flight record state.
    fn reset_stream(&mut self) -> CodecResult<()> {
        Ok(())
    }

    /// Ends the session and releases owned resources.
    fn close_stream(&mut self) -> CodecResult<()> {
        Ok(())
    }
}

impl<R: StreamReceiver + ?Sized> StreamReceiver for &mut R {
    fn start_record(&mut self, id: Option<&str>) -> CodecResult<()> {
        (**self).start_record(id)
    }

    fn start_entity(&mut self, name: &str) -> CodecResult<()> {
        (**self).start_entity(name)
    }

    fn literal(&mut self, name: &str, value: &str) -> CodecResult<()> {
        (**self).literal(name, value)
    }

    fn end_entity(&mut self) -> CodecResult<()> {
        (**self).end_entity()
    }

    fn end_record(&mut self) -> CodecResult<()> {
        (**self).end_record()
    }

    fn reset_stream(&mut self) -> CodecResult<()> {
        (**self).reset_stream()
    }

    fn close_stream(&mut self) -> CodecResult<()> {
        (**self).close_stream()
    }
}

impl<R: StreamReceiver + ?Sized> StreamReceiver for Box<R> {
    fn start_record(&mut self, id: Option<&str>) -> CodecResult<()> {
        (**self).start_record(id)
    }

    fn start_entity(&mut self, name: &str) -> CodecResult<()> {
        (**self).start_entity(name)
    }

    fn literal(&mut self, name: &str, value: &str) -> CodecResult<()> {
        (**self).literal(name, value)
    }

    fn end_entity(&mut self) -> CodecResult<()> {
        (**self).end_entity()
    }

    fn end_record(&mut self) -> CodecResult<()> {
        (**self).end_record()
    }

    fn reset_stream(&mut self) -> CodecResult<()> {
        (**self).reset_stream()
    }

    fn close_stream(&mut self) -> CodecResult<()> {
        (**self).close_stream()
    }
}
