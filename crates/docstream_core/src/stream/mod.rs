//! Record stream protocol.
//!
//! # Responsibility
//! - Define the receiver side of the record event protocol.
//! - Provide an in-memory receiver and a replay helper for callers and tests.

mod event_list;
mod receiver;

pub use event_list::EventList;
pub use receiver::StreamReceiver;

use crate::codec::CodecResult;
use crate::model::event::StreamEvent;

/// Sends every event of `events` to `receiver` in order.
///
/// Stops at the first error; events after it are not delivered.
pub fn replay_events<R: StreamReceiver + ?Sized>(
    events: &[StreamEvent],
    receiver: &mut R,
) -> CodecResult<()> {
    for event in events {
        event.send_to(receiver)?;
    }
    Ok(())
}
