//! Message payloads exchanged between logical processes.
//!
//! Payloads are opaque to the engine: a sender boxes any `Send` value and
//! the destination downcasts it back. Delivery is staged — a message sent
//! during tick `t` reaches its destination's inbox no earlier than tick
//! `t + 1`.

use std::any::Any;
use std::fmt;

use smallvec::SmallVec;

use crate::id::LpId;

/// An opaque message payload.
pub type Payload = Box<dyn Any + Send>;

/// The batch of payloads delivered to a process at the start of a tick.
///
/// Inline capacity covers the common zero-or-few-messages case without
/// heap allocation.
pub type Inbox = SmallVec<[Payload; 2]>;

/// A staged message: destination plus payload.
///
/// Envelopes sit in the sending runner's outbound buckets until the
/// simulator transposes them into the destination runner's inbound staging
/// at the start of the next tick.
pub struct Envelope {
    /// The addressed logical process.
    pub dst: LpId,
    /// The payload appended to the destination's inbox on delivery.
    pub payload: Payload,
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("dst", &self.dst)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{RunnerId, Tick};

    #[test]
    fn payload_round_trips_through_any() {
        let payload: Payload = Box::new(42u32);
        assert_eq!(payload.downcast_ref::<u32>(), Some(&42));
        assert!(payload.downcast_ref::<String>().is_none());
    }

    #[test]
    fn envelope_debug_shows_destination_only() {
        let env = Envelope {
            dst: LpId {
                runner: RunnerId(1),
                slot: 0,
                created: Tick(5),
            },
            payload: Box::new(()),
        };
        let debug = format!("{env:?}");
        assert!(debug.contains("1/0@5"));
    }
}
