//! Outbound queue.
//!
//! Holds envelopes submitted while the channel is not connected. The queue
//! is drained in submission order as soon as the transport opens.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use crate::error::Result;
use crate::protocol::Request;

// ============================================================================
// OutboundQueue
// ============================================================================

/// FIFO of envelopes waiting for a connection.
#[derive(Debug, Default)]
pub(crate) struct OutboundQueue {
    envelopes: VecDeque<Request>,
}

impl OutboundQueue {
    /// Number of queued envelopes.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.envelopes.len()
    }

    /// Appends an envelope to the tail.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEnvelope`](crate::Error::InvalidEnvelope)
    /// without queuing if the envelope lacks an id or path.
    pub(crate) fn push(&mut self, envelope: Request) -> Result<()> {
        envelope.validate()?;
        self.envelopes.push_back(envelope);
        Ok(())
    }

    /// Removes and returns every queued envelope, oldest first.
    pub(crate) fn take(&mut self) -> VecDeque<Request> {
        std::mem::take(&mut self.envelopes)
    }

    /// Puts envelopes back at the head, keeping their order.
    ///
    /// Used when a flush is cut short by a failing transport.
    pub(crate) fn requeue_front(&mut self, envelopes: impl IntoIterator<Item = Request>) {
        let mut restored: VecDeque<Request> = envelopes.into_iter().collect();
        restored.append(&mut self.envelopes);
        self.envelopes = restored;
    }

    /// Discards everything, returning what was dropped.
    pub(crate) fn clear(&mut self) -> Vec<Request> {
        self.envelopes.drain(..).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    use crate::identifiers::RequestId;

    fn envelope(id: u32, path: &str) -> Request {
        Request::new(RequestId::from_raw(id), path, json!({}))
    }

    #[test]
    fn test_rejects_invalid_envelopes() {
        let mut queue = OutboundQueue::default();
        assert!(queue.push(envelope(0, "/a/")).is_err());
        assert!(queue.push(envelope(1, "")).is_err());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_requeue_front_keeps_order() {
        let mut queue = OutboundQueue::default();
        queue.push(envelope(3, "/c/")).expect("valid");

        queue.requeue_front([envelope(1, "/a/"), envelope(2, "/b/")]);

        let ids: Vec<u32> = queue.take().iter().map(|e| e.id.as_u32()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_clear_returns_discarded() {
        let mut queue = OutboundQueue::default();
        queue.push(envelope(1, "/a/")).expect("valid");
        queue.push(envelope(2, "/b/")).expect("valid");

        let dropped = queue.clear();
        assert_eq!(dropped.len(), 2);
        assert_eq!(queue.len(), 0);
    }

    proptest! {
        #[test]
        fn prop_take_preserves_submission_order(ids in proptest::collection::vec(1u32.., 0..64)) {
            let mut queue = OutboundQueue::default();
            for id in &ids {
                queue.push(envelope(*id, "/p/")).expect("valid");
            }

            let drained: Vec<u32> = queue.take().into_iter().map(|e| e.id.as_u32()).collect();
            prop_assert_eq!(drained, ids);
        }
    }
}
