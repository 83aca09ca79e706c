//! Request correlation table.
//!
//! Issues request ids and keeps the callback registered for each pending
//! request until its terminal response arrives.
//!
//! # Id Policy
//!
//! Ids start at a random point in `[1, ceiling]`, increase by one and wrap
//! from `ceiling` back to 1. Zero is never issued. An id still held by a
//! pending request is skipped, so a wrapped counter can never hand out an
//! id that is waiting for its answer.
//!
//! # Dispatch
//!
//! A callback is *checked out* while it runs and *checked in* afterwards.
//! The entry stays in the table during the call (so its id is not reused)
//! and the callback may freely cancel its own id or issue new requests.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::Response;

// ============================================================================
// Types
// ============================================================================

/// Callback invoked for every response part of one request.
pub type ResponseCallback = Box<dyn FnMut(&Channel, &Response) + Send>;

/// State of one pending entry.
enum Slot<C> {
    /// Waiting for a response.
    Ready(C),
    /// Callback currently running.
    Dispatching,
}

// ============================================================================
// CorrelationTable
// ============================================================================

/// Map of pending request ids to their callbacks.
pub(crate) struct CorrelationTable<C = ResponseCallback> {
    next_id: u32,
    ceiling: u32,
    max_pending: Option<usize>,
    pending: FxHashMap<RequestId, Slot<C>>,
}

impl<C> CorrelationTable<C> {
    /// Creates a table whose first id is random.
    pub(crate) fn new(ceiling: u32, max_pending: Option<usize>) -> Self {
        let start = rand::random_range(1..=ceiling.max(1));
        Self::starting_at(start, ceiling, max_pending)
    }

    /// Creates a table whose first id is `start`.
    pub(crate) fn starting_at(start: u32, ceiling: u32, max_pending: Option<usize>) -> Self {
        let ceiling = ceiling.max(1);
        Self {
            next_id: start.clamp(1, ceiling),
            ceiling,
            max_pending,
            pending: FxHashMap::default(),
        }
    }

    /// Number of pending entries, including callbacks being dispatched.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if the id is pending.
    #[inline]
    pub(crate) fn contains(&self, id: RequestId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Fails if one more callback would exceed the pending limit.
    pub(crate) fn check_capacity(&self) -> Result<()> {
        match self.max_pending {
            Some(max) if self.pending.len() >= max => Err(Error::TooManyPending {
                pending: self.pending.len(),
                max,
            }),
            _ => Ok(()),
        }
    }

    /// Issues the next free id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdSpaceExhausted`] if every id up to the ceiling is
    /// pending.
    pub(crate) fn allocate(&mut self) -> Result<RequestId> {
        if self.pending.len() as u64 >= u64::from(self.ceiling) {
            return Err(Error::IdSpaceExhausted {
                ceiling: self.ceiling,
            });
        }

        loop {
            let candidate = RequestId::from_raw(self.next_id);
            self.next_id = if self.next_id >= self.ceiling {
                1
            } else {
                self.next_id + 1
            };

            if !self.pending.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
    }

    /// Registers a callback, replacing any earlier one for the same id.
    pub(crate) fn register(&mut self, id: RequestId, callback: C) {
        self.pending.insert(id, Slot::Ready(callback));
    }

    /// Removes an entry. Returns `true` if it existed.
    pub(crate) fn remove(&mut self, id: RequestId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Takes the callback out for dispatch, leaving the id reserved.
    pub(crate) fn checkout(&mut self, id: RequestId) -> Option<C> {
        let slot = self.pending.get_mut(&id)?;
        match std::mem::replace(slot, Slot::Dispatching) {
            Slot::Ready(callback) => Some(callback),
            Slot::Dispatching => None,
        }
    }

    /// Returns a dispatched callback.
    ///
    /// A terminal response releases the id. Otherwise the callback waits
    /// for the next part, unless it was cancelled or replaced meanwhile, in
    /// which case it is dropped.
    pub(crate) fn checkin(&mut self, id: RequestId, callback: C, terminal: bool) {
        if !matches!(self.pending.get(&id), Some(Slot::Dispatching)) {
            return;
        }

        if terminal {
            self.pending.remove(&id);
        } else {
            self.pending.insert(id, Slot::Ready(callback));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: u32) -> RequestId {
        RequestId::new(value).expect("non-zero")
    }

    #[test]
    fn test_ids_increase_from_start() {
        let mut table = CorrelationTable::<()>::starting_at(10, u32::MAX, None);
        assert_eq!(table.allocate().expect("id"), id(10));
        assert_eq!(table.allocate().expect("id"), id(11));
        assert_eq!(table.allocate().expect("id"), id(12));
    }

    #[test]
    fn test_random_start_within_range() {
        let mut table = CorrelationTable::<()>::new(50, None);
        let first = table.allocate().expect("id").as_u32();
        assert!((1..=50).contains(&first));
    }

    #[test]
    fn test_wraps_to_one_and_skips_zero() {
        let mut table = CorrelationTable::<()>::starting_at(3, 3, None);
        assert_eq!(table.allocate().expect("id"), id(3));
        assert_eq!(table.allocate().expect("id"), id(1));
        assert_eq!(table.allocate().expect("id"), id(2));
    }

    #[test]
    fn test_wrap_skips_pending_ids() {
        let mut table = CorrelationTable::starting_at(1, 3, None);
        let first = table.allocate().expect("id");
        table.register(first, "a");
        table.allocate().expect("id");
        table.allocate().expect("id");

        // Counter is back at 1, which is still pending.
        assert_eq!(table.allocate().expect("id"), id(2));
    }

    #[test]
    fn test_exhausted_when_every_id_pending() {
        let mut table = CorrelationTable::starting_at(1, 2, None);
        for _ in 0..2 {
            let next = table.allocate().expect("id");
            table.register(next, ());
        }
        assert!(matches!(
            table.allocate(),
            Err(Error::IdSpaceExhausted { ceiling: 2 })
        ));
    }

    #[test]
    fn test_capacity_limit() {
        let mut table = CorrelationTable::starting_at(1, 100, Some(1));
        assert!(table.check_capacity().is_ok());
        table.register(id(1), ());
        assert!(matches!(
            table.check_capacity(),
            Err(Error::TooManyPending { pending: 1, max: 1 })
        ));
    }

    #[test]
    fn test_terminal_checkin_releases_id() {
        let mut table = CorrelationTable::starting_at(1, 100, None);
        table.register(id(1), "cb");

        let callback = table.checkout(id(1)).expect("registered");
        assert!(table.contains(id(1)));
        assert!(table.checkout(id(1)).is_none());

        table.checkin(id(1), callback, true);
        assert!(!table.contains(id(1)));
    }

    #[test]
    fn test_partial_checkin_keeps_callback() {
        let mut table = CorrelationTable::starting_at(1, 100, None);
        table.register(id(1), "cb");

        let callback = table.checkout(id(1)).expect("registered");
        table.checkin(id(1), callback, false);

        assert_eq!(table.checkout(id(1)), Some("cb"));
    }

    #[test]
    fn test_cancel_during_dispatch_drops_callback() {
        let mut table = CorrelationTable::starting_at(1, 100, None);
        table.register(id(1), "cb");

        let callback = table.checkout(id(1)).expect("registered");
        assert!(table.remove(id(1)));
        table.checkin(id(1), callback, false);

        assert!(!table.contains(id(1)));
        assert_eq!(table.len(), 0);
    }
}
