use crate::common::types::{AccountId, Bet, RequestId};
use crate::errors::{WagerError, WagerResult};
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// A dispatched randomness request waiting for its callback
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest<S> {
    pub player: AccountId,
    pub bet: Bet<S>,
    pub requested_at: DateTime<Utc>,
}

/// Request id -> requesting player and frozen bet.
///
/// Each entry is consumed exactly once, by fulfillment or cancellation.
pub struct PendingPool<S> {
    pending: HashMap<RequestId, PendingRequest<S>>,
}

impl<S> PendingPool<S> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    /// Track a new request; an id that is still pending is refused
    pub fn add_pending(&mut self, request_id: RequestId, request: PendingRequest<S>) -> WagerResult<()> {
        match self.pending.entry(request_id) {
            Entry::Occupied(_) => Err(WagerError::DuplicateRequest(request_id)),
            Entry::Vacant(slot) => {
                slot.insert(request);
                Ok(())
            }
        }
    }

    /// Put back a request taken by an operation that was rolled back
    pub fn reinstate(&mut self, request_id: RequestId, request: PendingRequest<S>) {
        self.pending.insert(request_id, request);
    }

    pub fn get(&self, request_id: &RequestId) -> Option<&PendingRequest<S>> {
        self.pending.get(request_id)
    }

    /// Remove and return the request for `request_id`
    pub fn take(&mut self, request_id: &RequestId) -> Option<PendingRequest<S>> {
        self.pending.remove(request_id)
    }

    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.pending.contains_key(request_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl<S> Default for PendingPool<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Asset;

    #[test]
    fn test_pending_pool() {
        let mut pool = PendingPool::new();
        let request = PendingRequest {
            player: AccountId::from("alice"),
            bet: Bet::frozen(100, 42u8, Asset::Native, 1, 184),
            requested_at: Utc::now(),
        };

        pool.add_pending(RequestId(1), request.clone()).unwrap();
        assert_eq!(pool.pending_count(), 1);
        assert!(pool.is_pending(&RequestId(1)));

        assert_eq!(pool.take(&RequestId(1)), Some(request));
        assert!(pool.take(&RequestId(1)).is_none());
        assert_eq!(pool.pending_count(), 0);
    }

    #[test]
    fn test_add_pending_refuses_live_id() {
        let mut pool = PendingPool::new();
        let request = |player: &str, stake: u64| PendingRequest {
            player: AccountId::from(player),
            bet: Bet::frozen(stake, 42u8, Asset::Native, 1, 184),
            requested_at: Utc::now(),
        };

        pool.add_pending(RequestId(1), request("alice", 100)).unwrap();
        let err = pool.add_pending(RequestId(1), request("bob", 200)).unwrap_err();
        assert!(matches!(err, WagerError::DuplicateRequest(RequestId(1))));
        assert_eq!(pool.get(&RequestId(1)).unwrap().player, AccountId::from("alice"));

        let taken = pool.take(&RequestId(1)).unwrap();
        pool.reinstate(RequestId(1), taken);
        assert_eq!(pool.get(&RequestId(1)).unwrap().bet.stake, 100);

        pool.take(&RequestId(1));
        assert!(pool.add_pending(RequestId(1), request("bob", 200)).is_ok());
    }
}
