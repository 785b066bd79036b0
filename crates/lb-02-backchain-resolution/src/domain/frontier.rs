//! Retrieval frontier.
//!
//! Insertion-ordered, deduplicating set of transaction ids still to be
//! reconciled locally or fetched from the peer.

use shared_types::entities::TransactionId;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default, Clone)]
pub struct Frontier {
    order: BTreeMap<u64, TransactionId>,
    positions: HashMap<TransactionId, u64>,
    next_sequence: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` at the back. Returns `false` if it was already present.
    pub fn insert(&mut self, id: TransactionId) -> bool {
        if self.positions.contains_key(&id) {
            return false;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.order.insert(sequence, id);
        self.positions.insert(id, sequence);
        true
    }

    pub fn remove(&mut self, id: &TransactionId) -> bool {
        match self.positions.remove(id) {
            Some(sequence) => {
                self.order.remove(&sequence);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.positions.contains_key(id)
    }

    /// Up to `limit` ids from the front, without removing them.
    pub fn peek_batch(&self, limit: usize) -> Vec<TransactionId> {
        self.order.values().take(limit).copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransactionId> {
        self.order.values()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl FromIterator<TransactionId> for Frontier {
    fn from_iter<I: IntoIterator<Item = TransactionId>>(iter: I) -> Self {
        let mut frontier = Self::new();
        for id in iter {
            frontier.insert(id);
        }
        frontier
    }
}
