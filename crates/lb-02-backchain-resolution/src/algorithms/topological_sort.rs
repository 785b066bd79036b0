//! # Topological Sort
//!
//! Accumulates "X depends on {Y, Z}" facts discovered while walking a
//! backchain and yields an order in which every transaction comes after all
//! of its dependencies.
//!
//! Facts arrive dependents-first (a transaction is recorded when it is
//! received, before its dependencies have been fetched), so the insertion
//! order is not a processing order. [`TopologicalSort::complete`] performs
//! the sort over the recorded edges.
//!
//! Dependencies that were never recorded are ignored: they are verified
//! locally and need no processing.

use crate::domain::errors::ResolutionError;
use shared_types::entities::TransactionId;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Default, Clone)]
pub struct TopologicalSort {
    insertion_order: Vec<TransactionId>,
    ids: HashSet<TransactionId>,
    edges: HashMap<TransactionId, BTreeSet<TransactionId>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

impl TopologicalSort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `id` depends on `dependencies`.
    ///
    /// Idempotent: if `id` is already present this is a no-op, even when the
    /// dependency set differs. Returns whether the edge was recorded.
    pub fn add(
        &mut self,
        id: TransactionId,
        dependencies: impl IntoIterator<Item = TransactionId>,
    ) -> bool {
        if !self.ids.insert(id) {
            return false;
        }
        self.insertion_order.push(id);
        self.edges.insert(id, dependencies.into_iter().collect());
        true
    }

    /// Every recorded id.
    pub fn transaction_ids(&self) -> &HashSet<TransactionId> {
        &self.ids
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.ids.contains(id)
    }

    pub fn dependencies_of(&self, id: &TransactionId) -> Option<&BTreeSet<TransactionId>> {
        self.edges.get(id)
    }

    pub fn size(&self) -> usize {
        self.insertion_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insertion_order.is_empty()
    }

    /// Recorded ids in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TransactionId> {
        self.insertion_order.iter()
    }

    /// Processing order: each id after all of its recorded dependencies.
    ///
    /// Roots are visited in insertion order and dependencies in ascending id
    /// order, so the result is deterministic for a given set of facts.
    pub fn complete(&self) -> Result<Vec<TransactionId>, ResolutionError> {
        let mut marks: HashMap<TransactionId, Mark> = HashMap::with_capacity(self.size());
        let mut sorted = Vec::with_capacity(self.size());

        for root in &self.insertion_order {
            if marks.contains_key(root) {
                continue;
            }
            let Some(root_dependencies) = self.edges.get(root) else {
                continue;
            };
            marks.insert(*root, Mark::InProgress);
            let mut stack = vec![(*root, root_dependencies.iter())];

            while let Some((id, dependencies)) = stack.last_mut() {
                let id = *id;
                let Some(dependency) = dependencies.next().copied() else {
                    marks.insert(id, Mark::Done);
                    sorted.push(id);
                    stack.pop();
                    continue;
                };
                let Some(next_dependencies) = self.edges.get(&dependency) else {
                    continue;
                };
                match marks.get(&dependency) {
                    Some(Mark::Done) => {}
                    Some(Mark::InProgress) => {
                        return Err(ResolutionError::CycleDetected(dependency));
                    }
                    None => {
                        marks.insert(dependency, Mark::InProgress);
                        stack.push((dependency, next_dependencies.iter()));
                    }
                }
            }
        }

        Ok(sorted)
    }
}
