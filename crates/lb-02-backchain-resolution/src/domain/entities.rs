//! Resolution results.

use serde::{Deserialize, Serialize};
use shared_types::entities::TransactionId;

/// Successful outcome of resolving a set of root transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    /// Transactions verified during this run, in processing order.
    pub verified_in_order: Vec<TransactionId>,
    /// Roots that were already verified locally.
    pub already_verified: Vec<TransactionId>,
    /// Whether the peer had to be asked for anything.
    pub resolution_required: bool,
}

impl ResolutionOutcome {
    /// Outcome when every root was already verified.
    pub fn skipped(already_verified: Vec<TransactionId>) -> Self {
        Self {
            verified_in_order: Vec::new(),
            already_verified,
            resolution_required: false,
        }
    }

    pub fn verified_count(&self) -> usize {
        self.verified_in_order.len()
    }
}

/// Summary of one responder loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponderSummary {
    pub get_requests: usize,
    pub transactions_sent: usize,
    pub group_parameters_sent: usize,
}
