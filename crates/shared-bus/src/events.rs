//! # Ledger Events
//!
//! Defines all event types that flow through the shared bus between the
//! backchain subsystems.

use serde::{Deserialize, Serialize};
use shared_types::entities::TransactionId;

/// Subsystem id of contract verification (lb-01).
pub const CONTRACT_VERIFICATION: u8 = 1;
/// Subsystem id of backchain resolution (lb-02).
pub const BACKCHAIN_RESOLUTION: u8 = 2;
/// Subsystem id of verification redelivery (lb-03).
pub const VERIFICATION_REDELIVERY: u8 = 3;

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    // =========================================================================
    // SUBSYSTEM 1: CONTRACT VERIFICATION
    // =========================================================================
    /// A contract verification request was submitted.
    /// Source: any caller | Target: Subsystem 1, Subsystem 3 (tracking)
    VerificationRequested {
        /// Request identifier used for correlation and redelivery keys.
        request_id: String,
        /// Serialized request.
        payload: Vec<u8>,
    },

    /// A contract verification request completed (either outcome).
    /// Source: Subsystem 1 | Target: Subsystem 3 (cancels redelivery)
    VerificationCompleted {
        /// Request identifier.
        request_id: String,
        /// Transaction that was verified.
        transaction_id: TransactionId,
        /// Whether every contract accepted the transaction.
        verified: bool,
    },

    // =========================================================================
    // SUBSYSTEM 2: BACKCHAIN RESOLUTION
    // =========================================================================
    /// A backchain was resolved and every ancestor verified.
    BackchainResolved {
        /// Root transactions the resolution was started for.
        roots: Vec<TransactionId>,
        /// Number of ancestors retrieved and verified in this run.
        resolved: usize,
    },

    /// Backchain resolution failed.
    BackchainResolutionFailed {
        /// Root transactions the resolution was started for.
        roots: Vec<TransactionId>,
        /// Human-readable cause.
        reason: String,
    },

    // =========================================================================
    // SUBSYSTEM 3: VERIFICATION REDELIVERY
    // =========================================================================
    /// A pending verification request is redelivered after its window expired.
    VerificationRedelivery {
        /// Request identifier.
        request_id: String,
        /// Delivery attempt this redelivery represents (first delivery is 1).
        attempt: u32,
        /// The original serialized request.
        payload: Vec<u8>,
    },
}

impl LedgerEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::VerificationRequested { .. } | Self::VerificationCompleted { .. } => {
                EventTopic::ContractVerification
            }
            Self::BackchainResolved { .. } | Self::BackchainResolutionFailed { .. } => {
                EventTopic::BackchainResolution
            }
            Self::VerificationRedelivery { .. } => EventTopic::Redelivery,
        }
    }

    /// Get the originating subsystem ID.
    #[must_use]
    pub fn source_subsystem(&self) -> u8 {
        match self {
            Self::VerificationRequested { .. } | Self::VerificationCompleted { .. } => {
                CONTRACT_VERIFICATION
            }
            Self::BackchainResolved { .. } | Self::BackchainResolutionFailed { .. } => {
                BACKCHAIN_RESOLUTION
            }
            Self::VerificationRedelivery { .. } => VERIFICATION_REDELIVERY,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Subsystem 1 events.
    ContractVerification,
    /// Subsystem 2 events.
    BackchainResolution,
    /// Subsystem 3 events (the redelivery topic).
    Redelivery,
    /// All events (no filtering).
    All,
}

/// Topics a subscription accepts. Empty (or containing `All`) accepts
/// everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    #[must_use]
    pub fn matches(&self, event: &LedgerEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
