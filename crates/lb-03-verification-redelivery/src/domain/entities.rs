//! Redelivery records.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Partition owning a request id.
pub type PartitionId = u32;

/// A pending request scheduled for redelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeliveryEntry {
    /// Request identifier; the scheduling key.
    pub request_id: String,
    /// Partition that owns the request.
    pub partition: PartitionId,
    /// When to deliver, in milliseconds since the Unix epoch.
    pub scheduled_delivery_ms: u64,
    /// Delivery attempt the redelivery will represent.
    pub attempt: u32,
    /// Original request payload.
    pub payload: Vec<u8>,
}

impl RedeliveryEntry {
    /// Milliseconds from `now_ms` until delivery; zero if already due.
    #[must_use]
    pub fn delay_from(&self, now_ms: u64) -> u64 {
        self.scheduled_delivery_ms.saturating_sub(now_ms)
    }
}

/// Stable partition assignment: the first four bytes of the SHA-256 of the
/// request id, modulo `partition_count`.
#[must_use]
pub fn partition_for(request_id: &str, partition_count: u32) -> PartitionId {
    let digest = Sha256::digest(request_id.as_bytes());
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    prefix % partition_count.max(1)
}
