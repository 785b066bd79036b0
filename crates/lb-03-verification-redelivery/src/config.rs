//! Redelivery configuration.

use serde::{Deserialize, Serialize};

/// Redelivery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeliveryConfig {
    /// Time after a delivery at which an unacknowledged request is
    /// delivered again (milliseconds).
    pub expiry_window_ms: u64,
    /// Highest delivery attempt (the first delivery is attempt 1). Requests
    /// still unacknowledged after it are dropped.
    pub max_attempts: u32,
    /// Number of partitions request ids are spread over.
    pub partition_count: u32,
}

impl Default for RedeliveryConfig {
    fn default() -> Self {
        Self {
            expiry_window_ms: 30_000, // 30 seconds
            max_attempts: 5,
            partition_count: 16,
        }
    }
}

impl RedeliveryConfig {
    /// Testing config with a short window
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            expiry_window_ms: 1_000,
            max_attempts: 3,
            partition_count: 4,
        }
    }
}
