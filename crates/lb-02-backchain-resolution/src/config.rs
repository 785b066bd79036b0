//! Backchain resolution configuration.

use serde::{Deserialize, Serialize};

/// Version of the backchain request protocol spoken with the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// Transactions only.
    V1,
    /// Transactions plus signed group parameters.
    #[default]
    V2,
}

impl ProtocolVersion {
    /// Whether `GetSignedGroupParameters` may be exchanged.
    #[must_use]
    pub fn supports_group_parameters(self) -> bool {
        matches!(self, Self::V2)
    }
}

/// Backchain resolution configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Maximum number of ids per `Get` request.
    pub batch_size: usize,
    /// Protocol version for both requester and responder.
    pub protocol_version: ProtocolVersion,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            protocol_version: ProtocolVersion::V2,
        }
    }
}

impl ResolutionConfig {
    /// Small batches so multi-round exchanges show up in short chains.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_testing() -> Self {
        Self {
            batch_size: 2,
            protocol_version: ProtocolVersion::V2,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_protocol_version(mut self, protocol_version: ProtocolVersion) -> Self {
        self.protocol_version = protocol_version;
        self
    }

    /// Batch size used for requests; a zero batch size would never drain the
    /// frontier, so it is treated as one.
    #[must_use]
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}
