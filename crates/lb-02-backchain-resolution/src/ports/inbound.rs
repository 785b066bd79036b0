//! Inbound Ports (Driving Ports / API)

use crate::domain::entities::ResolutionOutcome;
use crate::domain::errors::ResolutionError;
use crate::ports::outbound::RequesterSession;
use async_trait::async_trait;
use shared_types::entities::TransactionId;

/// Primary Backchain Resolution API.
#[async_trait]
pub trait BackchainResolutionApi: Send + Sync {
    /// Resolve and verify the backchains of `roots` using `session`'s peer.
    ///
    /// On success every transaction of the backchains is verified locally.
    async fn resolve(
        &self,
        roots: &[TransactionId],
        session: &mut dyn RequesterSession,
    ) -> Result<ResolutionOutcome, ResolutionError>;
}
