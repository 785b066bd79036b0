//! Inbound Ports (Driving Ports / API)

use crate::domain::entities::ContractVerificationResult;
use shared_types::entities::LedgerTransaction;

/// Primary Contract Verification API.
///
/// Implementations are stateless with respect to the transaction and may be
/// called concurrently for different transactions.
pub trait ContractVerificationApi: Send + Sync {
    /// Run the encumbrance check and every governing contract over
    /// `transaction`, collecting all failures.
    fn verify(&self, transaction: &LedgerTransaction) -> ContractVerificationResult;
}
