//! Outbound Ports (Driven Ports / SPI)

use crate::domain::errors::ContractViolation;
use shared_types::entities::{Hash, LedgerTransaction};

/// Verification logic of one contract class.
pub trait Contract: Send + Sync {
    /// Accept or reject the transaction. The whole transaction is passed for
    /// context; the contract normally inspects the states it governs.
    fn verify(&self, transaction: &LedgerTransaction) -> Result<(), ContractViolation>;
}

/// Creates contract instances from their class identifier.
pub trait ContractFactory: Send + Sync {
    /// Instantiate the contract named `contract_class`.
    fn create(&self, contract_class: &str) -> Result<Box<dyn Contract>, ContractViolation>;
}

/// Availability of a code package on this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpkAvailability {
    Available,
    /// Known to the network but not installed here yet.
    Pending,
    /// Installed but not permitted to execute.
    Disallowed,
}

/// Looks up code packages by checksum.
pub trait CpkResolver: Send + Sync {
    fn availability(&self, checksum: &Hash) -> CpkAvailability;
}
