//! Verification results and failure records.

use serde::{Deserialize, Serialize};

/// Outcome of verifying one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationStatus {
    Verified,
    Invalid,
}

/// One failure recorded while verifying a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractVerificationFailure {
    /// Contract class that failed, or the encumbrance check marker.
    pub contract_class_name: String,
    /// Distinct state class names governed by the contract in this transaction.
    pub contract_state_class_names: Vec<String>,
    /// Class of the error raised by the contract.
    pub exception_class_name: String,
    /// Human-readable message.
    pub exception_message: String,
}

impl std::fmt::Display for ContractVerificationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] failed with {}: {}",
            self.contract_class_name,
            self.contract_state_class_names.join(", "),
            self.exception_class_name,
            self.exception_message
        )
    }
}

/// Result of running every applicable contract over a transaction.
///
/// The status is derived from the failures, so the two cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractVerificationResult {
    status: VerificationStatus,
    failures: Vec<ContractVerificationFailure>,
}

impl ContractVerificationResult {
    #[must_use]
    pub fn verified() -> Self {
        Self {
            status: VerificationStatus::Verified,
            failures: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_failures(failures: Vec<ContractVerificationFailure>) -> Self {
        let status = if failures.is_empty() {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Invalid
        };
        Self { status, failures }
    }

    #[must_use]
    pub fn status(&self) -> VerificationStatus {
        self.status
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }

    #[must_use]
    pub fn failures(&self) -> &[ContractVerificationFailure] {
        &self.failures
    }

    #[must_use]
    pub fn into_failures(self) -> Vec<ContractVerificationFailure> {
        self.failures
    }
}
