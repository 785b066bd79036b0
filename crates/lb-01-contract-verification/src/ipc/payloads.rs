//! # IPC Message Payloads
//!
//! Request/response types of the verification request subsystem.

use crate::domain::entities::ContractVerificationResult;
use crate::domain::errors::{ErrorCategory, VerificationError};
use serde::{Deserialize, Serialize};
use shared_types::entities::{Hash, LedgerTransaction, TransactionId};
use std::collections::BTreeMap;

/// Request to verify the contracts of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyContractsRequest {
    /// Correlation id; also the redelivery key.
    pub request_id: String,
    /// Serialized `LedgerTransaction`.
    pub transaction: Vec<u8>,
    /// Code packages the contracts are loaded from.
    #[serde(default)]
    pub cpk_checksums: Vec<Hash>,
    /// Opaque caller context echoed into logs.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl VerifyContractsRequest {
    /// Build a request for `transaction`.
    pub fn new(
        request_id: impl Into<String>,
        transaction: &LedgerTransaction,
    ) -> Result<Self, VerificationError> {
        let bytes = serde_json::to_vec(transaction)
            .map_err(|e| VerificationError::Internal(format!("encode transaction: {e}")))?;
        Ok(Self {
            request_id: request_id.into(),
            transaction: bytes,
            cpk_checksums: transaction.metadata.cpk_checksums.clone(),
            context: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Decode the embedded transaction.
    pub fn decode_transaction(&self) -> Result<LedgerTransaction, VerificationError> {
        serde_json::from_slice(&self.transaction)
            .map_err(|e| VerificationError::Deserialization(e.to_string()))
    }

    /// Encode the request for the event bus.
    pub fn to_bytes(&self) -> Result<Vec<u8>, VerificationError> {
        serde_json::to_vec(self)
            .map_err(|e| VerificationError::Internal(format!("encode request: {e}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VerificationError> {
        serde_json::from_slice(bytes).map_err(|e| VerificationError::Deserialization(e.to_string()))
    }
}

/// Outcome of a verification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerifyContractsOutcome {
    /// Contracts ran; the result may still be `Invalid`.
    Completed {
        transaction_id: TransactionId,
        result: ContractVerificationResult,
    },
    /// Verification could not run.
    Failed {
        category: ErrorCategory,
        message: String,
    },
}

/// Response to `VerifyContractsRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyContractsResponse {
    /// Correlation id matching the request.
    pub request_id: String,
    pub outcome: VerifyContractsOutcome,
}

impl VerifyContractsResponse {
    /// Whether the caller should deliver the request again later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.outcome,
            VerifyContractsOutcome::Failed {
                category: ErrorCategory::Retryable,
                ..
            }
        )
    }

    #[must_use]
    pub fn result(&self) -> Option<&ContractVerificationResult> {
        match &self.outcome {
            VerifyContractsOutcome::Completed { result, .. } => Some(result),
            VerifyContractsOutcome::Failed { .. } => None,
        }
    }
}
