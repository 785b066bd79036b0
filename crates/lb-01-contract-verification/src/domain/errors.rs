//! Error types for Contract Verification

use serde::{Deserialize, Serialize};
use shared_types::entities::Hash;
use thiserror::Error;

/// Placeholder used when a contract error carries no message.
pub const NULL_MESSAGE: &str = "<Message was null>";

/// Error raised by a contract (or its construction) while verifying.
///
/// `kind` plays the role of an exception class name in failure records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {}", .message.as_deref().unwrap_or(NULL_MESSAGE))]
pub struct ContractViolation {
    pub kind: String,
    pub message: Option<String>,
}

impl ContractViolation {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: Some(message.into()),
        }
    }

    /// A violation without a message.
    pub fn bare(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: None,
        }
    }

    /// Failed `requires` clause.
    pub fn requirement(message: impl Into<String>) -> Self {
        Self::new("RequirementFailed", message)
    }

    /// Fail with a requirement violation unless `condition` holds.
    pub fn require(condition: bool, message: impl Into<String>) -> Result<(), Self> {
        if condition {
            Ok(())
        } else {
            Err(Self::requirement(message))
        }
    }
}

/// Categories for errors that prevent a verification request from completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Worth a bounded retry (e.g. a code package is not available yet).
    Retryable,
    /// Surfaced to the caller; retrying will not help.
    Platform,
    /// The verification subsystem itself is broken.
    Fatal,
}

/// Errors that stop a verification request before a result is produced.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// A required code package is not (yet) available locally.
    #[error("Code package not available: {0:#x}")]
    CpkNotAvailable(Hash),

    /// A code package is known but not allowed to run.
    #[error("Code package not allowed: {0:#x}")]
    CpkNotAllowed(Hash),

    /// The serialized transaction could not be decoded.
    #[error("Failed to deserialize transaction: {0}")]
    Deserialization(String),

    /// Internal invariant broken inside the verifier.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VerificationError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CpkNotAvailable(_) => ErrorCategory::Retryable,
            Self::CpkNotAllowed(_) | Self::Deserialization(_) => ErrorCategory::Platform,
            Self::Internal(_) => ErrorCategory::Fatal,
        }
    }
}

/// Classify an error escaping the verification pipeline.
///
/// Anything that is not a known `VerificationError` is a platform error.
#[must_use]
pub fn categorize(error: &anyhow::Error) -> ErrorCategory {
    match error.downcast_ref::<VerificationError>() {
        Some(known) => known.category(),
        None => ErrorCategory::Platform,
    }
}
