//! Error types for Backchain Resolution

use crate::config::ProtocolVersion;
use lb_01_contract_verification::ContractVerificationFailure;
use shared_types::entities::{Hash, TransactionId};
use shared_types::errors::StoreError;
use thiserror::Error;

/// Errors raised by a session transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The counterparty went away.
    #[error("Session with {counterparty} closed")]
    Closed { counterparty: String },

    #[error("Failed to encode message: {0}")]
    Encode(String),

    #[error("Failed to decode message: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Errors that abort a backchain resolution (or a responder loop).
///
/// Every variant is fatal to the session it occurs in; nothing is retried
/// at this layer.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// An ancestor is known locally to be invalid.
    #[error("Backchain contains invalid transactions: {}", format_ids(.0))]
    InvalidAncestors(Vec<TransactionId>),

    /// The peer sent a transaction that was not part of the requested batch.
    #[error("Peer sent unrequested transaction {id}")]
    UnrequestedTransaction { id: TransactionId },

    /// The id of a received transaction does not match its content.
    #[error("Transaction {id} does not match its content")]
    TransactionIdMismatch { id: TransactionId },

    /// The peer ended a batch without sending every requested transaction.
    #[error("Peer did not send requested transactions: {}", format_ids(.missing))]
    IncompleteBatch { missing: Vec<TransactionId> },

    /// The peer sent a response of the wrong kind.
    #[error("Unexpected response: expected {expected}, received {received}")]
    UnexpectedResponse {
        expected: &'static str,
        received: String,
    },

    /// The requester sent a request kind the responder does not recognise.
    #[error("Unrecognized backchain request")]
    UnrecognizedRequest,

    /// The request is valid in a later protocol version only.
    #[error("{request} is not supported by protocol {version:?}")]
    UnsupportedRequest {
        request: &'static str,
        version: ProtocolVersion,
    },

    /// A requested transaction is not stored locally.
    #[error("Requested transaction {0} not found")]
    TransactionNotFound(TransactionId),

    /// Requested group parameters are not stored locally.
    #[error("Requested group parameters {0:#x} not found")]
    GroupParametersNotFound(Hash),

    /// The peer returned group parameters with a different hash.
    #[error("Group parameters hash mismatch: requested {requested:#x}, received {received:#x}")]
    GroupParametersMismatch { requested: Hash, received: Hash },

    /// Recorded dependencies form a cycle.
    #[error("Dependency cycle detected at transaction {0}")]
    CycleDetected(TransactionId),

    /// A transaction of the backchain failed contract verification.
    #[error(
        "Transaction {id} failed contract verification: {}",
        format_failures(.failures)
    )]
    ContractVerificationFailed {
        id: TransactionId,
        failures: Vec<ContractVerificationFailure>,
    },

    /// A transaction could not be prepared for verification.
    #[error("Cannot verify transaction {id}: {reason}")]
    VerificationUnavailable { id: TransactionId, reason: String },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl ResolutionError {
    /// Whether the error was caused by the peer breaking the protocol.
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::UnrequestedTransaction { .. }
                | Self::TransactionIdMismatch { .. }
                | Self::IncompleteBatch { .. }
                | Self::UnexpectedResponse { .. }
                | Self::UnrecognizedRequest
                | Self::UnsupportedRequest { .. }
                | Self::GroupParametersMismatch { .. }
        )
    }

    /// Transaction ids named by the error.
    #[must_use]
    pub fn transaction_ids(&self) -> Vec<TransactionId> {
        match self {
            Self::InvalidAncestors(ids) => ids.clone(),
            Self::IncompleteBatch { missing } => missing.clone(),
            Self::UnrequestedTransaction { id }
            | Self::TransactionIdMismatch { id }
            | Self::ContractVerificationFailed { id, .. }
            | Self::VerificationUnavailable { id, .. } => vec![*id],
            Self::TransactionNotFound(id) | Self::CycleDetected(id) => vec![*id],
            _ => Vec::new(),
        }
    }
}

fn format_ids(ids: &[TransactionId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_failures(failures: &[ContractVerificationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
