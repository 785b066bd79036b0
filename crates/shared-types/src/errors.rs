//! # Error Types
//!
//! Defines error types shared by the storage-facing ports of every subsystem.

use crate::entities::{Hash, TransactionId};
use thiserror::Error;

/// Errors raised by transaction and group-parameter stores.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Transaction not found in storage.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Group parameters not found in storage.
    #[error("Group parameters not found: {0:#x}")]
    GroupParametersNotFound(Hash),

    /// A stored state reference points past the outputs of its transaction.
    #[error("State {index} does not exist in transaction {transaction_id}")]
    StateNotFound {
        transaction_id: TransactionId,
        index: u32,
    },

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),
}
