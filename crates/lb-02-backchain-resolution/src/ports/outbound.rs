//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the host application provides: storage, peer sessions and
//! per-transaction verification.

use crate::domain::errors::{ResolutionError, SessionError};
use crate::protocol::messages::{BackchainRequest, BackchainResponse};
use async_trait::async_trait;
use shared_types::entities::{
    Hash, SignedGroupParameters, SignedTransaction, TransactionId, TransactionStatus,
};
use shared_types::errors::StoreError;
use std::collections::HashMap;

/// Local transaction storage.
///
/// `persist_if_does_not_exist` must be an atomic check-and-insert: two
/// resolutions discovering the same ancestor concurrently store it once.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Statuses of the given ids; ids not stored locally are absent.
    async fn find_transaction_ids_and_statuses(
        &self,
        ids: &[TransactionId],
    ) -> Result<HashMap<TransactionId, TransactionStatus>, StoreError>;

    /// Store `transaction` with `default_status` unless already present.
    ///
    /// Returns the stored status and transaction (pre-existing ones if the id
    /// was already known).
    async fn persist_if_does_not_exist(
        &self,
        transaction: SignedTransaction,
        default_status: TransactionStatus,
    ) -> Result<(TransactionStatus, SignedTransaction), StoreError>;

    /// The transaction with `id`, only if it currently has `status`.
    async fn find_signed_transaction(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<Option<SignedTransaction>, StoreError>;

    /// The transaction with `id`, optionally restricted to `status`.
    async fn find(
        &self,
        id: TransactionId,
        status: Option<TransactionStatus>,
    ) -> Result<Option<SignedTransaction>, StoreError>;

    /// Record the verification outcome of a stored transaction.
    async fn update_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<(), StoreError>;
}

/// Local storage of signed group parameters, keyed by hash.
#[async_trait]
pub trait GroupParametersStore: Send + Sync {
    async fn find_group_parameters(
        &self,
        hash: &Hash,
    ) -> Result<Option<SignedGroupParameters>, StoreError>;

    async fn persist_group_parameters(
        &self,
        parameters: SignedGroupParameters,
    ) -> Result<(), StoreError>;
}

/// The resolving side of a peer session.
#[async_trait]
pub trait RequesterSession: Send {
    async fn send(&mut self, request: BackchainRequest) -> Result<(), SessionError>;

    async fn receive(&mut self) -> Result<BackchainResponse, SessionError>;

    /// Name of the peer, for logs.
    fn counterparty(&self) -> &str;
}

/// The serving side of a peer session.
#[async_trait]
pub trait ResponderSession: Send {
    async fn receive(&mut self) -> Result<BackchainRequest, SessionError>;

    async fn send(&mut self, response: BackchainResponse) -> Result<(), SessionError>;

    fn counterparty(&self) -> &str;
}

/// Verifies one stored transaction whose dependencies are already verified,
/// and persists the outcome.
#[async_trait]
pub trait TransactionVerifier: Send + Sync {
    async fn verify_transaction(&self, id: TransactionId) -> Result<(), ResolutionError>;
}
