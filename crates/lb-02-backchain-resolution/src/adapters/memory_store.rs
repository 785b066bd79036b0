//! In-memory ledger store.
//!
//! Implements both storage ports behind `parking_lot` locks. Check-and-insert
//! happens under a single write lock, so concurrent resolutions discovering
//! the same ancestor store it once.

use crate::ports::outbound::{GroupParametersStore, TransactionStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::entities::{
    Hash, SignedGroupParameters, SignedTransaction, TransactionId, TransactionStatus,
};
use shared_types::errors::StoreError;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct StoredTransaction {
    transaction: SignedTransaction,
    status: TransactionStatus,
}

#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    transactions: RwLock<HashMap<TransactionId, StoredTransaction>>,
    group_parameters: RwLock<HashMap<Hash, SignedGroupParameters>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a transaction.
    pub fn insert(&self, transaction: SignedTransaction, status: TransactionStatus) {
        self.transactions.write().insert(
            transaction.id,
            StoredTransaction {
                transaction,
                status,
            },
        );
    }

    pub fn insert_group_parameters(&self, parameters: SignedGroupParameters) {
        self.group_parameters
            .write()
            .insert(parameters.hash(), parameters);
    }

    pub fn status(&self, id: &TransactionId) -> Option<TransactionStatus> {
        self.transactions.read().get(id).map(|stored| stored.status)
    }

    pub fn contains_group_parameters(&self, hash: &Hash) -> bool {
        self.group_parameters.read().contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.transactions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.read().is_empty()
    }
}

#[async_trait]
impl TransactionStore for InMemoryLedgerStore {
    async fn find_transaction_ids_and_statuses(
        &self,
        ids: &[TransactionId],
    ) -> Result<HashMap<TransactionId, TransactionStatus>, StoreError> {
        let transactions = self.transactions.read();
        Ok(ids
            .iter()
            .filter_map(|id| transactions.get(id).map(|stored| (*id, stored.status)))
            .collect())
    }

    async fn persist_if_does_not_exist(
        &self,
        transaction: SignedTransaction,
        default_status: TransactionStatus,
    ) -> Result<(TransactionStatus, SignedTransaction), StoreError> {
        let mut transactions = self.transactions.write();
        let stored = transactions
            .entry(transaction.id)
            .or_insert_with(|| StoredTransaction {
                transaction,
                status: default_status,
            });
        Ok((stored.status, stored.transaction.clone()))
    }

    async fn find_signed_transaction(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<Option<SignedTransaction>, StoreError> {
        self.find(id, Some(status)).await
    }

    async fn find(
        &self,
        id: TransactionId,
        status: Option<TransactionStatus>,
    ) -> Result<Option<SignedTransaction>, StoreError> {
        Ok(self
            .transactions
            .read()
            .get(&id)
            .filter(|stored| status.map_or(true, |wanted| stored.status == wanted))
            .map(|stored| stored.transaction.clone()))
    }

    async fn update_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<(), StoreError> {
        match self.transactions.write().get_mut(&id) {
            Some(stored) => {
                stored.status = status;
                Ok(())
            }
            None => Err(StoreError::TransactionNotFound(id)),
        }
    }
}

#[async_trait]
impl GroupParametersStore for InMemoryLedgerStore {
    async fn find_group_parameters(
        &self,
        hash: &Hash,
    ) -> Result<Option<SignedGroupParameters>, StoreError> {
        Ok(self.group_parameters.read().get(hash).cloned())
    }

    async fn persist_group_parameters(
        &self,
        parameters: SignedGroupParameters,
    ) -> Result<(), StoreError> {
        self.insert_group_parameters(parameters);
        Ok(())
    }
}
