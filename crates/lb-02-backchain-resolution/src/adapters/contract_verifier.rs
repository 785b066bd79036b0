//! Contract verification adapter.
//!
//! Materializes a stored transaction (resolving its input and reference
//! states from their originating transactions), runs the contract verifier
//! and persists the resulting status.

use crate::domain::errors::ResolutionError;
use crate::ports::outbound::{TransactionStore, TransactionVerifier};
use async_trait::async_trait;
use backchain_telemetry::log_tx_event;
use lb_01_contract_verification::ContractVerificationApi;
use shared_types::entities::{
    LedgerTransaction, SignedTransaction, StateAndRef, StateRef, TransactionId, TransactionStatus,
};
use std::collections::HashMap;
use std::sync::Arc;

pub struct ContractTransactionVerifier<S, V> {
    store: Arc<S>,
    verifier: Arc<V>,
}

impl<S, V> ContractTransactionVerifier<S, V>
where
    S: TransactionStore,
    V: ContractVerificationApi,
{
    pub fn new(store: Arc<S>, verifier: Arc<V>) -> Self {
        Self { store, verifier }
    }

    /// Build the ledger form of `transaction` from locally stored ancestors.
    pub async fn materialize(
        &self,
        transaction: SignedTransaction,
    ) -> Result<LedgerTransaction, ResolutionError> {
        let mut origins: HashMap<TransactionId, SignedTransaction> = HashMap::new();
        let inputs = self
            .resolve_states(transaction.id, &transaction.inputs, &mut origins)
            .await?;
        let references = self
            .resolve_states(transaction.id, &transaction.references, &mut origins)
            .await?;

        Ok(LedgerTransaction {
            id: transaction.id,
            inputs,
            outputs: transaction.outputs,
            references,
            metadata: transaction.metadata,
        })
    }

    async fn resolve_states(
        &self,
        id: TransactionId,
        state_refs: &[StateRef],
        origins: &mut HashMap<TransactionId, SignedTransaction>,
    ) -> Result<Vec<StateAndRef>, ResolutionError> {
        let mut resolved = Vec::with_capacity(state_refs.len());
        for state_ref in state_refs {
            let origin_id = state_ref.transaction_id;
            if !origins.contains_key(&origin_id) {
                let origin = self.store.find(origin_id, None).await?.ok_or_else(|| {
                    ResolutionError::VerificationUnavailable {
                        id,
                        reason: format!("originating transaction {origin_id} is not stored"),
                    }
                })?;
                origins.insert(origin_id, origin);
            }
            let state = origins
                .get(&origin_id)
                .and_then(|origin| origin.output(state_ref.index))
                .ok_or_else(|| ResolutionError::VerificationUnavailable {
                    id,
                    reason: format!("state {state_ref} does not exist"),
                })?;
            resolved.push(StateAndRef::new(state.clone(), *state_ref));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl<S, V> TransactionVerifier for ContractTransactionVerifier<S, V>
where
    S: TransactionStore,
    V: ContractVerificationApi,
{
    async fn verify_transaction(&self, id: TransactionId) -> Result<(), ResolutionError> {
        let transaction = self
            .store
            .find(id, None)
            .await?
            .ok_or(ResolutionError::TransactionNotFound(id))?;
        let ledger_transaction = self.materialize(transaction).await?;

        let result = self.verifier.verify(&ledger_transaction);
        if result.is_verified() {
            self.store
                .update_status(id, TransactionStatus::Verified)
                .await?;
            log_tx_event!(debug, "lb-02", "[lb-02] Backchain transaction verified", id);
            Ok(())
        } else {
            self.store
                .update_status(id, TransactionStatus::Invalid)
                .await?;
            log_tx_event!(
                warn,
                "lb-02",
                "[lb-02] Backchain transaction is invalid",
                id,
                failures = result.failures().len()
            );
            Err(ResolutionError::ContractVerificationFailed {
                id,
                failures: result.into_failures(),
            })
        }
    }
}
