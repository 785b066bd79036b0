//! Test utilities for backchain resolution.
//!
//! In-process peers and sessions with scripted behaviour, a recording
//! verifier and transaction fixtures. Enable with the `test-utils` feature.

use crate::adapters::memory_store::InMemoryLedgerStore;
use crate::domain::errors::{ResolutionError, SessionError};
use crate::ports::outbound::{
    RequesterSession, ResponderSession, TransactionStore, TransactionVerifier,
};
use crate::protocol::messages::{BackchainRequest, BackchainResponse};
use async_trait::async_trait;
use lb_01_contract_verification::ContractVerificationFailure;
use parking_lot::Mutex;
use shared_types::entities::{
    ContractState, Hash, SignedGroupParameters, SignedTransaction, StateRef, TransactionId,
    TransactionMetadata, TransactionState, TransactionStatus,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

pub const TOKEN_CONTRACT: &str = "com.example.TokenContract";
pub const TOKEN_STATE: &str = "com.example.TokenState";

/// A token output governed by [`TOKEN_CONTRACT`].
pub fn token(amount: u64) -> TransactionState {
    TransactionState::new(
        ContractState::new(TOKEN_STATE).with_properties(serde_json::json!({ "amount": amount })),
        TOKEN_CONTRACT,
    )
}

/// A transaction creating one token out of nothing.
pub fn issue(amount: u64) -> SignedTransaction {
    SignedTransaction::new(vec![], vec![], vec![token(amount)], TransactionMetadata::default())
}

/// A transaction consuming `inputs` and creating one token per amount.
pub fn spend(inputs: &[StateRef], amounts: &[u64]) -> SignedTransaction {
    SignedTransaction::new(
        inputs.to_vec(),
        vec![],
        amounts.iter().copied().map(token).collect(),
        TransactionMetadata::default(),
    )
}

/// `n` transactions where each spends output 0 of the previous one.
/// The first is an issuance; the last is the tip.
pub fn chain(n: usize) -> Vec<SignedTransaction> {
    let mut transactions: Vec<SignedTransaction> = Vec::with_capacity(n);
    for index in 0..n {
        let transaction = match transactions.last() {
            None => issue(100 + index as u64),
            Some(previous) => spend(&[StateRef::new(previous.id, 0)], &[100]),
        };
        transactions.push(transaction);
    }
    transactions
}

/// Responder-side session replaying a fixed list of requests.
pub struct ScriptedResponderSession {
    script: VecDeque<BackchainRequest>,
    sent: Vec<BackchainResponse>,
}

impl ScriptedResponderSession {
    pub fn new(script: Vec<BackchainRequest>) -> Self {
        Self {
            script: script.into(),
            sent: Vec::new(),
        }
    }

    pub fn sent(&self) -> &[BackchainResponse] {
        &self.sent
    }
}

#[async_trait]
impl ResponderSession for ScriptedResponderSession {
    async fn receive(&mut self) -> Result<BackchainRequest, SessionError> {
        self.script.pop_front().ok_or_else(|| SessionError::Closed {
            counterparty: "scripted-requester".to_string(),
        })
    }

    async fn send(&mut self, response: BackchainResponse) -> Result<(), SessionError> {
        self.sent.push(response);
        Ok(())
    }

    fn counterparty(&self) -> &str {
        "scripted-requester"
    }
}

/// Requester-side session answered in-process by a simulated peer that owns
/// a set of transactions. Every request is recorded.
pub struct PeerSession {
    name: String,
    transactions: HashMap<TransactionId, SignedTransaction>,
    group_parameters: HashMap<Hash, SignedGroupParameters>,
    unrequested: Vec<SignedTransaction>,
    group_parameters_override: Option<SignedGroupParameters>,
    pending: VecDeque<BackchainResponse>,
    requests: Vec<BackchainRequest>,
}

impl PeerSession {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transactions: HashMap::new(),
            group_parameters: HashMap::new(),
            unrequested: Vec::new(),
            group_parameters_override: None,
            pending: VecDeque::new(),
            requests: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_transactions(
        mut self,
        transactions: impl IntoIterator<Item = SignedTransaction>,
    ) -> Self {
        for transaction in transactions {
            self.transactions.insert(transaction.id, transaction);
        }
        self
    }

    #[must_use]
    pub fn with_group_parameters(mut self, parameters: SignedGroupParameters) -> Self {
        self.group_parameters.insert(parameters.hash(), parameters);
        self
    }

    /// Append `transaction` to the next `Get` response even though it was
    /// not requested.
    #[must_use]
    pub fn with_unrequested(mut self, transaction: SignedTransaction) -> Self {
        self.unrequested.push(transaction);
        self
    }

    /// Answer every group parameters request with `parameters`.
    #[must_use]
    pub fn answering_group_parameters_with(mut self, parameters: SignedGroupParameters) -> Self {
        self.group_parameters_override = Some(parameters);
        self
    }

    pub fn requests(&self) -> &[BackchainRequest] {
        &self.requests
    }

    /// Id lists of every `Get` sent, in order.
    pub fn get_requests(&self) -> Vec<Vec<TransactionId>> {
        self.requests
            .iter()
            .filter_map(|request| match request {
                BackchainRequest::Get { ids } => Some(ids.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn group_parameter_requests(&self) -> usize {
        self.requests
            .iter()
            .filter(|request| matches!(request, BackchainRequest::GetSignedGroupParameters { .. }))
            .count()
    }

    pub fn stopped(&self) -> bool {
        self.requests.last() == Some(&BackchainRequest::Stop)
    }
}

#[async_trait]
impl RequesterSession for PeerSession {
    async fn send(&mut self, request: BackchainRequest) -> Result<(), SessionError> {
        match &request {
            BackchainRequest::Get { ids } => {
                for id in ids {
                    if let Some(transaction) = self.transactions.get(id) {
                        self.pending.push_back(BackchainResponse::Transaction {
                            transaction: transaction.clone(),
                        });
                    }
                }
                for transaction in self.unrequested.drain(..) {
                    self.pending
                        .push_back(BackchainResponse::Transaction { transaction });
                }
                self.pending.push_back(BackchainResponse::EndOfBatch);
            }
            BackchainRequest::GetSignedGroupParameters { hash } => {
                let parameters = self
                    .group_parameters_override
                    .clone()
                    .or_else(|| self.group_parameters.get(hash).cloned());
                if let Some(parameters) = parameters {
                    self.pending
                        .push_back(BackchainResponse::GroupParameters { parameters });
                }
            }
            BackchainRequest::Stop | BackchainRequest::Unrecognized => {}
        }
        self.requests.push(request);
        Ok(())
    }

    async fn receive(&mut self) -> Result<BackchainResponse, SessionError> {
        self.pending.pop_front().ok_or_else(|| SessionError::Closed {
            counterparty: self.name.clone(),
        })
    }

    fn counterparty(&self) -> &str {
        &self.name
    }
}

/// Verifier that marks transactions verified in a store and records the
/// order it was called in. Ids in the reject set fail verification.
pub struct RecordingVerifier {
    store: Arc<InMemoryLedgerStore>,
    rejected: HashSet<TransactionId>,
    verified: Mutex<Vec<TransactionId>>,
}

impl RecordingVerifier {
    pub fn new(store: Arc<InMemoryLedgerStore>) -> Self {
        Self {
            store,
            rejected: HashSet::new(),
            verified: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn rejecting(mut self, id: TransactionId) -> Self {
        self.rejected.insert(id);
        self
    }

    pub fn verified(&self) -> Vec<TransactionId> {
        self.verified.lock().clone()
    }
}

#[async_trait]
impl TransactionVerifier for RecordingVerifier {
    async fn verify_transaction(&self, id: TransactionId) -> Result<(), ResolutionError> {
        if self.rejected.contains(&id) {
            self.store
                .update_status(id, TransactionStatus::Invalid)
                .await?;
            return Err(ResolutionError::ContractVerificationFailed {
                id,
                failures: vec![ContractVerificationFailure {
                    contract_class_name: TOKEN_CONTRACT.to_string(),
                    contract_state_class_names: vec![TOKEN_STATE.to_string()],
                    exception_class_name: "RequirementFailed".to_string(),
                    exception_message: "rejected by test".to_string(),
                }],
            });
        }
        self.store
            .update_status(id, TransactionStatus::Verified)
            .await?;
        self.verified.lock().push(id);
        Ok(())
    }
}
