//! # Backchain Responder
//!
//! Serves a resolving peer from the local store until it sends `Stop`.
//!
//! | Request | Response |
//! |---------|----------|
//! | `Get(ids)` | one `Transaction` per id, then `EndOfBatch` |
//! | `GetSignedGroupParameters(hash)` | `GroupParameters` (V2 only) |
//! | `Stop` | none; the loop ends |
//!
//! Anything else, or a requested object missing locally, aborts the loop.

use crate::config::ProtocolVersion;
use crate::domain::entities::ResponderSummary;
use crate::domain::errors::ResolutionError;
use crate::ports::outbound::{GroupParametersStore, ResponderSession, TransactionStore};
use crate::protocol::messages::{BackchainRequest, BackchainResponse};
use shared_types::entities::{Hash, TransactionId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct BackchainResponder<S, G> {
    store: Arc<S>,
    group_parameters: Arc<G>,
    protocol_version: ProtocolVersion,
}

impl<S, G> BackchainResponder<S, G>
where
    S: TransactionStore,
    G: GroupParametersStore,
{
    pub fn new(store: Arc<S>, group_parameters: Arc<G>, protocol_version: ProtocolVersion) -> Self {
        Self {
            store,
            group_parameters,
            protocol_version,
        }
    }

    /// Serve requests until `Stop` or a fatal error.
    pub async fn run<R>(&self, session: &mut R) -> Result<ResponderSummary, ResolutionError>
    where
        R: ResponderSession + ?Sized,
    {
        let mut summary = ResponderSummary::default();

        loop {
            match session.receive().await? {
                BackchainRequest::Get { ids } => {
                    summary.get_requests += 1;
                    summary.transactions_sent += self.send_transactions(session, &ids).await?;
                }
                BackchainRequest::GetSignedGroupParameters { hash } => {
                    if !self.protocol_version.supports_group_parameters() {
                        warn!(
                            counterparty = session.counterparty(),
                            "[lb-02] Group parameters requested over protocol V1"
                        );
                        return Err(ResolutionError::UnsupportedRequest {
                            request: "GetSignedGroupParameters",
                            version: self.protocol_version,
                        });
                    }
                    self.send_group_parameters(session, hash).await?;
                    summary.group_parameters_sent += 1;
                }
                BackchainRequest::Stop => {
                    debug!(
                        counterparty = session.counterparty(),
                        transactions_sent = summary.transactions_sent,
                        "[lb-02] Peer finished backchain resolution"
                    );
                    return Ok(summary);
                }
                BackchainRequest::Unrecognized => {
                    warn!(
                        counterparty = session.counterparty(),
                        "[lb-02] Unrecognized backchain request"
                    );
                    return Err(ResolutionError::UnrecognizedRequest);
                }
            }
        }
    }

    async fn send_transactions<R>(
        &self,
        session: &mut R,
        ids: &[TransactionId],
    ) -> Result<usize, ResolutionError>
    where
        R: ResponderSession + ?Sized,
    {
        // Every id must be available before anything is sent. Repeated ids
        // are served once, in first-requested order.
        let mut seen = HashSet::with_capacity(ids.len());
        let mut transactions = Vec::with_capacity(ids.len());
        for id in ids.iter().filter(|id| seen.insert(**id)) {
            let transaction = self
                .store
                .find(*id, None)
                .await?
                .ok_or(ResolutionError::TransactionNotFound(*id))?;
            transactions.push(transaction);
        }

        debug!(
            counterparty = session.counterparty(),
            batch_size = transactions.len(),
            "[lb-02] Sending requested transactions"
        );

        let sent = transactions.len();
        for transaction in transactions {
            session
                .send(BackchainResponse::Transaction { transaction })
                .await?;
        }
        session.send(BackchainResponse::EndOfBatch).await?;
        Ok(sent)
    }

    async fn send_group_parameters<R>(
        &self,
        session: &mut R,
        hash: Hash,
    ) -> Result<(), ResolutionError>
    where
        R: ResponderSession + ?Sized,
    {
        let parameters = self
            .group_parameters
            .find_group_parameters(&hash)
            .await?
            .ok_or(ResolutionError::GroupParametersNotFound(hash))?;
        session
            .send(BackchainResponse::GroupParameters { parameters })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryLedgerStore;
    use crate::test_utils::{chain, ScriptedResponderSession};
    use shared_types::entities::{GroupParameters, SignedGroupParameters, TransactionStatus};

    fn responder(
        store: Arc<InMemoryLedgerStore>,
        version: ProtocolVersion,
    ) -> BackchainResponder<InMemoryLedgerStore, InMemoryLedgerStore> {
        BackchainResponder::new(store.clone(), store, version)
    }

    #[tokio::test]
    async fn test_get_sends_one_message_per_transaction() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let txs = chain(3);
        for tx in &txs {
            store.insert(tx.clone(), TransactionStatus::Verified);
        }
        let mut session = ScriptedResponderSession::new(vec![
            BackchainRequest::Get {
                ids: vec![txs[0].id, txs[2].id],
            },
            BackchainRequest::Stop,
        ]);

        let summary = responder(store, ProtocolVersion::V1)
            .run(&mut session)
            .await
            .unwrap();

        assert_eq!(summary.get_requests, 1);
        assert_eq!(summary.transactions_sent, 2);
        let kinds: Vec<&str> = session.sent().iter().map(BackchainResponse::kind).collect();
        assert_eq!(kinds, vec!["Transaction", "Transaction", "EndOfBatch"]);
    }

    #[tokio::test]
    async fn test_repeated_ids_are_served_once() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let txs = chain(2);
        for tx in &txs {
            store.insert(tx.clone(), TransactionStatus::Verified);
        }
        let mut session = ScriptedResponderSession::new(vec![
            BackchainRequest::Get {
                ids: vec![txs[1].id, txs[0].id, txs[1].id, txs[0].id],
            },
            BackchainRequest::Stop,
        ]);

        let summary = responder(store, ProtocolVersion::V2)
            .run(&mut session)
            .await
            .unwrap();

        assert_eq!(summary.transactions_sent, 2);
        let sent_ids: Vec<TransactionId> = session
            .sent()
            .iter()
            .filter_map(|response| match response {
                BackchainResponse::Transaction { transaction } => Some(transaction.id),
                _ => None,
            })
            .collect();
        assert_eq!(sent_ids, vec![txs[1].id, txs[0].id]);
        assert_eq!(session.sent().last(), Some(&BackchainResponse::EndOfBatch));
    }

    #[tokio::test]
    async fn test_missing_transaction_is_fatal_before_sending() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let txs = chain(2);
        store.insert(txs[0].clone(), TransactionStatus::Verified);
        let mut session = ScriptedResponderSession::new(vec![BackchainRequest::Get {
            ids: vec![txs[0].id, txs[1].id],
        }]);

        let err = responder(store, ProtocolVersion::V2)
            .run(&mut session)
            .await
            .unwrap_err();

        assert!(matches!(err, ResolutionError::TransactionNotFound(id) if id == txs[1].id));
        assert!(session.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_request_is_protocol_violation() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let mut session = ScriptedResponderSession::new(vec![BackchainRequest::Unrecognized]);

        let err = responder(store, ProtocolVersion::V2)
            .run(&mut session)
            .await
            .unwrap_err();

        assert!(matches!(err, ResolutionError::UnrecognizedRequest));
        assert!(err.is_protocol_violation());
    }

    #[tokio::test]
    async fn test_group_parameters_served_on_v2_only() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let parameters = SignedGroupParameters::new(
            GroupParameters {
                epoch: 4,
                ..Default::default()
            },
            vec![9],
        );
        let hash = parameters.hash();
        store.insert_group_parameters(parameters.clone());

        let script = || {
            vec![
                BackchainRequest::GetSignedGroupParameters { hash },
                BackchainRequest::Stop,
            ]
        };

        let mut v2 = ScriptedResponderSession::new(script());
        let summary = responder(store.clone(), ProtocolVersion::V2)
            .run(&mut v2)
            .await
            .unwrap();
        assert_eq!(summary.group_parameters_sent, 1);
        assert_eq!(
            v2.sent(),
            &[BackchainResponse::GroupParameters { parameters }]
        );

        let mut v1 = ScriptedResponderSession::new(script());
        let err = responder(store, ProtocolVersion::V1)
            .run(&mut v1)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::UnsupportedRequest { .. }));
    }
}
