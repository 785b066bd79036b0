//! # Backchain Receiver
//!
//! Walks a backchain backwards from a set of roots, fetching from the peer
//! only what is not already stored locally, and records every dependency
//! edge it discovers.
//!
//! ## Run state
//!
//! | State | Purpose |
//! |-------|---------|
//! | `frontier` | ids still to reconcile or fetch |
//! | `sort` | dependency edges of every unverified transaction seen |
//! | `known` | local lookups already made this run (`None` = not stored) |
//! | `fetched_group_parameters` | group parameters retrieved this run |
//!
//! ## Loop
//!
//! 1. Reconcile the frontier against the local store. Invalid ancestors
//!    abort before any request is sent; verified ones are dropped; locally
//!    stored unverified ones have their edges recorded and their
//!    dependencies reconciled in turn.
//! 2. Request the first `batch_size` frontier ids with `Get`.
//! 3. Check, persist and record every received transaction.
//! 4. Repeat until the frontier is empty, then send `Stop`.

use crate::algorithms::topological_sort::TopologicalSort;
use crate::config::ResolutionConfig;
use crate::domain::errors::ResolutionError;
use crate::domain::frontier::Frontier;
use crate::ports::outbound::{GroupParametersStore, RequesterSession, TransactionStore};
use crate::protocol::messages::{BackchainRequest, BackchainResponse};
use backchain_telemetry::{log_tx_event, BackchainMetrics};
use shared_types::entities::{Hash, SignedTransaction, TransactionId, TransactionStatus};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct BackchainReceiver<S, G> {
    store: Arc<S>,
    group_parameters: Arc<G>,
    config: ResolutionConfig,
    metrics: Option<Arc<BackchainMetrics>>,
}

/// Mutable state of one resolution run.
#[derive(Default)]
struct ReceiverRun {
    frontier: Frontier,
    sort: TopologicalSort,
    known: HashMap<TransactionId, Option<TransactionStatus>>,
    fetched_group_parameters: HashSet<Hash>,
}

impl ReceiverRun {
    /// Queue a dependency unless it is already recorded or known verified.
    fn enqueue(&mut self, id: TransactionId) {
        if self.sort.contains(&id) {
            return;
        }
        if let Some(Some(TransactionStatus::Verified)) = self.known.get(&id) {
            return;
        }
        self.frontier.insert(id);
    }

    /// Ids not looked up locally yet, deduplicated, in order.
    fn unchecked(&self, ids: impl IntoIterator<Item = TransactionId>) -> Vec<TransactionId> {
        let mut seen = HashSet::new();
        ids.into_iter()
            .filter(|id| !self.known.contains_key(id) && seen.insert(*id))
            .collect()
    }
}

impl<S, G> BackchainReceiver<S, G>
where
    S: TransactionStore,
    G: GroupParametersStore,
{
    pub fn new(store: Arc<S>, group_parameters: Arc<G>, config: ResolutionConfig) -> Self {
        Self {
            store,
            group_parameters,
            config,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<BackchainMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Resolve the backchains of `roots` and return the recorded edges.
    ///
    /// `roots` should exclude transactions already verified locally.
    pub async fn receive<R>(
        &self,
        roots: &[TransactionId],
        session: &mut R,
    ) -> Result<TopologicalSort, ResolutionError>
    where
        R: RequesterSession + ?Sized,
    {
        let mut run = ReceiverRun {
            frontier: roots.iter().copied().collect(),
            ..Default::default()
        };
        let batch_size = self.config.effective_batch_size();

        info!(
            counterparty = session.counterparty(),
            roots = roots.len(),
            batch_size,
            "[lb-02] Resolving backchain"
        );

        loop {
            self.reconcile(&mut run).await?;

            let batch = run.frontier.peek_batch(batch_size);
            if batch.is_empty() {
                break;
            }

            debug!(
                counterparty = session.counterparty(),
                batch_size = batch.len(),
                remaining = run.frontier.len(),
                "[lb-02] Requesting backchain batch"
            );
            session
                .send(BackchainRequest::Get { ids: batch.clone() })
                .await?;
            if let Some(metrics) = &self.metrics {
                metrics.get_requests_sent.inc();
            }

            let received = Self::collect_batch(session).await?;
            self.process_batch(&mut run, &batch, received, session)
                .await?;
        }

        session.send(BackchainRequest::Stop).await?;

        info!(
            counterparty = session.counterparty(),
            recorded = run.sort.size(),
            "[lb-02] Backchain retrieved"
        );
        Ok(run.sort)
    }

    /// Local reconciliation of every frontier id not looked up yet, repeated
    /// over newly discovered dependencies until nothing new is stored
    /// locally.
    async fn reconcile(&self, run: &mut ReceiverRun) -> Result<(), ResolutionError> {
        let mut to_check = run.unchecked(run.frontier.iter().copied());

        while !to_check.is_empty() {
            let statuses = self
                .store
                .find_transaction_ids_and_statuses(&to_check)
                .await?;

            let mut invalid: Vec<TransactionId> = statuses
                .iter()
                .filter(|(_, status)| **status == TransactionStatus::Invalid)
                .map(|(id, _)| *id)
                .collect();
            if !invalid.is_empty() {
                invalid.sort();
                warn!(invalid = ?invalid, "[lb-02] Backchain contains invalid transactions");
                return Err(ResolutionError::InvalidAncestors(invalid));
            }

            let mut next = Vec::new();
            for id in to_check {
                let status = statuses.get(&id).copied();
                run.known.insert(id, status);
                match status {
                    Some(TransactionStatus::Verified) => {
                        run.frontier.remove(&id);
                    }
                    Some(TransactionStatus::Unverified) => {
                        self.reconcile_unverified(run, id, &mut next).await?;
                    }
                    Some(TransactionStatus::Invalid) | None => {}
                }
            }

            to_check = run.unchecked(next);
        }

        Ok(())
    }

    /// Record a locally stored, unverified transaction without fetching it.
    async fn reconcile_unverified(
        &self,
        run: &mut ReceiverRun,
        id: TransactionId,
        next: &mut Vec<TransactionId>,
    ) -> Result<(), ResolutionError> {
        if run.sort.contains(&id) {
            run.frontier.remove(&id);
            return Ok(());
        }
        let Some(transaction) = self
            .store
            .find_signed_transaction(id, TransactionStatus::Unverified)
            .await?
        else {
            // Status changed since the lookup; fetch from the peer instead.
            run.known.remove(&id);
            return Ok(());
        };

        let dependencies = transaction.dependencies();
        for dependency in &dependencies {
            if !run.sort.contains(dependency) && !run.known.contains_key(dependency) {
                next.push(*dependency);
            }
            run.enqueue(*dependency);
        }
        run.sort.add(id, dependencies);

        if self.retain_for_group_parameters(&transaction).await? {
            debug!(
                tx_id = %id,
                "[lb-02] Keeping locally stored transaction to fetch its group parameters"
            );
        } else {
            run.frontier.remove(&id);
        }
        Ok(())
    }

    /// Under V2 a locally stored transaction whose group parameters are not
    /// available stays in the frontier, so the peer also sends them.
    async fn retain_for_group_parameters(
        &self,
        transaction: &SignedTransaction,
    ) -> Result<bool, ResolutionError> {
        if !self.config.protocol_version.supports_group_parameters() {
            return Ok(false);
        }
        match transaction.metadata.group_parameters_hash {
            Some(hash) => Ok(self
                .group_parameters
                .find_group_parameters(&hash)
                .await?
                .is_none()),
            None => Ok(false),
        }
    }

    /// Every transaction of the current batch, up to `EndOfBatch`.
    async fn collect_batch<R>(session: &mut R) -> Result<Vec<SignedTransaction>, ResolutionError>
    where
        R: RequesterSession + ?Sized,
    {
        let mut received = Vec::new();
        loop {
            match session.receive().await? {
                BackchainResponse::Transaction { transaction } => received.push(transaction),
                BackchainResponse::EndOfBatch => return Ok(received),
                other => {
                    return Err(ResolutionError::UnexpectedResponse {
                        expected: "Transaction or EndOfBatch",
                        received: other.kind().to_string(),
                    })
                }
            }
        }
    }

    async fn process_batch<R>(
        &self,
        run: &mut ReceiverRun,
        batch: &[TransactionId],
        received: Vec<SignedTransaction>,
        session: &mut R,
    ) -> Result<(), ResolutionError>
    where
        R: RequesterSession + ?Sized,
    {
        let requested: BTreeSet<TransactionId> = batch.iter().copied().collect();

        // Protocol integrity first: nothing is persisted from a bad batch.
        for transaction in &received {
            if !requested.contains(&transaction.id) {
                warn!(
                    tx_id = %transaction.id,
                    counterparty = session.counterparty(),
                    "[lb-02] Peer sent unrequested transaction"
                );
                return Err(ResolutionError::UnrequestedTransaction { id: transaction.id });
            }
            if !transaction.id_matches_content() {
                return Err(ResolutionError::TransactionIdMismatch { id: transaction.id });
            }
        }

        for transaction in received {
            let id = transaction.id;
            let (status, transaction) = self
                .store
                .persist_if_does_not_exist(transaction, TransactionStatus::Unverified)
                .await?;
            run.frontier.remove(&id);
            run.known.insert(id, Some(status));
            if let Some(metrics) = &self.metrics {
                metrics.transactions_retrieved.inc();
            }

            match status {
                TransactionStatus::Invalid => {
                    return Err(ResolutionError::InvalidAncestors(vec![id]));
                }
                TransactionStatus::Verified => {
                    log_tx_event!(
                        debug,
                        "lb-02",
                        "[lb-02] Received transaction already verified",
                        id
                    );
                }
                TransactionStatus::Unverified => {
                    if !run.sort.contains(&id) {
                        let dependencies = transaction.dependencies();
                        for dependency in &dependencies {
                            run.enqueue(*dependency);
                        }
                        run.sort.add(id, dependencies);
                    }
                }
            }

            if self.config.protocol_version.supports_group_parameters() {
                self.fetch_group_parameters(run, &transaction, session)
                    .await?;
            }
        }

        let missing: Vec<TransactionId> = batch
            .iter()
            .filter(|id| run.frontier.contains(id))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(ResolutionError::IncompleteBatch { missing });
        }
        Ok(())
    }

    async fn fetch_group_parameters<R>(
        &self,
        run: &mut ReceiverRun,
        transaction: &SignedTransaction,
        session: &mut R,
    ) -> Result<(), ResolutionError>
    where
        R: RequesterSession + ?Sized,
    {
        let Some(hash) = transaction.metadata.group_parameters_hash else {
            return Ok(());
        };
        if run.fetched_group_parameters.contains(&hash)
            || self
                .group_parameters
                .find_group_parameters(&hash)
                .await?
                .is_some()
        {
            return Ok(());
        }

        session
            .send(BackchainRequest::GetSignedGroupParameters { hash })
            .await?;
        let parameters = match session.receive().await? {
            BackchainResponse::GroupParameters { parameters } => parameters,
            other => {
                return Err(ResolutionError::UnexpectedResponse {
                    expected: "GroupParameters",
                    received: other.kind().to_string(),
                })
            }
        };

        let received = parameters.hash();
        if received != hash {
            return Err(ResolutionError::GroupParametersMismatch {
                requested: hash,
                received,
            });
        }
        self.group_parameters
            .persist_group_parameters(parameters)
            .await?;
        run.fetched_group_parameters.insert(hash);
        debug!(hash = ?hash, "[lb-02] Group parameters retrieved");
        Ok(())
    }
}
