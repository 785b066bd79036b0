//! # Backchain Resolution Service
//!
//! Entry point for resolving the backchains of a set of root transactions:
//!
//! 1. Roots already verified locally need nothing.
//! 2. If every root is verified, the peer is told to `Stop` immediately.
//! 3. Otherwise the receiver retrieves the backchain from the peer.
//! 4. Every retrieved transaction is verified in dependency order; the first
//!    failure aborts the resolution.

use crate::algorithms::topological_sort::TopologicalSort;
use crate::application::receiver::BackchainReceiver;
use crate::config::ResolutionConfig;
use crate::domain::entities::ResolutionOutcome;
use crate::domain::errors::ResolutionError;
use crate::ports::inbound::BackchainResolutionApi;
use crate::ports::outbound::{
    GroupParametersStore, RequesterSession, TransactionStore, TransactionVerifier,
};
use crate::protocol::messages::BackchainRequest;
use crate::protocol::responder::BackchainResponder;
use async_trait::async_trait;
use backchain_telemetry::{time_histogram, BackchainMetrics};
use shared_bus::{EventPublisher, LedgerEvent};
use shared_types::entities::{TransactionId, TransactionStatus};
use std::sync::Arc;
use tracing::{error, info};

pub struct BackchainResolutionService<S, G, V> {
    store: Arc<S>,
    group_parameters: Arc<G>,
    verifier: Arc<V>,
    config: ResolutionConfig,
    publisher: Option<Arc<dyn EventPublisher>>,
    metrics: Option<Arc<BackchainMetrics>>,
}

impl<S, G, V> BackchainResolutionService<S, G, V>
where
    S: TransactionStore + 'static,
    G: GroupParametersStore + 'static,
    V: TransactionVerifier + 'static,
{
    pub fn new(
        store: Arc<S>,
        group_parameters: Arc<G>,
        verifier: Arc<V>,
        config: ResolutionConfig,
    ) -> Self {
        Self {
            store,
            group_parameters,
            verifier,
            config,
            publisher: None,
            metrics: None,
        }
    }

    /// Publish resolution outcomes on the event bus.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<BackchainMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    /// Receiver sharing this service's stores and configuration.
    pub fn receiver(&self) -> BackchainReceiver<S, G> {
        let receiver = BackchainReceiver::new(
            self.store.clone(),
            self.group_parameters.clone(),
            self.config.clone(),
        );
        match &self.metrics {
            Some(metrics) => receiver.with_metrics(metrics.clone()),
            None => receiver,
        }
    }

    /// Responder serving peers from this service's stores.
    pub fn responder(&self) -> BackchainResponder<S, G> {
        BackchainResponder::new(
            self.store.clone(),
            self.group_parameters.clone(),
            self.config.protocol_version,
        )
    }

    async fn resolve_roots(
        &self,
        roots: &[TransactionId],
        session: &mut dyn RequesterSession,
    ) -> Result<ResolutionOutcome, ResolutionError> {
        let statuses = self.store.find_transaction_ids_and_statuses(roots).await?;
        let (already_verified, to_resolve): (Vec<TransactionId>, Vec<TransactionId>) = roots
            .iter()
            .copied()
            .partition(|id| statuses.get(id) == Some(&TransactionStatus::Verified));

        if to_resolve.is_empty() {
            info!(
                counterparty = session.counterparty(),
                roots = roots.len(),
                "[lb-02] All roots already verified, no resolution required"
            );
            session.send(BackchainRequest::Stop).await?;
            return Ok(ResolutionOutcome::skipped(already_verified));
        }

        let sort = self.receiver().receive(&to_resolve, &mut *session).await?;
        let verified_in_order = self.verify_in_order(&sort).await?;

        Ok(ResolutionOutcome {
            verified_in_order,
            already_verified,
            resolution_required: true,
        })
    }

    async fn verify_in_order(
        &self,
        sort: &TopologicalSort,
    ) -> Result<Vec<TransactionId>, ResolutionError> {
        let order = sort.complete()?;
        for id in &order {
            self.verifier.verify_transaction(*id).await?;
        }
        Ok(order)
    }

    async fn publish(&self, event: LedgerEvent) {
        if let Some(publisher) = &self.publisher {
            publisher.publish(event).await;
        }
    }
}

#[async_trait]
impl<S, G, V> BackchainResolutionApi for BackchainResolutionService<S, G, V>
where
    S: TransactionStore + 'static,
    G: GroupParametersStore + 'static,
    V: TransactionVerifier + 'static,
{
    async fn resolve(
        &self,
        roots: &[TransactionId],
        session: &mut dyn RequesterSession,
    ) -> Result<ResolutionOutcome, ResolutionError> {
        let _timer = self
            .metrics
            .as_ref()
            .map(|metrics| time_histogram!(metrics.resolution_duration));

        let result = self.resolve_roots(roots, session).await;

        let outcome_label = match &result {
            Ok(outcome) => {
                info!(
                    counterparty = session.counterparty(),
                    verified = outcome.verified_count(),
                    "[lb-02] Backchain resolved"
                );
                self.publish(LedgerEvent::BackchainResolved {
                    roots: roots.to_vec(),
                    resolved: outcome.verified_count(),
                })
                .await;
                if outcome.resolution_required {
                    "resolved"
                } else {
                    "skipped"
                }
            }
            Err(err) => {
                error!(
                    counterparty = session.counterparty(),
                    error = %err,
                    "[lb-02] Backchain resolution failed"
                );
                self.publish(LedgerEvent::BackchainResolutionFailed {
                    roots: roots.to_vec(),
                    reason: err.to_string(),
                })
                .await;
                "failed"
            }
        };
        if let Some(metrics) = &self.metrics {
            metrics.resolutions.with_label_values(&[outcome_label]).inc();
        }

        result
    }
}
