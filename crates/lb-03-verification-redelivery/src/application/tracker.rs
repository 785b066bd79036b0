//! Pending verification request tracking.
//!
//! The tracker owns the redelivery records and drives the scheduler from
//! verification lifecycle events:
//!
//! - `VerificationRequested`: record the request and schedule its first
//!   redelivery one expiry window out.
//! - `VerificationCompleted`: forget the request and cancel its timer.
//! - `VerificationRedelivery`: schedule the next attempt, or drop the
//!   request once `max_attempts` is reached.
//!
//! Records of revoked partitions are kept up to date but not armed until the
//! partition is assigned back.

use dashmap::{DashMap, DashSet};
use shared_bus::{LedgerEvent, Subscription};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::scheduler::RedeliveryScheduler;
use crate::config::RedeliveryConfig;
use crate::domain::{partition_for, PartitionId, RedeliveryEntry, RedeliveryError};
use crate::ports::Clock;

/// Tracks unacknowledged verification requests.
pub struct PendingRequestTracker {
    records: DashMap<String, RedeliveryEntry>,
    revoked: DashSet<PartitionId>,
    scheduler: Arc<RedeliveryScheduler>,
    clock: Arc<dyn Clock>,
    config: RedeliveryConfig,
    dropped: AtomicU64,
}

impl PendingRequestTracker {
    pub fn new(
        scheduler: Arc<RedeliveryScheduler>,
        clock: Arc<dyn Clock>,
        config: RedeliveryConfig,
    ) -> Self {
        Self {
            records: DashMap::new(),
            revoked: DashSet::new(),
            scheduler,
            clock,
            config,
            dropped: AtomicU64::new(0),
        }
    }

    /// Record a newly delivered request. Re-tracking an id restarts it.
    pub fn track(&self, request_id: &str, payload: Vec<u8>) -> RedeliveryEntry {
        let entry = RedeliveryEntry {
            request_id: request_id.to_string(),
            partition: partition_for(request_id, self.config.partition_count),
            scheduled_delivery_ms: self.expiry_from_now(),
            attempt: 2,
            payload,
        };
        self.records.insert(entry.request_id.clone(), entry.clone());
        self.arm(entry.clone());

        debug!(
            request_id = %request_id,
            partition = entry.partition,
            "[lb-03] Tracking verification request"
        );
        entry
    }

    /// Forget an acknowledged request. Returns whether it was pending.
    pub fn acknowledge(&self, request_id: &str) -> bool {
        let pending = self.records.remove(request_id).is_some();
        self.scheduler.on_record_removed(request_id);
        if pending {
            debug!(request_id = %request_id, "[lb-03] Verification request acknowledged");
        }
        pending
    }

    /// Handle a published redelivery of `request_id`.
    ///
    /// Schedules the following attempt and returns its entry, or drops the
    /// request when the redelivered attempt was the last one allowed.
    pub fn on_redelivered(&self, request_id: &str) -> Result<RedeliveryEntry, RedeliveryError> {
        let next = {
            let mut record = self
                .records
                .get_mut(request_id)
                .ok_or_else(|| RedeliveryError::UnknownRequest(request_id.to_string()))?;

            if record.attempt >= self.config.max_attempts {
                let attempts = record.attempt;
                drop(record);
                self.records.remove(request_id);
                self.scheduler.on_record_removed(request_id);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    request_id = %request_id,
                    attempts,
                    "[lb-03] Dropping verification request after final attempt"
                );
                return Err(RedeliveryError::MaxAttemptsExceeded {
                    request_id: request_id.to_string(),
                    attempts,
                });
            }

            record.attempt += 1;
            record.scheduled_delivery_ms = self.expiry_from_now();
            record.clone()
        };

        self.arm(next.clone());
        Ok(next)
    }

    /// Cancel the timers of partitions this node no longer owns. Records are
    /// kept so the partitions can be reassigned later.
    pub fn revoke_partitions(&self, partitions: &[PartitionId]) -> usize {
        for partition in partitions {
            self.revoked.insert(*partition);
        }
        self.scheduler.on_partitions_revoked(partitions)
    }

    /// Re-arm timers for the records of `partitions`.
    pub fn assign_partitions(&self, partitions: &[PartitionId]) -> usize {
        for partition in partitions {
            self.revoked.remove(partition);
        }
        let owned: Vec<RedeliveryEntry> = self
            .records
            .iter()
            .filter(|record| partitions.contains(&record.partition))
            .map(|record| record.value().clone())
            .collect();
        let count = owned.len();
        self.scheduler.on_partitions_assigned(owned);
        count
    }

    /// Apply one bus event.
    pub fn handle_event(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::VerificationRequested {
                request_id,
                payload,
            } => {
                self.track(request_id, payload.clone());
            }
            LedgerEvent::VerificationCompleted { request_id, .. } => {
                self.acknowledge(request_id);
            }
            LedgerEvent::VerificationRedelivery { request_id, .. } => {
                // A missing record means the request was acknowledged while
                // the redelivery was in flight.
                if let Err(RedeliveryError::UnknownRequest(id)) = self.on_redelivered(request_id) {
                    debug!(request_id = %id, "[lb-03] Redelivery for settled request");
                }
            }
            _ => {}
        }
    }

    /// Consume events until the bus closes.
    pub async fn run(self: Arc<Self>, mut subscription: Subscription) {
        info!("[lb-03] Pending request tracker started");
        while let Some(event) = subscription.recv().await {
            self.handle_event(&event);
        }
        info!("[lb-03] Pending request tracker stopped");
    }

    /// Whether timers for `partition` are currently held back.
    pub fn is_revoked(&self, partition: PartitionId) -> bool {
        self.revoked.contains(&partition)
    }

    pub fn is_pending(&self, request_id: &str) -> bool {
        self.records.contains_key(request_id)
    }

    pub fn pending_count(&self) -> usize {
        self.records.len()
    }

    /// Requests dropped after exhausting their attempts.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn scheduler(&self) -> &Arc<RedeliveryScheduler> {
        &self.scheduler
    }

    fn arm(&self, entry: RedeliveryEntry) {
        let partition = entry.partition;
        if self.revoked.contains(&partition) {
            debug!(
                request_id = %entry.request_id,
                partition,
                "[lb-03] Partition revoked, redelivery held"
            );
            return;
        }
        let request_id = entry.request_id.clone();
        self.scheduler.on_record_updated(entry);

        // A revocation that raced the arm above has already swept the timers.
        if self.revoked.contains(&partition) {
            self.scheduler.on_record_removed(&request_id);
        }
    }

    fn expiry_from_now(&self) -> u64 {
        self.clock.now_millis() + self.config.expiry_window_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::TokioClock;
    use shared_bus::{EventFilter, EventPublisher, EventTopic, InMemoryEventBus};
    use shared_types::TransactionId;
    use std::time::Duration;

    struct Harness {
        bus: Arc<InMemoryEventBus>,
        tracker: Arc<PendingRequestTracker>,
    }

    fn harness() -> Harness {
        let bus = Arc::new(InMemoryEventBus::new());
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(0));
        let scheduler = Arc::new(
            RedeliveryScheduler::new(bus.clone(), clock.clone()).expect("inside runtime"),
        );
        let tracker = Arc::new(PendingRequestTracker::new(
            scheduler,
            clock,
            RedeliveryConfig::for_testing(),
        ));
        Harness { bus, tracker }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_observation_schedules_one_window_out() {
        let h = harness();
        let entry = h.tracker.track("req-1", b"payload".to_vec());

        assert_eq!(entry.scheduled_delivery_ms, 1_000);
        assert_eq!(entry.attempt, 2);
        assert!(h.tracker.is_pending("req-1"));
        assert_eq!(h.tracker.scheduler().next_due(), Some(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledge_cancels_timer() {
        let h = harness();
        let mut redeliveries = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Redelivery]));
        h.tracker.track("req-1", vec![]);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(h.tracker.acknowledge("req-1"));
        assert!(!h.tracker.acknowledge("req-1"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(matches!(redeliveries.try_recv(), Ok(None)));
        assert_eq!(h.tracker.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redelivery_increments_attempt_until_max() {
        let h = harness();
        h.tracker.track("req-1", vec![]);

        let next = h.tracker.on_redelivered("req-1").expect("attempt 3 allowed");
        assert_eq!(next.attempt, 3);

        let result = h.tracker.on_redelivered("req-1");
        assert_eq!(
            result,
            Err(RedeliveryError::MaxAttemptsExceeded {
                request_id: "req-1".into(),
                attempts: 3,
            })
        );
        assert!(!h.tracker.is_pending("req-1"));
        assert!(!h.tracker.scheduler().is_armed("req-1"));
        assert_eq!(h.tracker.dropped_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_redelivery_is_reported() {
        let h = harness();
        assert_eq!(
            h.tracker.on_redelivered("ghost"),
            Err(RedeliveryError::UnknownRequest("ghost".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_partition_revocation_keeps_records() {
        let h = harness();
        let entry = h.tracker.track("req-1", vec![]);

        assert_eq!(h.tracker.revoke_partitions(&[entry.partition]), 1);
        assert!(h.tracker.is_pending("req-1"));
        assert!(!h.tracker.scheduler().is_armed("req-1"));

        assert_eq!(h.tracker.assign_partitions(&[entry.partition]), 1);
        assert!(h.tracker.scheduler().is_armed("req-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_on_revoked_partition_wait_for_assignment() {
        let h = harness();
        let mut redeliveries = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Redelivery]));
        let partition = partition_for("req-x", RedeliveryConfig::for_testing().partition_count);

        assert_eq!(h.tracker.revoke_partitions(&[partition]), 0);
        assert!(h.tracker.is_revoked(partition));
        let entry = h.tracker.track("req-x", vec![]);

        assert!(h.tracker.is_pending("req-x"));
        assert!(!h.tracker.scheduler().is_armed("req-x"));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(matches!(redeliveries.try_recv(), Ok(None)));

        // A redelivery observed from the new owner advances the record only.
        let next = h.tracker.on_redelivered("req-x").expect("attempt 3 allowed");
        assert_eq!(next.attempt, entry.attempt + 1);
        assert!(!h.tracker.scheduler().is_armed("req-x"));

        assert_eq!(h.tracker.assign_partitions(&[partition]), 1);
        assert!(!h.tracker.is_revoked(partition));
        assert!(h.tracker.scheduler().is_armed("req-x"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        match redeliveries.try_recv() {
            Ok(Some(LedgerEvent::VerificationRedelivery {
                request_id,
                attempt,
                ..
            })) => {
                assert_eq!(request_id, "req-x");
                assert_eq!(attempt, 3);
            }
            other => panic!("expected redelivery, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_bus_driven_lifecycle() {
        let h = harness();
        let mut redeliveries = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Redelivery]));
        let all = h.bus.subscribe(EventFilter::all());
        let task = tokio::spawn(h.tracker.clone().run(all));

        h.bus
            .publish(LedgerEvent::VerificationRequested {
                request_id: "slow".into(),
                payload: b"slow".to_vec(),
            })
            .await;
        h.bus
            .publish(LedgerEvent::VerificationRequested {
                request_id: "fast".into(),
                payload: b"fast".to_vec(),
            })
            .await;
        h.bus
            .publish(LedgerEvent::VerificationCompleted {
                request_id: "fast".into(),
                transaction_id: TransactionId::from_low_u64(1),
                verified: true,
            })
            .await;

        // Window 1s, attempts 2 and 3, then dropped.
        tokio::time::sleep(Duration::from_millis(3_500)).await;

        let mut attempts = Vec::new();
        while let Ok(Some(LedgerEvent::VerificationRedelivery {
            request_id,
            attempt,
            payload,
        })) = redeliveries.try_recv()
        {
            assert_eq!(request_id, "slow");
            assert_eq!(payload, b"slow".to_vec());
            attempts.push(attempt);
        }
        assert_eq!(attempts, vec![2, 3]);
        assert_eq!(h.tracker.pending_count(), 0);
        assert_eq!(h.tracker.dropped_count(), 1);

        task.abort();
    }
}
