//! Redelivery timers keyed by request id.
//!
//! Each pending request owns at most one armed timer. When a timer fires it
//! publishes [`LedgerEvent::VerificationRedelivery`] and removes its own map
//! entry, unless the entry was re-armed in the meantime.

use backchain_telemetry::{log_event, BackchainMetrics};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_bus::{EventPublisher, LedgerEvent};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::domain::{PartitionId, RedeliveryEntry, RedeliveryError};
use crate::ports::Clock;

/// An armed timer.
#[derive(Debug)]
struct TimerHandle {
    generation: u64,
    partition: PartitionId,
    scheduled_delivery_ms: u64,
    abort: AbortHandle,
}

/// Schedules redelivery of pending requests.
pub struct RedeliveryScheduler {
    timers: Arc<DashMap<String, TimerHandle>>,
    next_generation: AtomicU64,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    runtime: Handle,
    metrics: Option<Arc<BackchainMetrics>>,
}

impl RedeliveryScheduler {
    /// Scheduler running its timers on the current Tokio runtime.
    pub fn new(
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RedeliveryError> {
        let runtime = Handle::try_current().map_err(|_| RedeliveryError::NoRuntime)?;
        Ok(Self::with_runtime(publisher, clock, runtime))
    }

    /// Scheduler running its timers on `runtime`.
    pub fn with_runtime(
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        runtime: Handle,
    ) -> Self {
        Self {
            timers: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(0),
            publisher,
            clock,
            runtime,
            metrics: None,
        }
    }

    /// Attach metrics.
    pub fn with_metrics(mut self, metrics: Arc<BackchainMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Arm (or re-arm) the timer for `entry.request_id`.
    ///
    /// Any timer already armed for the key is cancelled. Entries already due
    /// fire immediately.
    pub fn on_record_updated(&self, entry: RedeliveryEntry) {
        let delay = entry.delay_from(self.clock.now_millis());
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let key = entry.request_id.clone();
        let partition = entry.partition;
        let scheduled_delivery_ms = entry.scheduled_delivery_ms;

        // The shard lock is held until the handle is stored, so a timer that
        // fires straight away cannot look for its entry before it exists.
        let slot = self.timers.entry(key.clone());
        let task = self.runtime.spawn(fire_after(
            Duration::from_millis(delay),
            entry,
            generation,
            self.timers.clone(),
            self.publisher.clone(),
            self.metrics.clone(),
        ));
        let handle = TimerHandle {
            generation,
            partition,
            scheduled_delivery_ms,
            abort: task.abort_handle(),
        };
        match slot {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.insert(handle);
                previous.abort.abort();
                self.record("cancelled");
            }
            Entry::Vacant(vacant) => {
                vacant.insert(handle);
            }
        }
        self.record("armed");

        debug!(
            request_id = %key,
            partition,
            delay_ms = delay,
            "[lb-03] Redelivery timer armed"
        );
    }

    /// Cancel the timer for `request_id`. Returns whether one was armed.
    ///
    /// Cancellation is best-effort: a timer that already fired may have
    /// published its redelivery.
    pub fn on_record_removed(&self, request_id: &str) -> bool {
        match self.timers.remove(request_id) {
            Some((_, handle)) => {
                handle.abort.abort();
                self.record("cancelled");
                debug!(request_id = %request_id, "[lb-03] Redelivery timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every timer owned by `partitions`. Returns how many were
    /// cancelled.
    pub fn on_partitions_revoked(&self, partitions: &[PartitionId]) -> usize {
        let revoked: HashSet<PartitionId> = partitions.iter().copied().collect();
        let mut cancelled = 0;
        self.timers.retain(|_, handle| {
            if revoked.contains(&handle.partition) {
                handle.abort.abort();
                cancelled += 1;
                false
            } else {
                true
            }
        });
        for _ in 0..cancelled {
            self.record("cancelled");
        }
        info!(
            partitions = ?partitions,
            cancelled,
            "[lb-03] Partitions revoked"
        );
        cancelled
    }

    /// Arm timers for records of newly owned partitions.
    pub fn on_partitions_assigned(&self, records: impl IntoIterator<Item = RedeliveryEntry>) {
        let mut armed = 0usize;
        for record in records {
            self.on_record_updated(record);
            armed += 1;
        }
        log_event!(info, "lb-03", "[lb-03] Partitions assigned", armed = armed);
    }

    /// Soonest scheduled delivery among armed timers.
    pub fn next_due(&self) -> Option<u64> {
        self.timers
            .iter()
            .map(|timer| timer.scheduled_delivery_ms)
            .min()
    }

    /// Whether a timer is armed for `request_id`.
    pub fn is_armed(&self, request_id: &str) -> bool {
        self.timers.contains_key(request_id)
    }

    /// Number of armed timers.
    pub fn armed_count(&self) -> usize {
        self.timers.len()
    }

    /// Cancel all timers.
    pub fn shutdown(&self) {
        self.timers.retain(|_, handle| {
            handle.abort.abort();
            false
        });
    }

    fn record(&self, event: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.redeliveries.with_label_values(&[event]).inc();
        }
    }
}

impl Drop for RedeliveryScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn fire_after(
    delay: Duration,
    entry: RedeliveryEntry,
    generation: u64,
    timers: Arc<DashMap<String, TimerHandle>>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Option<Arc<BackchainMetrics>>,
) {
    tokio::time::sleep(delay).await;

    // Only this generation's entry is removed; a re-armed timer stays.
    timers.remove_if(&entry.request_id, |_, handle| handle.generation == generation);

    info!(
        request_id = %entry.request_id,
        attempt = entry.attempt,
        "[lb-03] Redelivering verification request"
    );
    let receivers = publisher
        .publish(LedgerEvent::VerificationRedelivery {
            request_id: entry.request_id,
            attempt: entry.attempt,
            payload: entry.payload,
        })
        .await;
    debug!(receivers, "[lb-03] Redelivery published");

    if let Some(metrics) = metrics {
        metrics.redeliveries.with_label_values(&["fired"]).inc();
    }
}
