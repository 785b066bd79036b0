//! # Verification Redelivery Choreography
//!
//! Contract verification requests flow over the shared bus:
//!
//! ```text
//! caller ──VerificationRequested──→ bus ──→ lb-01 worker ──VerificationCompleted──→ bus
//!                                    │                                              │
//!                                    └──→ lb-03 tracker ←───────────────────────────┘
//!                                           │
//!                                           └──VerificationRedelivery (window expired)──→ bus
//! ```
//!
//! A worker that cannot finish a request (code package not yet available)
//! answers with a retryable failure and publishes nothing; the tracker
//! redelivers the request once the expiry window passes.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use lb_01_contract_verification::{
        Contract, ContractRegistry, ContractVerifier, ContractViolation, InMemoryCpkResolver,
        VerificationConfig, VerificationRequestHandler, VerifyContractsOutcome,
        VerifyContractsRequest, VerifyContractsResponse,
    };
    use lb_03_verification_redelivery::{
        partition_for, Clock, PendingRequestTracker, RedeliveryConfig, RedeliveryScheduler,
        TokioClock,
    };
    use shared_bus::{
        EventFilter, EventPublisher, EventTopic, InMemoryEventBus, LedgerEvent, Subscription,
    };
    use shared_types::entities::{
        ContractState, Hash, LedgerTransaction, TransactionId, TransactionMetadata,
        TransactionState,
    };
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    const TOKEN: &str = "com.example.TokenContract";

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    #[derive(Default)]
    struct AcceptAll;

    impl Contract for AcceptAll {
        fn verify(&self, _transaction: &LedgerTransaction) -> Result<(), ContractViolation> {
            Ok(())
        }
    }

    type Handler =
        VerificationRequestHandler<ContractVerifier<ContractRegistry>, InMemoryCpkResolver>;

    fn config() -> RedeliveryConfig {
        RedeliveryConfig {
            expiry_window_ms: 1_000,
            max_attempts: 3,
            partition_count: 4,
        }
    }

    struct System {
        bus: Arc<InMemoryEventBus>,
        cpk_resolver: Arc<InMemoryCpkResolver>,
        tracker: Arc<PendingRequestTracker>,
        responses: mpsc::UnboundedReceiver<VerifyContractsResponse>,
        tasks: Vec<JoinHandle<()>>,
    }

    impl System {
        fn start() -> Self {
            let bus = Arc::new(InMemoryEventBus::new());

            let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(0));
            let scheduler = Arc::new(
                RedeliveryScheduler::new(bus.clone(), clock.clone()).expect("inside runtime"),
            );
            let tracker = Arc::new(PendingRequestTracker::new(scheduler, clock, config()));
            let tracker_inbox = bus.subscribe(EventFilter::all());

            let registry = ContractRegistry::new().with::<AcceptAll>(TOKEN);
            let verifier = ContractVerifier::new(Arc::new(registry), VerificationConfig::default());
            let cpk_resolver = Arc::new(InMemoryCpkResolver::new());
            let handler = Arc::new(VerificationRequestHandler::new(
                Arc::new(verifier),
                cpk_resolver.clone(),
            ));
            let worker_inbox = bus.subscribe(EventFilter::topics(vec![
                EventTopic::ContractVerification,
                EventTopic::Redelivery,
            ]));
            let (responses_tx, responses) = mpsc::unbounded_channel();

            let tasks = vec![
                tokio::spawn(tracker.clone().run(tracker_inbox)),
                tokio::spawn(verification_worker(
                    handler,
                    bus.clone(),
                    worker_inbox,
                    responses_tx,
                )),
            ];

            Self {
                bus,
                cpk_resolver,
                tracker,
                responses,
                tasks,
            }
        }

        async fn request(&self, request_id: &str, cpk: Hash) {
            let payload = VerifyContractsRequest::new(request_id, &transaction(cpk))
                .and_then(|request| request.to_bytes())
                .expect("request encodes");
            self.bus
                .publish(LedgerEvent::VerificationRequested {
                    request_id: request_id.to_string(),
                    payload,
                })
                .await;
        }

        fn drain_responses(&mut self) -> Vec<VerifyContractsResponse> {
            let mut drained = Vec::new();
            while let Ok(response) = self.responses.try_recv() {
                drained.push(response);
            }
            drained
        }
    }

    impl Drop for System {
        fn drop(&mut self) {
            for task in &self.tasks {
                task.abort();
            }
        }
    }

    /// lb-01 on the bus: handles requests and redeliveries, announces
    /// completed verifications.
    async fn verification_worker(
        handler: Arc<Handler>,
        bus: Arc<InMemoryEventBus>,
        mut inbox: Subscription,
        responses: mpsc::UnboundedSender<VerifyContractsResponse>,
    ) {
        while let Some(event) = inbox.recv().await {
            let (request_id, payload) = match event {
                LedgerEvent::VerificationRequested {
                    request_id,
                    payload,
                }
                | LedgerEvent::VerificationRedelivery {
                    request_id,
                    payload,
                    ..
                } => (request_id, payload),
                _ => continue,
            };

            let response = handler.handle_bytes(&request_id, &payload);
            if let VerifyContractsOutcome::Completed {
                transaction_id,
                result,
            } = &response.outcome
            {
                bus.publish(LedgerEvent::VerificationCompleted {
                    request_id: request_id.clone(),
                    transaction_id: *transaction_id,
                    verified: result.is_verified(),
                })
                .await;
            }
            if responses.send(response).is_err() {
                break;
            }
        }
    }

    fn transaction(cpk: Hash) -> LedgerTransaction {
        LedgerTransaction {
            id: TransactionId::from_low_u64(42),
            inputs: vec![],
            outputs: vec![TransactionState::new(
                ContractState::new("com.example.TokenState"),
                TOKEN,
            )],
            references: vec![],
            metadata: TransactionMetadata {
                cpk_checksums: vec![cpk],
                ..Default::default()
            },
        }
    }

    fn cpk(n: u64) -> Hash {
        Hash::from_low_u64_be(n)
    }

    // =============================================================================
    // INTEGRATION TESTS: REDELIVERY
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_pending_cpk_redelivered_until_installed() {
        let mut system = System::start();
        system.request("req-1", cpk(1)).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        let first = system.drain_responses();
        assert_eq!(first.len(), 1);
        assert!(first[0].is_retryable());
        assert!(system.tracker.is_pending("req-1"));

        system.cpk_resolver.install(cpk(1));
        tokio::time::sleep(Duration::from_millis(1_000)).await;

        let second = system.drain_responses();
        assert_eq!(second.len(), 1);
        assert!(second[0].result().expect("completed").is_verified());
        assert!(!system.tracker.is_pending("req-1"));
        assert!(!system.tracker.scheduler().is_armed("req-1"));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(system.drain_responses().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_request_never_redelivered() {
        let mut system = System::start();
        let mut redeliveries = system
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Redelivery]));
        system.cpk_resolver.install(cpk(2));

        system.request("req-2", cpk(2)).await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let responses = system.drain_responses();
        assert_eq!(responses.len(), 1);
        assert!(responses[0].result().is_some());
        assert!(matches!(redeliveries.try_recv(), Ok(None)));
        assert_eq!(system.tracker.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unacknowledged_request_dropped_after_max_attempts() {
        let mut system = System::start();
        system.request("req-3", cpk(3)).await;

        tokio::time::sleep(Duration::from_secs(10)).await;

        // Original delivery plus attempts 2 and 3.
        let responses = system.drain_responses();
        assert_eq!(responses.len(), 3);
        assert!(responses.iter().all(VerifyContractsResponse::is_retryable));
        assert!(!system.tracker.is_pending("req-3"));
        assert_eq!(system.tracker.dropped_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_revoked_partition_holds_redelivery_until_reassigned() {
        let mut system = System::start();
        let partition = partition_for("req-4", config().partition_count);
        system.request("req-4", cpk(4)).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(system.drain_responses().len(), 1);

        assert_eq!(system.tracker.revoke_partitions(&[partition]), 1);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(system.drain_responses().is_empty());
        assert!(system.tracker.is_pending("req-4"));

        // Past due on reassignment: delivered at once.
        system.cpk_resolver.install(cpk(4));
        assert_eq!(system.tracker.assign_partitions(&[partition]), 1);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let responses = system.drain_responses();
        assert_eq!(responses.len(), 1);
        assert!(responses[0].result().is_some());
        assert!(!system.tracker.is_pending("req-4"));
    }
}
