//! # Backchain Resolution Flows
//!
//! Two nodes connected by an in-process channel session. The responding
//! node serves its ledger with `BackchainResponder` on a spawned task; the
//! resolving node runs `BackchainResolutionService` with the real contract
//! verification stack (lb-01 `ContractVerifier` behind the lb-02
//! `ContractTransactionVerifier` adapter).
//!
//! ## Flows Tested:
//!
//! 1. **Chain resolution**: every ancestor fetched, verified in dependency order
//! 2. **Invalid ancestor**: contract failure marks the ancestor invalid and aborts
//! 3. **Group parameters (V2)**: parameters fetched alongside the backchain
//! 4. **Protocol errors**: version mismatch and unknown request kinds end the session

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use backchain_telemetry::BackchainMetrics;
    use lb_01_contract_verification::{
        Contract, ContractRegistry, ContractVerifier, ContractViolation, VerificationConfig,
    };
    use lb_02_backchain_resolution::test_utils::{chain, issue, spend, TOKEN_CONTRACT};
    use lb_02_backchain_resolution::{
        channel_session_pair, BackchainResolutionApi, BackchainResolutionService,
        ContractTransactionVerifier, InMemoryLedgerStore, ProtocolVersion, ResolutionConfig,
        ResolutionError, ResolutionOutcome, ResponderSummary, SessionError,
        DEFAULT_SESSION_CAPACITY,
    };
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, LedgerEvent};
    use shared_types::entities::{
        GroupParameters, LedgerTransaction, SignedGroupParameters, SignedTransaction, StateRef,
        TransactionId, TransactionMetadata, TransactionState, TransactionStatus,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Token contract: issuance is free, spends must conserve the amount.
    #[derive(Default)]
    struct Conserving;

    impl Contract for Conserving {
        fn verify(&self, transaction: &LedgerTransaction) -> Result<(), ContractViolation> {
            let amount = |state: &TransactionState| {
                state.data.properties["amount"].as_u64().unwrap_or_default()
            };
            if transaction.inputs.is_empty() {
                return Ok(());
            }
            let consumed: u64 = transaction
                .inputs_for(TOKEN_CONTRACT)
                .map(|input| amount(&input.state))
                .sum();
            let produced: u64 = transaction.outputs_for(TOKEN_CONTRACT).map(amount).sum();
            ContractViolation::require(consumed == produced, "token amounts must balance")
        }
    }

    type Verifier =
        ContractTransactionVerifier<InMemoryLedgerStore, ContractVerifier<ContractRegistry>>;
    type Service = BackchainResolutionService<InMemoryLedgerStore, InMemoryLedgerStore, Verifier>;

    struct Node {
        store: Arc<InMemoryLedgerStore>,
        service: Service,
    }

    fn node(config: ResolutionConfig) -> Node {
        let store = Arc::new(InMemoryLedgerStore::new());
        let registry = ContractRegistry::new().with::<Conserving>(TOKEN_CONTRACT);
        let contracts = Arc::new(ContractVerifier::new(
            Arc::new(registry),
            VerificationConfig::default(),
        ));
        let verifier = Arc::new(ContractTransactionVerifier::new(store.clone(), contracts));
        let service = BackchainResolutionService::new(store.clone(), store.clone(), verifier, config);
        Node { store, service }
    }

    /// A node holding `transactions` as verified.
    fn serving_node(config: ResolutionConfig, transactions: &[SignedTransaction]) -> Node {
        let serving = node(config);
        for transaction in transactions {
            serving
                .store
                .insert(transaction.clone(), TransactionStatus::Verified);
        }
        serving
    }

    /// Resolve `roots` on `requester` against `responder` over a channel
    /// session. Returns both sides' results.
    async fn resolve_over_channel(
        requester: &Node,
        responder: &Node,
        roots: &[TransactionId],
    ) -> (
        Result<ResolutionOutcome, ResolutionError>,
        Result<ResponderSummary, ResolutionError>,
    ) {
        let (mut requester_session, mut responder_session) =
            channel_session_pair("alice", "bob", DEFAULT_SESSION_CAPACITY);
        let responder_flow = responder.service.responder();
        let serving =
            tokio::spawn(async move { responder_flow.run(&mut responder_session).await });

        let outcome = requester
            .service
            .resolve(roots, &mut requester_session)
            .await;
        drop(requester_session);

        let summary = serving.await.expect("responder task panicked");
        (outcome, summary)
    }

    fn ids(transactions: &[SignedTransaction]) -> Vec<TransactionId> {
        transactions.iter().map(|tx| tx.id).collect()
    }

    fn in_group(
        parameters: &SignedGroupParameters,
        transaction: SignedTransaction,
    ) -> SignedTransaction {
        SignedTransaction::new(
            transaction.inputs,
            transaction.references,
            transaction.outputs,
            TransactionMetadata {
                group_parameters_hash: Some(parameters.hash()),
                ..Default::default()
            },
        )
    }

    // =============================================================================
    // INTEGRATION TESTS: RESOLUTION BETWEEN TWO NODES
    // =============================================================================

    #[tokio::test]
    async fn test_chain_resolved_and_verified_across_nodes() {
        let txs = chain(6);
        let bob = serving_node(ResolutionConfig::default(), &txs);
        let alice = node(ResolutionConfig::default());

        let (outcome, summary) = resolve_over_channel(&alice, &bob, &[txs[5].id]).await;

        let outcome = outcome.expect("resolution succeeds");
        assert!(outcome.resolution_required);
        assert_eq!(outcome.verified_in_order, ids(&txs));
        for tx in &txs {
            assert_eq!(alice.store.status(&tx.id), Some(TransactionStatus::Verified));
        }

        let summary = summary.expect("responder finishes on Stop");
        assert_eq!(summary.transactions_sent, 6);
        assert_eq!(summary.get_requests, 6);
    }

    #[tokio::test]
    async fn test_diamond_backchain_verified_dependencies_first() {
        let a = issue(60);
        let b = issue(40);
        let c = spend(&[StateRef::new(a.id, 0), StateRef::new(b.id, 0)], &[100]);
        let d = spend(&[StateRef::new(c.id, 0)], &[50, 50]);
        let bob = serving_node(
            ResolutionConfig::default(),
            &[a.clone(), b.clone(), c.clone(), d.clone()],
        );
        let alice = node(ResolutionConfig::default());

        let (outcome, summary) = resolve_over_channel(&alice, &bob, &[d.id]).await;

        let order = outcome.expect("resolution succeeds").verified_in_order;
        let position = |id: TransactionId| order.iter().position(|x| *x == id).unwrap();
        assert_eq!(order.len(), 4);
        assert!(position(a.id) < position(c.id));
        assert!(position(b.id) < position(c.id));
        assert_eq!(position(d.id), 3);

        // [d], [c], [a, b]
        let summary = summary.unwrap();
        assert_eq!(summary.get_requests, 3);
        assert_eq!(summary.transactions_sent, 4);
    }

    #[tokio::test]
    async fn test_batches_are_capped_by_batch_size() {
        let roots: Vec<SignedTransaction> = (0..5).map(issue).collect();
        let bob = serving_node(ResolutionConfig::default(), &roots);
        let alice = node(ResolutionConfig::default().with_batch_size(2));

        let (outcome, summary) = resolve_over_channel(&alice, &bob, &ids(&roots)).await;

        assert_eq!(outcome.unwrap().verified_count(), 5);
        assert_eq!(summary.unwrap().get_requests, 3);
    }

    #[tokio::test]
    async fn test_inflating_ancestor_fails_resolution() {
        let a = issue(100);
        let b = spend(&[StateRef::new(a.id, 0)], &[500]);
        let c = spend(&[StateRef::new(b.id, 0)], &[500]);
        let bob = serving_node(ResolutionConfig::default(), &[a.clone(), b.clone(), c.clone()]);
        let alice = node(ResolutionConfig::default());

        let (outcome, summary) = resolve_over_channel(&alice, &bob, &[c.id]).await;

        match outcome {
            Err(ResolutionError::ContractVerificationFailed { id, failures }) => {
                assert_eq!(id, b.id);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].contract_class_name, TOKEN_CONTRACT);
                assert_eq!(failures[0].exception_message, "token amounts must balance");
            }
            other => panic!("expected contract failure, got {other:?}"),
        }
        assert_eq!(alice.store.status(&a.id), Some(TransactionStatus::Verified));
        assert_eq!(alice.store.status(&b.id), Some(TransactionStatus::Invalid));
        assert_eq!(alice.store.status(&c.id), Some(TransactionStatus::Unverified));

        // Retrieval finished before verification started.
        assert!(summary.is_ok());
    }

    #[tokio::test]
    async fn test_known_invalid_ancestor_aborts_next_resolution() {
        let a = issue(100);
        let b = spend(&[StateRef::new(a.id, 0)], &[500]);
        let c = spend(&[StateRef::new(b.id, 0)], &[500]);
        let bob = serving_node(ResolutionConfig::default(), &[a.clone(), b.clone(), c.clone()]);
        let alice = node(ResolutionConfig::default());
        let (first, _) = resolve_over_channel(&alice, &bob, &[c.id]).await;
        assert!(first.is_err());

        // c is stored unverified, its input is known invalid.
        let (second, summary) = resolve_over_channel(&alice, &bob, &[c.id]).await;

        match second {
            Err(ResolutionError::InvalidAncestors(invalid)) => assert_eq!(invalid, vec![b.id]),
            other => panic!("expected invalid ancestors, got {other:?}"),
        }
        assert!(matches!(
            summary,
            Err(ResolutionError::Session(SessionError::Closed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_previously_verified_ancestors_not_refetched() {
        let txs = chain(5);
        let bob = serving_node(ResolutionConfig::default(), &txs);
        let alice = serving_node(ResolutionConfig::default(), &txs[..3]);

        let (outcome, summary) = resolve_over_channel(&alice, &bob, &[txs[4].id]).await;

        assert_eq!(outcome.unwrap().verified_in_order, vec![txs[3].id, txs[4].id]);
        assert_eq!(summary.unwrap().transactions_sent, 2);
    }

    #[tokio::test]
    async fn test_verified_root_sends_only_stop() {
        let txs = chain(2);
        let bob = serving_node(ResolutionConfig::default(), &txs);
        let alice = serving_node(ResolutionConfig::default(), &txs);

        let (outcome, summary) = resolve_over_channel(&alice, &bob, &[txs[1].id]).await;

        let outcome = outcome.unwrap();
        assert!(!outcome.resolution_required);
        assert_eq!(outcome.already_verified, vec![txs[1].id]);
        assert_eq!(summary.unwrap(), ResponderSummary::default());
    }

    #[tokio::test]
    async fn test_v2_group_parameters_travel_with_backchain() {
        let parameters = SignedGroupParameters::new(
            GroupParameters {
                epoch: 4,
                minimum_platform_version: 1,
                ..Default::default()
            },
            vec![9, 9],
        );
        let a = in_group(&parameters, issue(100));
        let b = in_group(&parameters, spend(&[StateRef::new(a.id, 0)], &[100]));
        let bob = serving_node(ResolutionConfig::default(), &[a.clone(), b.clone()]);
        bob.store.insert_group_parameters(parameters.clone());
        let alice = node(ResolutionConfig::default());

        let (outcome, summary) = resolve_over_channel(&alice, &bob, &[b.id]).await;

        assert_eq!(outcome.unwrap().verified_count(), 2);
        assert!(alice.store.contains_group_parameters(&parameters.hash()));
        assert_eq!(summary.unwrap().group_parameters_sent, 1);
    }

    #[tokio::test]
    async fn test_v1_responder_rejects_group_parameter_request() {
        let parameters = SignedGroupParameters::new(GroupParameters::default(), vec![]);
        let a = in_group(&parameters, issue(100));
        let bob = serving_node(
            ResolutionConfig::default().with_protocol_version(ProtocolVersion::V1),
            &[a.clone()],
        );
        bob.store.insert_group_parameters(parameters);
        let alice = node(ResolutionConfig::default());

        let (outcome, summary) = resolve_over_channel(&alice, &bob, &[a.id]).await;

        assert!(matches!(
            summary,
            Err(ResolutionError::UnsupportedRequest {
                version: ProtocolVersion::V1,
                ..
            })
        ));
        assert!(matches!(
            outcome,
            Err(ResolutionError::Session(SessionError::Closed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unknown_request_kind_ends_session() {
        let bob = serving_node(ResolutionConfig::default(), &chain(1));
        let (mut requester_session, mut responder_session) =
            channel_session_pair("alice", "bob", DEFAULT_SESSION_CAPACITY);
        let responder_flow = bob.service.responder();
        let serving =
            tokio::spawn(async move { responder_flow.run(&mut responder_session).await });

        requester_session
            .send_raw(serde_json::to_vec(&serde_json::json!({ "kind": "rewind" })).unwrap())
            .await
            .unwrap();

        let summary = serving.await.unwrap();
        assert!(matches!(summary, Err(ResolutionError::UnrecognizedRequest)));
    }

    // =============================================================================
    // INTEGRATION TESTS: RESOLUTION → EVENT BUS / METRICS
    // =============================================================================

    #[tokio::test]
    async fn test_resolution_published_and_measured() {
        let txs = chain(3);
        let bob = serving_node(ResolutionConfig::default(), &txs);
        let bus = Arc::new(InMemoryEventBus::new());
        let mut events = bus.subscribe(EventFilter::topics(vec![EventTopic::BackchainResolution]));
        let metrics = BackchainMetrics::detached();
        let mut alice = node(ResolutionConfig::default());
        alice.service = alice
            .service
            .with_publisher(bus.clone())
            .with_metrics(metrics.clone());

        let (outcome, _) = resolve_over_channel(&alice, &bob, &[txs[2].id]).await;
        assert!(outcome.is_ok());

        match events.try_recv() {
            Ok(Some(LedgerEvent::BackchainResolved { roots, resolved })) => {
                assert_eq!(roots, vec![txs[2].id]);
                assert_eq!(resolved, 3);
            }
            other => panic!("expected BackchainResolved, got {other:?}"),
        }
        assert_eq!(metrics.transactions_retrieved.get(), 3);
        assert_eq!(metrics.get_requests_sent.get(), 3);
        assert_eq!(metrics.resolutions.with_label_values(&["resolved"]).get(), 1);
        let text = metrics.gather_text().unwrap();
        assert!(text.contains("lb_resolution_transactions_retrieved_total 3"));
    }
}
