//! # Contract Verifier
//!
//! Runs every contract governing a transaction's states and collects all
//! failures into a single result.
//!
//! ## Algorithm
//!
//! 1. Encumbrance check over inputs and outputs.
//! 2. Group input and output states by governing contract class.
//! 3. For each class (in class-name order) create the contract through the
//!    factory and run it over the whole transaction. Errors and panics become
//!    failure records; verification continues with the next class.
//! 4. The result is `Verified` iff no failure was recorded.

use crate::algorithms::encumbrance::check_encumbrances;
use crate::config::VerificationConfig;
use crate::domain::entities::{ContractVerificationFailure, ContractVerificationResult};
use crate::domain::errors::{ContractViolation, NULL_MESSAGE};
use crate::ports::inbound::ContractVerificationApi;
use crate::ports::outbound::{Contract, ContractFactory};
use backchain_telemetry::BackchainMetrics;
use shared_types::entities::LedgerTransaction;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Error kind recorded when a contract panics.
pub const CONTRACT_PANIC: &str = "ContractPanic";

/// Stateless contract verifier; safe to share across threads.
pub struct ContractVerifier<F: ContractFactory> {
    factory: Arc<F>,
    config: VerificationConfig,
    metrics: Option<Arc<BackchainMetrics>>,
}

impl<F: ContractFactory> ContractVerifier<F> {
    pub fn new(factory: Arc<F>, config: VerificationConfig) -> Self {
        Self {
            factory,
            config,
            metrics: None,
        }
    }

    /// Attach a metrics handle.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<BackchainMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Contract classes governing `transaction`, mapped to the distinct state
    /// class names they govern.
    fn group_by_contract(transaction: &LedgerTransaction) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut groups: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let states = transaction
            .inputs
            .iter()
            .map(|input| &input.state)
            .chain(transaction.outputs.iter());
        for state in states {
            groups
                .entry(state.contract.as_str())
                .or_default()
                .insert(state.data.state_class.as_str());
        }
        groups
    }

    fn run_contract(
        &self,
        contract_class: &str,
        transaction: &LedgerTransaction,
    ) -> Result<(), ContractViolation> {
        let run = || -> Result<(), ContractViolation> {
            let contract: Box<dyn Contract> = self.factory.create(contract_class)?;
            contract.verify(transaction)
        };

        if !self.config.catch_panics {
            return run();
        }

        match catch_unwind(AssertUnwindSafe(run)) {
            Ok(outcome) => outcome,
            Err(payload) => Err(panic_violation(payload)),
        }
    }
}

impl<F: ContractFactory> ContractVerificationApi for ContractVerifier<F> {
    fn verify(&self, transaction: &LedgerTransaction) -> ContractVerificationResult {
        let mut failures = if self.config.check_encumbrances {
            check_encumbrances(transaction)
        } else {
            Vec::new()
        };

        for (contract_class, state_classes) in Self::group_by_contract(transaction) {
            if let Err(violation) = self.run_contract(contract_class, transaction) {
                debug!(
                    tx_id = %transaction.id,
                    contract = contract_class,
                    error = %violation,
                    "[lb-01] Contract rejected transaction"
                );
                failures.push(ContractVerificationFailure {
                    contract_class_name: contract_class.to_string(),
                    contract_state_class_names: state_classes
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    exception_class_name: violation.kind,
                    exception_message: violation
                        .message
                        .unwrap_or_else(|| NULL_MESSAGE.to_string()),
                });
            }
        }

        let result = ContractVerificationResult::from_failures(failures);
        if result.is_verified() {
            debug!(tx_id = %transaction.id, "[lb-01] Transaction verified");
        } else {
            warn!(
                tx_id = %transaction.id,
                failures = result.failures().len(),
                "[lb-01] Transaction failed contract verification"
            );
        }

        if let Some(metrics) = &self.metrics {
            let outcome = if result.is_verified() { "verified" } else { "invalid" };
            metrics
                .contract_verifications
                .with_label_values(&[outcome])
                .inc();
        }

        result
    }
}

fn panic_violation(payload: Box<dyn Any + Send>) -> ContractViolation {
    let message = payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    ContractViolation {
        kind: CONTRACT_PANIC.to_string(),
        message,
    }
}
