//! Verification request handler.
//!
//! Checks code package availability, decodes the transaction and runs the
//! contract verifier. Any error escaping that pipeline is categorised with
//! [`categorize`] and returned in the response.

use crate::domain::entities::ContractVerificationResult;
use crate::domain::errors::{categorize, VerificationError};
use crate::ipc::payloads::{VerifyContractsOutcome, VerifyContractsRequest, VerifyContractsResponse};
use crate::ports::inbound::ContractVerificationApi;
use crate::ports::outbound::{CpkAvailability, CpkResolver};
use anyhow::Context;
use backchain_telemetry::log_request_event;
use shared_types::entities::{Hash, TransactionId};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Handler for `VerifyContractsRequest`s.
pub struct VerificationRequestHandler<V: ContractVerificationApi, R: CpkResolver> {
    verifier: Arc<V>,
    cpk_resolver: Arc<R>,
}

impl<V: ContractVerificationApi, R: CpkResolver> VerificationRequestHandler<V, R> {
    pub fn new(verifier: Arc<V>, cpk_resolver: Arc<R>) -> Self {
        Self {
            verifier,
            cpk_resolver,
        }
    }

    /// Handle a request. Never fails: errors are folded into the response.
    pub fn handle(&self, request: &VerifyContractsRequest) -> VerifyContractsResponse {
        let outcome = match self.process(request) {
            Ok((transaction_id, result)) => {
                log_request_event!(
                    debug,
                    "lb-01",
                    "[lb-01] Verification request completed",
                    request.request_id,
                    tx_id = %transaction_id,
                    verified = result.is_verified()
                );
                VerifyContractsOutcome::Completed {
                    transaction_id,
                    result,
                }
            }
            Err(error) => {
                let category = categorize(&error);
                log_request_event!(
                    warn,
                    "lb-01",
                    "[lb-01] Verification request failed",
                    request.request_id,
                    category = ?category,
                    error = %format!("{error:#}")
                );
                VerifyContractsOutcome::Failed {
                    category,
                    message: format!("{error:#}"),
                }
            }
        };

        VerifyContractsResponse {
            request_id: request.request_id.clone(),
            outcome,
        }
    }

    /// Decode a bus payload and handle it.
    pub fn handle_bytes(&self, request_id: &str, payload: &[u8]) -> VerifyContractsResponse {
        match VerifyContractsRequest::from_bytes(payload) {
            Ok(request) => self.handle(&request),
            Err(error) => {
                let error = anyhow::Error::from(error);
                VerifyContractsResponse {
                    request_id: request_id.to_string(),
                    outcome: VerifyContractsOutcome::Failed {
                        category: categorize(&error),
                        message: format!("{error:#}"),
                    },
                }
            }
        }
    }

    fn process(
        &self,
        request: &VerifyContractsRequest,
    ) -> anyhow::Result<(TransactionId, ContractVerificationResult)> {
        let transaction = request
            .decode_transaction()
            .with_context(|| format!("request {}", request.request_id))?;

        let checksums: BTreeSet<Hash> = request
            .cpk_checksums
            .iter()
            .chain(transaction.metadata.cpk_checksums.iter())
            .copied()
            .collect();
        for checksum in checksums {
            self.ensure_available(checksum)
                .with_context(|| format!("transaction {}", transaction.id))?;
        }

        let result = self.verifier.verify(&transaction);
        Ok((transaction.id, result))
    }

    fn ensure_available(&self, checksum: Hash) -> Result<(), VerificationError> {
        match self.cpk_resolver.availability(&checksum) {
            CpkAvailability::Available => Ok(()),
            CpkAvailability::Pending => Err(VerificationError::CpkNotAvailable(checksum)),
            CpkAvailability::Disallowed => Err(VerificationError::CpkNotAllowed(checksum)),
        }
    }
}
