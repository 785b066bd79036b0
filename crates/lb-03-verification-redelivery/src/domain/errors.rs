//! Error types for Verification Redelivery

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedeliveryError {
    /// The request was delivered `attempts` times without acknowledgement.
    #[error("Request {request_id} still unacknowledged after {attempts} attempts")]
    MaxAttemptsExceeded { request_id: String, attempts: u32 },

    /// No pending record for the request.
    #[error("No pending request {0}")]
    UnknownRequest(String),

    /// Scheduler constructed outside a Tokio runtime.
    #[error("No Tokio runtime available for redelivery timers")]
    NoRuntime,
}
