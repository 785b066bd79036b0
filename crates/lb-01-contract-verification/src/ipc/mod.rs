//! # IPC Layer - Contract Verification
//!
//! Verification requests arrive as serialized payloads (directly or through
//! redelivery). Errors that prevent a result are categorised so the caller
//! knows whether to retry.

pub mod handler;
pub mod payloads;

pub use handler::*;
pub use payloads::*;
