//! # Contract Verification Subsystem
//!
//! **Subsystem ID:** 1
//!
//! ## Purpose
//!
//! Executes the contracts governing a fully materialized transaction and
//! reports a structured pass/fail result with failure attribution.
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement |
//! |-----------|-------------|
//! | Every governing contract runs, failures are aggregated | `service.rs` |
//! | Status is `Invalid` iff at least one failure was recorded | `domain/entities.rs` |
//! | Contract panics never escape the verifier | `service.rs` (`catch_unwind`) |
//! | Encumbered inputs are consumed together | `algorithms/encumbrance.rs` |
//!
//! ## Module Structure
//!
//! ```text
//! ipc/       - VerifyContractsRequest handling, error categorisation
//! service.rs - ContractVerifier (ContractVerificationApi)
//! adapters/  - ContractRegistry (ContractFactory), InMemoryCpkResolver
//! ports/     - ContractVerificationApi, Contract, ContractFactory, CpkResolver
//! domain/    - results, failure records, errors
//! ```

pub mod adapters;
pub mod algorithms;
pub mod config;
pub mod domain;
pub mod ipc;
pub mod ports;
pub mod service;

pub use adapters::{ContractRegistry, InMemoryCpkResolver};
pub use config::VerificationConfig;
pub use domain::*;
pub use ipc::{
    VerificationRequestHandler, VerifyContractsOutcome, VerifyContractsRequest,
    VerifyContractsResponse,
};
pub use ports::*;
pub use service::ContractVerifier;
