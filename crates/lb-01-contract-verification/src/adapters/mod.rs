//! Adapters for Contract Verification
//!
//! - `registry`: contract factory backed by registered constructors
//! - `cpk`: in-memory code package resolver

pub mod cpk;
pub mod registry;

pub use cpk::InMemoryCpkResolver;
pub use registry::ContractRegistry;
