//! Ports module for Contract Verification
//!
//! Defines inbound (API) and outbound (SPI) port traits.

pub mod inbound;
pub mod outbound;

pub use inbound::ContractVerificationApi;
pub use outbound::{Contract, ContractFactory, CpkAvailability, CpkResolver};
