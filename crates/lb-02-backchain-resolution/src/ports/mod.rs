//! Ports module for Backchain Resolution
//!
//! Defines inbound (API) and outbound (SPI) port traits.

pub mod inbound;
pub mod outbound;

pub use inbound::BackchainResolutionApi;
pub use outbound::{
    GroupParametersStore, RequesterSession, ResponderSession, TransactionStore,
    TransactionVerifier,
};
