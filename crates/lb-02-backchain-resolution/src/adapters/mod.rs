//! Adapters for Backchain Resolution
//!
//! - `memory_store`: in-memory transaction and group parameter storage
//! - `channel_session`: in-process peer sessions
//! - `contract_verifier`: `TransactionVerifier` backed by the contract verifier

pub mod channel_session;
pub mod contract_verifier;
pub mod memory_store;

pub use channel_session::{
    channel_session_pair, ChannelRequesterSession, ChannelResponderSession,
    DEFAULT_SESSION_CAPACITY,
};
pub use contract_verifier::ContractTransactionVerifier;
pub use memory_store::InMemoryLedgerStore;
