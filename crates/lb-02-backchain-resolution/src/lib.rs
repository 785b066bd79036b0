//! # Backchain Resolution Subsystem
//!
//! **Subsystem ID:** 2
//!
//! ## Purpose
//!
//! Before a transaction can be accepted, its backchain (the transitive
//! closure of the transactions its inputs and references come from) must be
//! stored and verified locally. This crate retrieves the missing part of the
//! backchain from the peer that proposed the transaction, orders it and has
//! every retrieved transaction verified, dependencies first.
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement |
//! |-----------|-------------|
//! | Nothing locally known invalid is ever accepted as an ancestor | `application/receiver.rs` (reconciliation) |
//! | Only requested transactions are accepted from the peer | `application/receiver.rs` (`process_batch`) |
//! | Each `Get` names at most `batch_size` ids | `application/receiver.rs` |
//! | Dependencies are verified before their dependents | `algorithms/topological_sort.rs` |
//! | Verified transactions are never re-fetched | `application/receiver.rs` (`enqueue`) |
//!
//! ## Message Flow
//!
//! ```text
//! requester                                   responder
//!    │  Get([A, B])                               │
//!    │ ─────────────────────────────────────────→ │
//!    │  Transaction(A), Transaction(B), EndOfBatch│
//!    │ ←───────────────────────────────────────── │
//!    │  GetSignedGroupParameters(h)   (V2 only)   │
//!    │ ─────────────────────────────────────────→ │
//!    │  GroupParameters(p)                        │
//!    │ ←───────────────────────────────────────── │
//!    │  Stop                                      │
//!    │ ─────────────────────────────────────────→ │
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! application/ - BackchainResolutionService (orchestrator), BackchainReceiver
//! protocol/    - wire messages, BackchainResponder
//! algorithms/  - TopologicalSort
//! ports/       - storage, session and verifier traits
//! adapters/    - in-memory store, channel sessions, contract verifier adapter
//! domain/      - frontier, outcomes, errors
//! ```

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod protocol;

/// Scripted peers, recording verifier and fixtures.
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::{
    channel_session_pair, ChannelRequesterSession, ChannelResponderSession,
    ContractTransactionVerifier, InMemoryLedgerStore, DEFAULT_SESSION_CAPACITY,
};
pub use algorithms::TopologicalSort;
pub use application::{BackchainReceiver, BackchainResolutionService};
pub use config::{ProtocolVersion, ResolutionConfig};
pub use domain::{Frontier, ResolutionError, ResolutionOutcome, ResponderSummary, SessionError};
pub use ports::*;
pub use protocol::{BackchainRequest, BackchainResponder, BackchainResponse};
