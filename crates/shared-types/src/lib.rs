//! # Shared Types Crate
//!
//! This crate contains the ledger entities shared by the backchain
//! subsystems (contract verification, backchain resolution, verification
//! redelivery).
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Content Addressing**: A `TransactionId` is derived from the
//!   transaction content and is never assigned by a peer.
//! - **Two Shapes of a Transaction**: `SignedTransaction` travels and is
//!   stored; `LedgerTransaction` is the materialized view contracts verify.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
