//! Domain module for Contract Verification
//!
//! Contains verification results, failure records and error types.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
