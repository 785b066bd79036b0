//! Domain module for Backchain Resolution
//!
//! Contains the retrieval frontier, resolution results and error types.

pub mod entities;
pub mod errors;
pub mod frontier;

pub use entities::*;
pub use errors::*;
pub use frontier::Frontier;
