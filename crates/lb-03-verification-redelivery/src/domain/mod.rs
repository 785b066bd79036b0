//! Domain module for Verification Redelivery

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
