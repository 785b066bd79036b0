//! Backchain request protocol: wire messages and the responder side.

pub mod messages;
pub mod responder;

pub use messages::{BackchainRequest, BackchainResponse};
pub use responder::BackchainResponder;
