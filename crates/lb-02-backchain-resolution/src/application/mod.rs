//! Application layer: the receiver and the resolution service.

pub mod receiver;
pub mod service;


pub use receiver::BackchainReceiver;
pub use service::BackchainResolutionService;
