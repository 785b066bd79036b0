//! Application layer for Verification Redelivery

pub mod scheduler;
pub mod tracker;

pub use scheduler::RedeliveryScheduler;
pub use tracker::PendingRequestTracker;
