//! Ports module for Verification Redelivery

pub mod outbound;

pub use outbound::Clock;
