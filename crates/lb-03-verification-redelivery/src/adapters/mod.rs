//! Adapters for Verification Redelivery

pub mod clock;

pub use clock::{SystemClock, TokioClock};
