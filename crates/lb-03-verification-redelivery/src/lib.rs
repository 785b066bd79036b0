//! # Verification Redelivery Subsystem
//!
//! **Subsystem ID:** 3
//!
//! ## Purpose
//!
//! Contract verification requests travel over the event bus. A request that
//! is not acknowledged with `VerificationCompleted` within the expiry window
//! is published again as `VerificationRedelivery`, up to a bounded number of
//! attempts.
//!
//! ## Timers
//!
//! | Event | Effect |
//! |-------|--------|
//! | `on_record_updated` | cancel the key's timer, arm a new one (past-due fires at once) |
//! | `on_record_removed` | cancel the key's timer |
//! | `on_partitions_revoked` | cancel every timer of those partitions |
//! | `on_partitions_assigned` | arm timers for the newly owned records |
//!
//! Cancellation is best-effort: a timer that has already fired may deliver
//! once more.
//!
//! ## Module Structure
//!
//! ```text
//! application/ - RedeliveryScheduler, PendingRequestTracker
//! adapters/    - SystemClock, TokioClock
//! ports/       - Clock
//! domain/      - RedeliveryEntry, partition assignment, errors
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::{SystemClock, TokioClock};
pub use application::{PendingRequestTracker, RedeliveryScheduler};
pub use config::RedeliveryConfig;
pub use domain::{partition_for, PartitionId, RedeliveryEntry, RedeliveryError};
pub use ports::Clock;
