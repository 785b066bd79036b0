//! # Shared Bus
//!
//! In-process event bus connecting the backchain subsystems. Subsystems
//! publish `LedgerEvent`s through `EventPublisher` and subscribe by topic:
//!
//! | Topic | Published by | Consumed by |
//! |-------|--------------|-------------|
//! | `ContractVerification` | callers, lb-01 | lb-01, lb-03 |
//! | `BackchainResolution` | lb-02 | hosts, monitoring |
//! | `Redelivery` | lb-03 | lb-01, lb-03 |
//!
//! Delivery is broadcast: every live subscription sees every event and its
//! filter decides what surfaces. Slow subscribers drop the oldest events
//! once `DEFAULT_CHANNEL_CAPACITY` are buffered.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, LedgerEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Events buffered per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
