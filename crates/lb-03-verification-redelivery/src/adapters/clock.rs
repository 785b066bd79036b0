//! Clock adapters.

use crate::ports::outbound::Clock;
use std::time::{SystemTime, UNIX_EPOCH};

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock driven by Tokio's time source, so it follows paused and advanced
/// time in tests.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
    origin_millis: u64,
}

impl TokioClock {
    /// Clock reading `origin_millis` now.
    pub fn starting_at(origin_millis: u64) -> Self {
        Self {
            origin: tokio::time::Instant::now(),
            origin_millis,
        }
    }
}

impl Clock for TokioClock {
    fn now_millis(&self) -> u64 {
        self.origin_millis + self.origin.elapsed().as_millis() as u64
    }
}
