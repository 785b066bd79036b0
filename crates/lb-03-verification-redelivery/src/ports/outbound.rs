//! Outbound ports (SPI) for Verification Redelivery.

/// Wall clock in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}
