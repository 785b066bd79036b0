//! # Backchain Test Suite
//!
//! Unified test crate for cross-subsystem behaviour.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (sort, resolution)
//! └── src/
//!     └── integration/  # Cross-subsystem flows
//!         ├── backchain_flows.rs          # two nodes resolving over a session
//!         └── redelivery_choreography.rs  # bus-driven verification redelivery
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p lb-tests
//!
//! # By flow
//! cargo test -p lb-tests integration::backchain_flows
//! cargo test -p lb-tests integration::redelivery_choreography
//!
//! # Benchmarks
//! cargo bench -p lb-tests
//! ```

pub mod integration;
