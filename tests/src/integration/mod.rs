//! Cross-subsystem integration flows.

pub mod backchain_flows;
pub mod redelivery_choreography;
