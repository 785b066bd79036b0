//! Contract verification configuration.

use serde::{Deserialize, Serialize};

/// Contract verifier configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Convert contract panics into failure records instead of unwinding
    /// through the caller.
    pub catch_panics: bool,
    /// Run the encumbrance check before the contracts.
    pub check_encumbrances: bool,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            catch_panics: true,
            check_encumbrances: true,
        }
    }
}

impl VerificationConfig {
    /// Testing config
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self::default()
    }
}
