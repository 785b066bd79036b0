//! In-memory code package resolver.

use crate::ports::outbound::{CpkAvailability, CpkResolver};
use parking_lot::RwLock;
use shared_types::entities::Hash;
use std::collections::HashMap;

/// Resolver over a mutable table of code package checksums.
///
/// Unknown checksums are reported as `Pending`: the package may still be
/// distributed to this node.
#[derive(Debug, Default)]
pub struct InMemoryCpkResolver {
    packages: RwLock<HashMap<Hash, CpkAvailability>>,
}

impl InMemoryCpkResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, checksum: Hash) {
        self.packages
            .write()
            .insert(checksum, CpkAvailability::Available);
    }

    pub fn disallow(&self, checksum: Hash) {
        self.packages
            .write()
            .insert(checksum, CpkAvailability::Disallowed);
    }
}

impl CpkResolver for InMemoryCpkResolver {
    fn availability(&self, checksum: &Hash) -> CpkAvailability {
        self.packages
            .read()
            .get(checksum)
            .copied()
            .unwrap_or(CpkAvailability::Pending)
    }
}
