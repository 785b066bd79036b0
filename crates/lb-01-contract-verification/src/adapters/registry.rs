//! Contract registry.
//!
//! Maps contract class identifiers to constructors. Contracts are created
//! fresh for every verification call.

use crate::domain::errors::ContractViolation;
use crate::ports::outbound::{Contract, ContractFactory};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

type Constructor = Arc<dyn Fn() -> Box<dyn Contract> + Send + Sync>;

/// Error kind reported when a contract class has no registered constructor.
pub const CONTRACT_NOT_FOUND: &str = "ContractNotFound";

/// `ContractFactory` backed by a table of registered constructors.
#[derive(Default)]
pub struct ContractRegistry {
    constructors: RwLock<HashMap<String, Constructor>>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `C` under `contract_class`, built with `C::default()`.
    pub fn register<C>(&self, contract_class: impl Into<String>)
    where
        C: Contract + Default + 'static,
    {
        self.register_factory(contract_class, || Box::new(C::default()));
    }

    /// Register a custom constructor under `contract_class`.
    ///
    /// A later registration for the same class replaces the earlier one.
    pub fn register_factory<F>(&self, contract_class: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn Contract> + Send + Sync + 'static,
    {
        self.constructors
            .write()
            .insert(contract_class.into(), Arc::new(constructor));
    }

    /// Builder-style registration.
    #[must_use]
    pub fn with<C>(self, contract_class: impl Into<String>) -> Self
    where
        C: Contract + Default + 'static,
    {
        self.register::<C>(contract_class);
        self
    }

    pub fn contains(&self, contract_class: &str) -> bool {
        self.constructors.read().contains_key(contract_class)
    }

    pub fn len(&self) -> usize {
        self.constructors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.read().is_empty()
    }
}

impl ContractFactory for ContractRegistry {
    fn create(&self, contract_class: &str) -> Result<Box<dyn Contract>, ContractViolation> {
        // Clone the constructor out so user code never runs under the lock.
        let constructor = self.constructors.read().get(contract_class).cloned();
        match constructor {
            Some(constructor) => Ok(constructor()),
            None => Err(ContractViolation::new(
                CONTRACT_NOT_FOUND,
                format!("No contract registered for class {contract_class}"),
            )),
        }
    }
}
