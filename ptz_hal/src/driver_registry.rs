//! Driver registry for motor drivers.
//!
//! Maps driver names to factories. Constructed at startup and passed by
//! value; there is no global registry.

use ptz_common::hal::config::PtzConfig;
use ptz_common::hal::driver::{DriverFactory, HalError, MotorDriver};
use std::collections::HashMap;

/// Registry of available motor drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Create a driver instance by name.
    ///
    /// # Errors
    /// Returns `HalError::DriverNotFound` if no driver with the given name is registered.
    pub fn create_driver(
        &self,
        name: &str,
        config: &PtzConfig,
    ) -> Result<Box<dyn MotorDriver>, HalError> {
        let factory = self
            .factories
            .get(name)
            .copied()
            .ok_or_else(|| HalError::DriverNotFound(name.to_string()))?;
        Ok(factory(config))
    }

    /// List all registered driver names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{builtin_registry, simulation};

    #[test]
    fn builtin_drivers_are_registered() {
        let registry = builtin_registry();
        let mut names = registry.list_drivers();
        names.sort();
        assert_eq!(names, vec!["kernel", "simulation"]);

        let driver = registry
            .create_driver("simulation", &PtzConfig::default())
            .expect("should create");
        assert_eq!(driver.name(), "simulation");
    }

    #[test]
    fn registry_driver_not_found() {
        let registry = DriverRegistry::new();
        let result = registry.create_driver("ethercat", &PtzConfig::default());
        assert!(matches!(result, Err(HalError::DriverNotFound(_))));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut registry = DriverRegistry::new();
        registry.register("dup", simulation::create_driver);
        registry.register("dup", simulation::create_driver);
    }
}
