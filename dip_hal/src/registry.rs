//! Driver registry for actuator drivers.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving
//! actuator driver factories. This uses constructor-injection rather than
//! global state.

use dip_common::actuator::{ActuatorError, ActuatorPort, DriverFactory};
use std::collections::HashMap;

/// Registry of available actuator drivers.
///
/// Constructed at startup, populated via `register()`, and handed to
/// the application binary.
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

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Create a driver instance by name.
    ///
    /// # Errors
    /// Returns `ActuatorError::DriverNotFound` if no driver with the given
    /// name is registered.
    pub fn create_driver(&self, name: &str) -> Result<Box<dyn ActuatorPort>, ActuatorError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| ActuatorError::DriverNotFound(name.to_string()))?;
        Ok(factory())
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
