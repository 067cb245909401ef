//! Actuator driver implementations.
//!
//! This module contains all actuator driver implementations:
//!
//! - [`sim`] - Software simulation servo for development and testing
//! - [`detached`] - Permanently disconnected servo for exercising the
//!   rejection paths
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `ActuatorPort` trait from `dip_common::actuator`
//! 3. Register the driver in [`register_builtin`]
//! 4. Add export and documentation

pub mod detached;
pub mod sim;

use crate::registry::DriverRegistry;

/// Register all built-in drivers into the given registry.
///
/// Called once at startup before any drivers are requested.
pub fn register_builtin(registry: &mut DriverRegistry) {
    registry.register("simulation", sim::create_driver);
    registry.register("detached", detached::create_driver);

    // Future drivers will be registered here:
    // registry.register("serial", serial::create_driver);
}
