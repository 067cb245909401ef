//! Permanently disconnected servo driver.
//!
//! The `DetachedServo` reports `is_connected() == false` forever and
//! rejects every move. It stands in for an unplugged arm so the
//! cannot-start and disconnect rejection paths can be exercised end to
//! end, from the CLI down.

use dip_common::actuator::{
    ActuatorError, ActuatorPort, CommandHandle, DriverSetup, MoveCommand,
};
use tracing::info;

/// Actuator driver that is never connected.
pub struct DetachedServo;

impl ActuatorPort for DetachedServo {
    fn name(&self) -> &'static str {
        "detached"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&mut self, _setup: DriverSetup) -> Result<(), ActuatorError> {
        info!("Initializing detached servo (will never connect)");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn move_to(&mut self, _command: MoveCommand) -> Result<CommandHandle, ActuatorError> {
        Err(ActuatorError::NotConnected)
    }

    fn disengage(&mut self) -> Result<(), ActuatorError> {
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), ActuatorError> {
        Ok(())
    }
}

/// Factory function for the driver registry.
pub fn create_driver() -> Box<dyn ActuatorPort> {
    Box::new(DetachedServo)
}
