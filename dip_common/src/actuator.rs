//! Actuator port trait and error types.
//!
//! This module defines:
//! - `ActuatorPort` trait - Interface for pluggable actuator drivers
//! - `ActuatorError` enum - Error types for actuator operations
//! - `MoveCommand` / `CommandHandle` / `ArrivalEvent` - The asynchronous
//!   move protocol between controller and driver
//! - `DriverSetup` struct - Pre-loop driver initialization data
//! - `DriverFactory` type alias - Factory function type

use crate::config::DriverSettings;
use std::sync::mpsc;
use thiserror::Error;

/// Error types for actuator operations.
#[derive(Debug, Clone, Error)]
pub enum ActuatorError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Driver used before `init` completed
    #[error("Driver not initialized")]
    NotInitialized,

    /// Actuator is not connected
    #[error("Actuator not connected")]
    NotConnected,

    /// Driver refused the move command
    #[error("Move rejected: {0}")]
    MoveRejected(String),

    /// Driver not found in the registry
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Driver shutdown failed
    #[error("Shutdown failed: {0}")]
    ShutdownFailed(String),
}

/// A requested move, tagged with the controller's generation counter.
///
/// The generation travels with the command through the driver and comes
/// back in the matching [`ArrivalEvent`], letting the controller discard
/// arrivals for superseded commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveCommand {
    /// Requested position.
    pub position: f64,
    /// Controller-assigned, monotonically increasing command id.
    pub generation: u64,
}

/// Receipt for an accepted move command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHandle {
    /// Generation of the accepted command.
    pub generation: u64,
}

/// Asynchronous arrival notification emitted by a driver.
///
/// Sent from the driver's own execution context once the actuator settles
/// on a commanded position. `position` is the position the driver
/// observed, not necessarily the exact commanded value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrivalEvent {
    /// Observed position at arrival.
    pub position: f64,
    /// Generation of the command this arrival answers.
    pub generation: u64,
}

/// Channel end a driver uses to announce arrivals.
pub type ArrivalSender = mpsc::Sender<ArrivalEvent>;

/// Everything a driver needs before the control loop starts.
#[derive(Debug, Clone)]
pub struct DriverSetup {
    /// Where the driver sends [`ArrivalEvent`]s.
    pub events: ArrivalSender,
    /// Position the actuator is assumed parked at.
    pub initial_position: f64,
    /// Driver settings from the `[driver]` config table.
    pub settings: DriverSettings,
}

/// Factory function type for creating actuator port instances.
pub type DriverFactory = fn() -> Box<dyn ActuatorPort>;

/// Trait defining the interface for actuator drivers.
///
/// The controller manages drivers through this trait, enabling pluggable
/// actuator backends (simulation, serial servo, etc.).
///
/// # Lifecycle
///
/// 1. `init()` - Called once before the tick loop starts
/// 2. `move_to()` / `disengage()` / `is_connected()` - Called from the
///    tick loop
/// 3. `shutdown()` - Called when the controller is stopping
///
/// # Contract
///
/// - `move_to` must not block and must not wait for arrival; it hands the
///   target to the actuator and returns. Arrival is reported later via
///   the [`ArrivalSender`] given in [`DriverSetup`], possibly from a
///   different thread.
/// - A successful `move_to` engages the actuator; `disengage` releases it.
/// - Position bounds are the caller's responsibility, not the driver's.
pub trait ActuatorPort: Send + Sync {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Initialize the driver.
    ///
    /// Called once before the tick loop. May block for hardware
    /// initialization.
    ///
    /// # Errors
    /// Return `ActuatorError::InitFailed` if initialization cannot
    /// complete.
    fn init(&mut self, setup: DriverSetup) -> Result<(), ActuatorError>;

    /// Whether the actuator is currently reachable.
    ///
    /// Polled every tick; must be cheap and non-blocking.
    fn is_connected(&self) -> bool;

    /// Hand a move command to the actuator.
    ///
    /// # Errors
    /// - `ActuatorError::NotInitialized` before `init`
    /// - `ActuatorError::NotConnected` while disconnected
    /// - `ActuatorError::MoveRejected` if the driver refuses the command
    fn move_to(&mut self, command: MoveCommand) -> Result<CommandHandle, ActuatorError>;

    /// Stop holding or moving; the actuator goes limp at its current
    /// position. Pending arrivals for earlier commands may still be
    /// delivered.
    fn disengage(&mut self) -> Result<(), ActuatorError>;

    /// Graceful shutdown of the driver.
    ///
    /// Should release resources and stop any background threads within
    /// one second.
    fn shutdown(&mut self) -> Result<(), ActuatorError>;
}
