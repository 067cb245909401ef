//! Prelude module for common re-exports.
//!
//! This module provides convenient re-exports of commonly used types
//! so that consumers can do `use dip_common::prelude::*;` and get
//! the most important types without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use dip_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, DipConfig, DriverSettings, SharedConfig};

// ─── Arm Profile & Cycle Parameters ─────────────────────────────────
pub use crate::profile::{ArmProfile, CycleParams};

// ─── Actuator Port ──────────────────────────────────────────────────
pub use crate::actuator::{
    ActuatorError, ActuatorPort, ArrivalEvent, ArrivalSender, CommandHandle, DriverFactory,
    DriverSetup, MoveCommand,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_CONFIG_PATH, DEFAULT_TICK_MS, DEFAULT_TICK_PERIOD};
