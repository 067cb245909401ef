//! # Dip Control Library
//!
//! Cycle-automation brain for the dip-coating arm. A fixed-period tick
//! loop drains actuator arrival events, advances the run phase machine,
//! and issues bounds-checked moves through the actuator port.
//!
//! ## Architecture
//!
//! 1. **RunPhase** (`state`) - automation phases with tagged transit legs
//! 2. **CycleController** (`controller`) - single owner of run and actuator state
//! 3. **TickRunner** (`runner`) - fixed-period loop with timing statistics
//! 4. **Status rendering** (`status`) - pure formatting of the operator line

#![deny(clippy::disallowed_types)]

pub mod command;
pub mod controller;
pub mod error;
pub mod runner;
pub mod state;
pub mod status;
