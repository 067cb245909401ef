//! Dip Controller Common Library
//!
//! This crate provides the shared contracts for the dip-coating controller
//! workspace: configuration loading, the arm position profile, and the
//! actuator port abstraction implemented by the driver crate.
//!
//! # Module Structure
//!
//! - [`actuator`] - Actuator port trait, move commands and arrival events
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - System-wide constants
//! - [`profile`] - Arm position profile and cycle parameters
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use dip_common::prelude::*;
//! ```

pub mod actuator;
pub mod config;
pub mod consts;
pub mod prelude;
pub mod profile;
