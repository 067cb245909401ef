//! # Dip Controller HAL Library
//!
//! Actuator driver layer with pluggable driver architecture.
//!
//! Drivers implement the `ActuatorPort` trait defined in
//! `dip_common::actuator` and announce arrivals asynchronously through the
//! channel handed over at `init`.
//!
//! # Module Structure
//!
//! - [`registry`] - Driver factory registration
//! - [`drivers`] - Actuator driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    dip_hal (single crate)                  │
//! │  ┌──────────────────┐        ┌─────────────────────────┐   │
//! │  │  DriverRegistry  │───────►│  ActuatorPort (trait    │   │
//! │  │  (factories)     │        │  object, per driver)    │   │
//! │  └──────────────────┘        └───────────┬─────────────┘   │
//! │                                          │ ArrivalEvent    │
//! │                                          ▼                 │
//! │                              mpsc channel to controller    │
//! └────────────────────────────────────────────────────────────┘
//! ```

#![deny(warnings)]
#![deny(missing_docs)]

pub mod drivers;
pub mod registry;

// Re-export key types for convenience
pub use crate::drivers::detached::DetachedServo;
pub use crate::drivers::sim::SimServo;
pub use crate::registry::DriverRegistry;
