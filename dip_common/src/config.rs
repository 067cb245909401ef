//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! across the dip controller applications, plus the application config
//! ([`DipConfig`]) with its `[arm]`, `[cycle]`, `[runner]` and `[driver]`
//! tables.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dip_common::config::{ConfigLoader, DipConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = DipConfig::load(Path::new("configs/dip.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::consts::DEFAULT_TICK_MS;
use crate::profile::{ArmProfile, CycleParams};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

/// Common configuration fields shared across the dip controller
/// applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "dip-controller-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default function for tick_ms
fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

/// Default function for driver kind
fn default_driver_kind() -> String {
    "simulation".to_string()
}

/// Default function for max_velocity
fn default_max_velocity() -> f64 {
    40.0
}

/// Default function for update_ms
fn default_update_ms() -> u64 {
    5
}

/// Default function for arrival_window
fn default_arrival_window() -> f64 {
    0.1
}

/// Tick loop configuration (`[runner]` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Controller tick period in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

impl RunnerConfig {
    /// Validate the runner configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::ValidationError(
                "runner.tick_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Actuator driver configuration (`[driver]` table).
///
/// `kind` selects the driver from the registry; the remaining fields are
/// consumed by the simulation driver and ignored by drivers that have no
/// use for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverSettings {
    /// Registered driver name.
    #[serde(default = "default_driver_kind")]
    pub kind: String,

    /// Maximum actuator velocity in position units per second.
    #[serde(default = "default_max_velocity")]
    pub max_velocity: f64,

    /// Simulation update thread step in milliseconds.
    #[serde(default = "default_update_ms")]
    pub update_ms: u64,

    /// Driver-side in-position window for arrival reporting.
    /// Must be tighter than the controller's settle tolerance.
    #[serde(default = "default_arrival_window")]
    pub arrival_window: f64,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            kind: default_driver_kind(),
            max_velocity: default_max_velocity(),
            update_ms: default_update_ms(),
            arrival_window: default_arrival_window(),
        }
    }
}

impl DriverSettings {
    /// Validate the driver settings against the arm profile.
    ///
    /// # Validation Rules
    /// 1. `kind` is not empty
    /// 2. `max_velocity` > 0 and finite
    /// 3. `update_ms` > 0
    /// 4. `arrival_window` > 0 and strictly below the profile's settle
    ///    tolerance, so every driver-reported arrival passes the
    ///    controller's own tolerance check
    pub fn validate(&self, profile: &ArmProfile) -> Result<(), ConfigError> {
        if self.kind.is_empty() {
            return Err(ConfigError::ValidationError(
                "driver.kind cannot be empty".to_string(),
            ));
        }
        if !(self.max_velocity.is_finite() && self.max_velocity > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "driver.max_velocity must be positive, got {}",
                self.max_velocity
            )));
        }
        if self.update_ms == 0 {
            return Err(ConfigError::ValidationError(
                "driver.update_ms must be greater than 0".to_string(),
            ));
        }
        if !(self.arrival_window.is_finite() && self.arrival_window > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "driver.arrival_window must be positive, got {}",
                self.arrival_window
            )));
        }
        if self.arrival_window >= profile.settle_tolerance {
            return Err(ConfigError::ValidationError(format!(
                "driver.arrival_window ({}) must be below arm.settle_tolerance ({})",
                self.arrival_window, profile.settle_tolerance
            )));
        }
        Ok(())
    }
}

/// Main application configuration loaded from `dip.toml`.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "dip-controller-01"
///
/// [arm]
/// down = 35.0
/// up = 72.0
///
/// [cycle]
/// num_cycles = 5
/// seconds_down = 30.0
/// minutes_up = 1.0
///
/// [runner]
/// tick_ms = 250
///
/// [driver]
/// kind = "simulation"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DipConfig {
    /// Shared service fields.
    pub shared: SharedConfig,

    /// Arm position profile.
    #[serde(default)]
    pub arm: ArmProfile,

    /// Default cycle parameters, overridable from the CLI.
    #[serde(default)]
    pub cycle: CycleParams,

    /// Tick loop settings.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Actuator driver selection and settings.
    #[serde(default)]
    pub driver: DriverSettings,
}

impl DipConfig {
    /// Validate every section of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.arm.validate()?;
        self.cycle.validate()?;
        self.runner.validate()?;
        self.driver.validate(&self.arm)?;
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// This trait provides a default implementation that works with any type
/// implementing `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
/// - Returns `ConfigError::ValidationError` if semantic validation fails
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - Successfully loaded and parsed configuration
    /// * `Err(ConfigError)` - Loading or parsing failed
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
// This allows any serde-deserializable struct to use ConfigLoader.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_deserialization() {
        // Test deserialization within a struct (TOML requires a table)
        #[derive(Debug, Deserialize, PartialEq)]
        struct TestWrapper {
            level: LogLevel,
        }

        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"trace\"")
                .unwrap()
                .level,
            LogLevel::Trace
        );
        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"debug\"")
                .unwrap()
                .level,
            LogLevel::Debug
        );
        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"warn\"")
                .unwrap()
                .level,
            LogLevel::Warn
        );
    }

    #[test]
    fn test_shared_config_validation_empty_service_name() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: "".to_string(),
        };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_config_loader_file_not_found() {
        let result = DipConfig::load(Path::new("/nonexistent/path/dip.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_config_loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();

        let result = DipConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_dip_config_minimal_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[shared]
service_name = "dip-test"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = DipConfig::load(file.path()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.shared.log_level, LogLevel::Info); // Default
        assert_eq!(config.runner.tick_ms, DEFAULT_TICK_MS);
        assert_eq!(config.driver.kind, "simulation");
        assert_eq!(config.cycle.num_cycles, 5);
        assert_eq!(config.arm.up, 72.0);
        assert_eq!(config.arm.down, 35.0);
    }

    #[test]
    fn test_dip_config_full_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[shared]
log_level = "debug"
service_name = "dip-test"

[arm]
min = 10.0
max = 100.0
down = 20.0
up = 80.0
retract = 95.0

[cycle]
num_cycles = 3
seconds_down = 12.5
minutes_up = 0.5

[runner]
tick_ms = 100

[driver]
kind = "simulation"
max_velocity = 60.0
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = DipConfig::load(file.path()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.shared.log_level, LogLevel::Debug);
        assert_eq!(config.arm.retract, 95.0);
        assert_eq!(config.cycle.num_cycles, 3);
        assert_eq!(config.cycle.seconds_down, 12.5);
        assert_eq!(config.runner.tick_ms, 100);
        assert_eq!(config.driver.max_velocity, 60.0);
        // update_ms not given, falls back
        assert_eq!(config.driver.update_ms, 5);
    }

    #[test]
    fn test_runner_config_rejects_zero_tick() {
        let runner = RunnerConfig { tick_ms: 0 };
        assert!(matches!(
            runner.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_driver_settings_rejects_wide_arrival_window() {
        let profile = ArmProfile::default();
        let settings = DriverSettings {
            // settle_tolerance defaults to 0.5; a window of 0.5 would let
            // the driver report arrivals the controller then ignores
            arrival_window: 0.5,
            ..DriverSettings::default()
        };
        assert!(matches!(
            settings.validate(&profile),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_driver_settings_rejects_bad_velocity() {
        let profile = ArmProfile::default();
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let settings = DriverSettings {
                max_velocity: bad,
                ..DriverSettings::default()
            };
            assert!(settings.validate(&profile).is_err(), "velocity {bad}");
        }
    }
}
