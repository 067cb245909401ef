//! Arm position profile and cycle parameters.
//!
//! The profile defines the positions the controller is allowed to command
//! (`[arm]` table) and the per-run cycle parameters (`[cycle]` table).
//! Positions are actuator angles in degrees. All values are configurable;
//! the defaults match the production dip-coating rig.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Default function for the lower travel bound
fn default_min() -> f64 {
    32.0
}

/// Default function for the upper travel bound
fn default_max() -> f64 {
    90.0
}

/// Default function for the immersion position
fn default_down() -> f64 {
    35.0
}

/// Default function for the raised position
fn default_up() -> f64 {
    72.0
}

/// Default function for the retracted position
fn default_retract() -> f64 {
    89.0
}

/// Default function for settle_tolerance
fn default_settle_tolerance() -> f64 {
    0.5
}

/// Default function for jog_step
fn default_jog_step() -> f64 {
    1.0
}

/// Default true helper
fn default_true() -> bool {
    true
}

/// The recognized arm positions and the travel bounds they must satisfy.
///
/// # TOML Example
///
/// ```toml
/// [arm]
/// min = 32.0
/// max = 90.0
/// down = 35.0
/// up = 72.0
/// retract = 89.0
/// settle_tolerance = 0.5
/// jog_step = 1.0
/// exclusive_bounds = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmProfile {
    /// Lower travel bound.
    #[serde(default = "default_min")]
    pub min: f64,

    /// Upper travel bound.
    #[serde(default = "default_max")]
    pub max: f64,

    /// Immersion (down) position.
    #[serde(default = "default_down")]
    pub down: f64,

    /// Raised (up) position.
    #[serde(default = "default_up")]
    pub up: f64,

    /// Fully retracted parking position.
    #[serde(default = "default_retract")]
    pub retract: f64,

    /// Midpoint target the arm is parked at before the first command.
    /// Computed from `up` and `down` when omitted.
    #[serde(default)]
    pub mid: Option<f64>,

    /// Distance within which a reported position counts as arrived.
    #[serde(default = "default_settle_tolerance")]
    pub settle_tolerance: f64,

    /// Manual jog increment.
    #[serde(default = "default_jog_step")]
    pub jog_step: f64,

    /// When true (the default) a position must satisfy `min < p < max`;
    /// when false the bounds themselves are permitted.
    #[serde(default = "default_true")]
    pub exclusive_bounds: bool,
}

impl Default for ArmProfile {
    fn default() -> Self {
        Self {
            min: default_min(),
            max: default_max(),
            down: default_down(),
            up: default_up(),
            retract: default_retract(),
            mid: None,
            settle_tolerance: default_settle_tolerance(),
            jog_step: default_jog_step(),
            exclusive_bounds: default_true(),
        }
    }
}

impl ArmProfile {
    /// Whether `position` may be commanded under this profile.
    ///
    /// Non-finite values are never permitted.
    pub fn permits(&self, position: f64) -> bool {
        if !position.is_finite() {
            return false;
        }
        if self.exclusive_bounds {
            self.min < position && position < self.max
        } else {
            self.min <= position && position <= self.max
        }
    }

    /// Midpoint parking position: the configured `mid`, or
    /// `(up + down + 1) / 2` when omitted.
    pub fn mid_position(&self) -> f64 {
        match self.mid {
            Some(m) => m,
            None => (self.up + self.down + 1.0) / 2.0,
        }
    }

    /// Validate the profile.
    ///
    /// # Validation Rules
    /// 1. All values finite
    /// 2. `min` < `max`
    /// 3. `settle_tolerance` > 0, `jog_step` > 0
    /// 4. `down` < `up`, separated by more than twice the settle
    ///    tolerance so an arrival can never match both positions
    /// 5. `down`, `up`, `retract` and the midpoint each pass `permits`
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("arm.min", self.min),
            ("arm.max", self.max),
            ("arm.down", self.down),
            ("arm.up", self.up),
            ("arm.retract", self.retract),
            ("arm.mid", self.mid_position()),
            ("arm.settle_tolerance", self.settle_tolerance),
            ("arm.jog_step", self.jog_step),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }

        if self.min >= self.max {
            return Err(ConfigError::ValidationError(format!(
                "arm.min ({}) must be below arm.max ({})",
                self.min, self.max
            )));
        }
        if self.settle_tolerance <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "arm.settle_tolerance must be positive, got {}",
                self.settle_tolerance
            )));
        }
        if self.jog_step <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "arm.jog_step must be positive, got {}",
                self.jog_step
            )));
        }
        if self.down >= self.up {
            return Err(ConfigError::ValidationError(format!(
                "arm.down ({}) must be below arm.up ({})",
                self.down, self.up
            )));
        }
        if self.up - self.down <= 2.0 * self.settle_tolerance {
            return Err(ConfigError::ValidationError(format!(
                "arm.up ({}) and arm.down ({}) are closer than twice the settle tolerance ({})",
                self.up, self.down, self.settle_tolerance
            )));
        }

        let positions = [
            ("arm.down", self.down),
            ("arm.up", self.up),
            ("arm.retract", self.retract),
            ("arm.mid", self.mid_position()),
        ];
        for (name, position) in positions {
            if !self.permits(position) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} ({position}) is outside the permitted range ({}, {})",
                    self.min, self.max
                )));
            }
        }

        Ok(())
    }
}

/// Default function for num_cycles
fn default_num_cycles() -> u32 {
    5
}

/// Default function for seconds_down
fn default_seconds_down() -> f64 {
    30.0
}

/// Default function for minutes_up
fn default_minutes_up() -> f64 {
    1.0
}

/// Immutable per-run cycle parameters, captured once at start.
///
/// # TOML Example
///
/// ```toml
/// [cycle]
/// num_cycles = 5
/// seconds_down = 30.0
/// minutes_up = 1.0
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleParams {
    /// Number of down/up cycles to run.
    #[serde(default = "default_num_cycles")]
    pub num_cycles: u32,

    /// Hold time at the down position, in seconds.
    #[serde(default = "default_seconds_down")]
    pub seconds_down: f64,

    /// Hold time at the up position, in minutes.
    #[serde(default = "default_minutes_up")]
    pub minutes_up: f64,
}

impl Default for CycleParams {
    fn default() -> Self {
        Self {
            num_cycles: default_num_cycles(),
            seconds_down: default_seconds_down(),
            minutes_up: default_minutes_up(),
        }
    }
}

impl CycleParams {
    /// Hold time at the up position, converted to seconds.
    pub fn up_hold_seconds(&self) -> f64 {
        self.minutes_up * 60.0
    }

    /// Validate the parameters.
    ///
    /// # Validation Rules
    /// 1. `num_cycles` >= 1
    /// 2. `seconds_down` > 0 and finite
    /// 3. `minutes_up` > 0 and finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_cycles == 0 {
            return Err(ConfigError::ValidationError(
                "cycle.num_cycles must be at least 1".to_string(),
            ));
        }
        if !(self.seconds_down.is_finite() && self.seconds_down > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "cycle.seconds_down must be positive, got {}",
                self.seconds_down
            )));
        }
        if !(self.minutes_up.is_finite() && self.minutes_up > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "cycle.minutes_up must be positive, got {}",
                self.minutes_up
            )));
        }
        Ok(())
    }
}
