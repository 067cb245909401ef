//! Control-layer error types.
//!
//! Start rejections and actuator faults are operator-recoverable; target
//! mismatches and state corruption are controller defects and abort the
//! tick loop.

use dip_common::actuator::ActuatorError;

/// Errors from the cycle controller and tick runner.
#[derive(Debug)]
pub enum ControlError {
    /// RT setup system call failed.
    RtSetup(String),
    /// Actuator driver failure outside the move path.
    Actuator(ActuatorError),
    /// A start command was refused.
    StartRejected(&'static str),
    /// An automated arrival matched neither the up nor the down position.
    TargetMismatch {
        /// The target the controller was tracking.
        target: f64,
    },
    /// Controller state violated an internal invariant.
    StateCorrupted(&'static str),
}

impl std::fmt::Display for ControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RtSetup(msg) => write!(f, "RT setup error: {msg}"),
            Self::Actuator(e) => write!(f, "actuator error: {e}"),
            Self::StartRejected(reason) => write!(f, "start rejected: {reason}"),
            Self::TargetMismatch { target } => write!(
                f,
                "automated target {target:.2} matches neither the up nor the down position"
            ),
            Self::StateCorrupted(what) => write!(f, "controller state corrupted: {what}"),
        }
    }
}

impl std::error::Error for ControlError {}

impl From<ActuatorError> for ControlError {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = ControlError::StartRejected("actuator disconnected");
        assert_eq!(e.to_string(), "start rejected: actuator disconnected");

        let e = ControlError::TargetMismatch { target: 50.0 };
        assert!(e.to_string().contains("50.00"));

        let e = ControlError::RtSetup("mlockall failed".to_string());
        assert_eq!(e.to_string(), "RT setup error: mlockall failed");
    }

    #[test]
    fn actuator_errors_convert() {
        let e: ControlError = ActuatorError::NotConnected.into();
        assert!(matches!(e, ControlError::Actuator(ActuatorError::NotConnected)));
        assert_eq!(e.to_string(), "actuator error: Actuator not connected");
    }
}
