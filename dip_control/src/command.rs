//! Commands accepted by the cycle controller.
//!
//! Manual positioning commands are locked out while an automation run is
//! active; start and stop are arbitrated by the controller itself.

use dip_common::profile::CycleParams;

// ─── Commands ───────────────────────────────────────────────────────

/// A command submitted to the cycle controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    /// Begin an automation run with the given parameters.
    Start(CycleParams),
    /// Cancel any active run and disengage the arm.
    Stop,
    /// Nudge the target up by the profile's jog step.
    JogUp,
    /// Nudge the target down by the profile's jog step.
    JogDown,
    /// Move to the raised (drying) position.
    MoveToUp,
    /// Move to the lowered (immersion) position.
    MoveToDown,
    /// Move to the fully retracted parking position.
    MoveToRetract,
}

/// Whether a command positions the arm by hand. Manual commands are
/// refused while an automation run is active.
pub const fn is_manual_command(command: &ControlCommand) -> bool {
    matches!(
        command,
        ControlCommand::JogUp
            | ControlCommand::JogDown
            | ControlCommand::MoveToUp
            | ControlCommand::MoveToDown
            | ControlCommand::MoveToRetract
    )
}

// ─── Outcomes ───────────────────────────────────────────────────────

/// Result of submitting a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command took effect.
    Accepted,
    /// The command was refused; the reason is suitable for logs.
    Rejected(&'static str),
}

impl CommandOutcome {
    /// Whether the command took effect.
    pub const fn is_accepted(&self) -> bool {
        matches!(self, CommandOutcome::Accepted)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
