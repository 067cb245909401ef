//! Operator status line rendering.
//!
//! Pure formatting of controller state into the progress string shown in
//! logs. Idle is a single line; every other phase carries a
//! cycles-remaining line followed by a phase line. No side effects.

use crate::state::{RunPhase, TransitLeg};
use dip_common::profile::CycleParams;

/// Render the status line for the given phase.
///
/// `seconds_left` is clamped at zero for display; the countdown may dip
/// slightly below before the transition fires.
pub fn render(
    phase: RunPhase,
    cycles_remaining: u32,
    total_cycles: u32,
    seconds_left: f64,
    params: &CycleParams,
) -> String {
    let seconds_left = seconds_left.max(0.0);
    match phase {
        RunPhase::Idle => "Idle".to_string(),
        RunPhase::Done => {
            format!("{cycles_remaining} of {total_cycles} cycles remain\nFinished operation")
        }
        RunPhase::Transit { from: TransitLeg::Start } => format!(
            "{cycles_remaining} of {total_cycles} cycles remain\nStarting operation"
        ),
        RunPhase::Transit { .. } => {
            format!("{cycles_remaining} of {total_cycles} cycles remain\nIn transit")
        }
        RunPhase::Down => format!(
            "{cycles_remaining} of {total_cycles} cycles remain\n\
             {seconds_left:.1} s of {:.0} s remain in down position",
            params.seconds_down
        ),
        RunPhase::Up => format!(
            "{cycles_remaining} of {total_cycles} cycles remain\n\
             {seconds_left:.0} s of {:.1} min remain in up position",
            params.minutes_up
        ),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
