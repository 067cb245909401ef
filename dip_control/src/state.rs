//! Run phase machine for the cycle automation.
//!
//! The controller is in exactly one [`RunPhase`] at any time. Transit
//! phases carry the leg they came from, so an arrival at the up position
//! can tell the warm-up move (keep going, head down) apart from the end
//! of a descent-ascent pair (begin the up dwell).

// ─── Transit Legs ───────────────────────────────────────────────────

/// The phase a transit was entered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitLeg {
    /// Warm-up leg issued by the start command, heading for the up
    /// position. Arrival here does not begin a dwell.
    Start,
    /// Heading down, either after the warm-up reached the top or after
    /// an up dwell expired.
    Up,
    /// Heading up after a down dwell expired.
    Down,
}

// ─── Run Phases ─────────────────────────────────────────────────────

/// Current phase of the automation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// No automation active. Manual commands are accepted.
    Idle,
    /// A move has been issued and the arm has not yet arrived.
    Transit {
        /// The phase this transit was entered from.
        from: TransitLeg,
    },
    /// Holding at the down position, counting down the immersion dwell.
    Down,
    /// Holding at the up position, counting down the drying dwell.
    Up,
    /// Run complete. Folds back to [`RunPhase::Idle`] on the next tick.
    Done,
}

impl RunPhase {
    /// Whether an automation run is in progress. `Done` is not active:
    /// the run is over, the phase just has not folded to idle yet.
    pub const fn is_active(&self) -> bool {
        matches!(self, RunPhase::Transit { .. } | RunPhase::Down | RunPhase::Up)
    }

    /// Short label for logs.
    pub const fn label(&self) -> &'static str {
        match self {
            RunPhase::Idle => "IDLE",
            RunPhase::Transit { .. } => "TRANSIT",
            RunPhase::Down => "DOWN",
            RunPhase::Up => "UP",
            RunPhase::Done => "DONE",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
