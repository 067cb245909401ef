//! Cycle automation controller.
//!
//! Single owner of the run state and the actuator snapshot. Each tick it
//! drains arrival events from the driver channel, then advances the phase
//! machine if the arm is at its setpoint. Commands are arbitrated here:
//! manual positioning is locked out while a run is active, and every move
//! passes the profile bounds gate before it reaches the driver.
//!
//! All mutation happens on the tick thread; the driver communicates back
//! only through the arrival channel.

use crate::command::{CommandOutcome, ControlCommand};
use crate::error::ControlError;
use crate::state::{RunPhase, TransitLeg};
use crate::status;
use dip_common::actuator::{ActuatorPort, ArrivalEvent, MoveCommand};
use dip_common::profile::{ArmProfile, CycleParams};
use std::sync::mpsc::Receiver;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Seconds shown on the countdown while the warm-up move is in flight.
/// Display seed only: the warm-up leg is gated on arrival, not on this
/// timer running out.
const STARTUP_GRACE_SECS: f64 = 2.0;

// ─── Run State ──────────────────────────────────────────────────────

/// Mutable state of one automation run.
#[derive(Debug, Clone, Copy)]
struct RunState {
    phase: RunPhase,
    params: Option<CycleParams>,
    cycles_remaining: u32,
    seconds_until_transition: f64,
}

impl RunState {
    const fn idle() -> Self {
        Self {
            phase: RunPhase::Idle,
            params: None,
            cycles_remaining: 0,
            seconds_until_transition: 0.0,
        }
    }
}

/// Last known actuator condition, refreshed every tick.
#[derive(Debug, Clone, Copy)]
pub struct ActuatorSnapshot {
    /// Position most recently commanded.
    pub target_position: f64,
    /// Whether the arm has announced arrival at the current target.
    pub at_setpoint: bool,
    /// Connection state as of the last tick.
    pub connected: bool,
}

/// Queryable controller state for reporting.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    /// Current run phase.
    pub phase: RunPhase,
    /// Cycles left in the current run (0 when idle).
    pub cycles_remaining: u32,
    /// Seconds until the current dwell expires.
    pub seconds_until_transition: f64,
    /// Actuator condition.
    pub actuator: ActuatorSnapshot,
    /// Operator-facing status line.
    pub message: String,
}

// ─── Controller ─────────────────────────────────────────────────────

/// Owns the actuator port and drives the dip cycle.
pub struct CycleController {
    profile: ArmProfile,
    port: Box<dyn ActuatorPort>,
    arrivals: Receiver<ArrivalEvent>,
    run: RunState,
    actuator: ActuatorSnapshot,
    generation: u64,
    moves_issued: u64,
    status: String,
}

impl CycleController {
    /// Create a controller over an initialized actuator port.
    ///
    /// `arrivals` is the receiving end of the channel whose sender was
    /// handed to the driver in its `DriverSetup`. The initial target is
    /// the profile's mid position, matching the driver's starting point.
    pub fn new(
        profile: ArmProfile,
        port: Box<dyn ActuatorPort>,
        arrivals: Receiver<ArrivalEvent>,
    ) -> Self {
        let connected = port.is_connected();
        let target_position = profile.mid_position();
        Self {
            profile,
            port,
            arrivals,
            run: RunState::idle(),
            actuator: ActuatorSnapshot {
                target_position,
                at_setpoint: false,
                connected,
            },
            generation: 0,
            moves_issued: 0,
            status: String::new(),
        }
    }

    // ─── Queries ────────────────────────────────────────────────────

    /// Operator-facing status line. Empty until the first event worth
    /// reporting.
    pub fn status_line(&self) -> &str {
        &self.status
    }

    /// Position the actuator was last commanded to.
    pub fn target_position(&self) -> f64 {
        self.actuator.target_position
    }

    /// Current run phase.
    pub fn phase(&self) -> RunPhase {
        self.run.phase
    }

    /// Whether an automation run is in progress.
    pub fn is_running(&self) -> bool {
        self.run.phase.is_active()
    }

    /// Whether the controller is idle (no run active or finishing).
    pub fn is_idle(&self) -> bool {
        self.run.phase == RunPhase::Idle
    }

    /// Total moves issued since construction.
    pub fn moves_issued(&self) -> u64 {
        self.moves_issued
    }

    /// Snapshot of all reportable state.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            phase: self.run.phase,
            cycles_remaining: self.run.cycles_remaining,
            seconds_until_transition: self.run.seconds_until_transition,
            actuator: self.actuator,
            message: self.status.clone(),
        }
    }

    // ─── Commands ───────────────────────────────────────────────────

    /// Submit a command. Takes effect immediately; never blocks.
    pub fn handle_command(&mut self, command: ControlCommand) -> CommandOutcome {
        match command {
            ControlCommand::Start(params) => self.start(params),
            ControlCommand::Stop => self.stop(),
            other => self.manual(other),
        }
    }

    fn start(&mut self, params: CycleParams) -> CommandOutcome {
        if self.is_running() {
            warn!("Start ignored: automation already active");
            return CommandOutcome::Rejected("automation already active");
        }
        if let Err(e) = params.validate() {
            warn!("Start rejected: {e}");
            self.status = "Cannot start: invalid cycle parameters".to_string();
            return CommandOutcome::Rejected("invalid cycle parameters");
        }
        if !self.port.is_connected() {
            warn!("Start rejected: actuator disconnected");
            self.status = "Cannot start: actuator disconnected".to_string();
            return CommandOutcome::Rejected("actuator disconnected");
        }

        if !self.issue_move(self.profile.up) {
            return CommandOutcome::Rejected("up position outside the permitted range");
        }
        self.run = RunState {
            phase: RunPhase::Transit { from: TransitLeg::Start },
            params: Some(params),
            cycles_remaining: params.num_cycles,
            seconds_until_transition: STARTUP_GRACE_SECS,
        };
        info!(
            "Run started: {} cycles, {} s down, {} min up",
            params.num_cycles, params.seconds_down, params.minutes_up
        );
        self.refresh_status();
        CommandOutcome::Accepted
    }

    fn stop(&mut self) -> CommandOutcome {
        let was_active = self.is_running();
        self.run = RunState::idle();
        if let Err(e) = self.port.disengage() {
            warn!("Disengage failed during stop: {e}");
        }
        if was_active {
            info!("Run cancelled by stop command");
            self.status = "Operation cancelled: actuator stopped".to_string();
        }
        CommandOutcome::Accepted
    }

    fn manual(&mut self, command: ControlCommand) -> CommandOutcome {
        if self.is_running() {
            warn!("{command:?} rejected: automation active");
            return CommandOutcome::Rejected("automation active");
        }
        if !self.port.is_connected() {
            warn!("{command:?} rejected: actuator disconnected");
            return CommandOutcome::Rejected("actuator disconnected");
        }
        let target = match command {
            ControlCommand::JogUp => self.actuator.target_position + self.profile.jog_step,
            ControlCommand::JogDown => self.actuator.target_position - self.profile.jog_step,
            ControlCommand::MoveToUp => self.profile.up,
            ControlCommand::MoveToDown => self.profile.down,
            ControlCommand::MoveToRetract => self.profile.retract,
            ControlCommand::Start(_) | ControlCommand::Stop => {
                return CommandOutcome::Rejected("not a manual command");
            }
        };
        if !self.issue_move(target) {
            return CommandOutcome::Rejected("target outside the permitted range");
        }
        CommandOutcome::Accepted
    }

    // ─── Tick Path ──────────────────────────────────────────────────

    /// Advance one tick. `period` is the nominal tick period; dwell
    /// countdowns decrement by this amount per tick.
    ///
    /// # Errors
    /// Returns a controller-defect error if the phase machine observes an
    /// impossible state; driver-level faults never surface here.
    pub fn on_tick(&mut self, period: Duration) -> Result<(), ControlError> {
        self.actuator.connected = self.port.is_connected();
        self.drain_arrivals();

        if !self.run.phase.is_active() {
            if self.run.phase == RunPhase::Done {
                // Report Done for one tick, then return to idle ready for
                // the next start. The finished message stays put.
                self.run = RunState::idle();
            }
            return Ok(());
        }

        if !self.actuator.connected {
            warn!("Actuator disconnected mid-run; cancelling");
            self.run = RunState::idle();
            if let Err(e) = self.port.disengage() {
                debug!("Disengage after disconnect failed: {e}");
            }
            self.status = "Operation cancelled: actuator disconnected".to_string();
            return Ok(());
        }

        if self.actuator.at_setpoint {
            self.advance(period.as_secs_f64())?;
        }
        self.refresh_status();
        Ok(())
    }

    /// Pull every queued arrival. Events from superseded moves are
    /// dropped on the generation check.
    fn drain_arrivals(&mut self) {
        while let Ok(event) = self.arrivals.try_recv() {
            if event.generation != self.generation {
                debug!(
                    "Stale arrival ignored: move #{} at {:.2} (current #{})",
                    event.generation, event.position, self.generation
                );
                continue;
            }
            let offset = (event.position - self.actuator.target_position).abs();
            if offset < self.profile.settle_tolerance {
                debug!("Arm at setpoint {:.2} (move #{})", event.position, event.generation);
                self.actuator.at_setpoint = true;
            } else {
                warn!(
                    "Arrival for move #{} off target by {:.2}; still waiting",
                    event.generation, offset
                );
            }
        }
    }

    fn advance(&mut self, dt_secs: f64) -> Result<(), ControlError> {
        let params = match self.run.params {
            Some(params) => params,
            None => {
                return Err(ControlError::StateCorrupted(
                    "active phase without captured cycle parameters",
                ));
            }
        };

        match self.run.phase {
            RunPhase::Transit { from } => self.arrive(from, params),
            RunPhase::Down => {
                self.run.seconds_until_transition -= dt_secs;
                if self.run.seconds_until_transition <= 0.0 {
                    self.issue_automated(self.profile.up)?;
                    self.run.phase = RunPhase::Transit { from: TransitLeg::Down };
                }
                Ok(())
            }
            RunPhase::Up => {
                self.run.seconds_until_transition -= dt_secs;
                if self.run.seconds_until_transition <= 0.0 {
                    self.complete_cycle()?;
                }
                Ok(())
            }
            RunPhase::Idle | RunPhase::Done => Ok(()),
        }
    }

    /// Handle arrival at the end of a transit leg.
    fn arrive(&mut self, from: TransitLeg, params: CycleParams) -> Result<(), ControlError> {
        let target = self.actuator.target_position;
        if (target - self.profile.up).abs() < self.profile.settle_tolerance {
            if from == TransitLeg::Start {
                // Warm-up reached the top: head straight down, no dwell.
                self.issue_automated(self.profile.down)?;
                self.run.phase = RunPhase::Transit { from: TransitLeg::Up };
            } else {
                self.run.seconds_until_transition = params.up_hold_seconds();
                self.run.phase = RunPhase::Up;
            }
            Ok(())
        } else if (target - self.profile.down).abs() < self.profile.settle_tolerance {
            self.run.seconds_until_transition = params.seconds_down;
            self.run.phase = RunPhase::Down;
            Ok(())
        } else {
            Err(ControlError::TargetMismatch { target })
        }
    }

    /// Close out the up dwell: decrement cycles, finish or head down.
    fn complete_cycle(&mut self) -> Result<(), ControlError> {
        self.run.cycles_remaining = self.run.cycles_remaining.saturating_sub(1);
        if self.run.cycles_remaining == 0 {
            // The arm stays engaged at the up position on completion.
            info!("All cycles complete");
            self.run.phase = RunPhase::Done;
        } else {
            self.issue_automated(self.profile.down)?;
            self.run.phase = RunPhase::Transit { from: TransitLeg::Up };
        }
        Ok(())
    }

    // ─── Moves ──────────────────────────────────────────────────────

    /// Bounds-gate and issue a move to the actuator.
    ///
    /// Returns false if the profile rejects the position; nothing changes
    /// in that case. A driver-level failure after the gate is logged and
    /// not rolled back: the run stalls waiting for an arrival that will
    /// not come, until a stop or a disconnect intervenes.
    fn issue_move(&mut self, position: f64) -> bool {
        if !self.profile.permits(position) {
            warn!(
                "Move to {:.2} dropped: outside permitted range ({:.2}, {:.2})",
                position, self.profile.min, self.profile.max
            );
            return false;
        }
        self.generation += 1;
        self.moves_issued += 1;
        self.actuator.target_position = position;
        self.actuator.at_setpoint = false;
        let command = MoveCommand { position, generation: self.generation };
        match self.port.move_to(command) {
            Ok(handle) => {
                debug!("Move #{} to {:.2} accepted", handle.generation, position);
            }
            Err(e) => {
                warn!("Move #{} to {:.2} failed: {e}", self.generation, position);
            }
        }
        true
    }

    /// Issue an automated move. The profile was validated at load time,
    /// so a bounds rejection here is a controller defect.
    fn issue_automated(&mut self, position: f64) -> Result<(), ControlError> {
        if self.issue_move(position) {
            Ok(())
        } else {
            Err(ControlError::StateCorrupted("automated position rejected by the arm profile"))
        }
    }

    fn refresh_status(&mut self) {
        let Some(params) = self.run.params else { return };
        self.status = status::render(
            self.run.phase,
            self.run.cycles_remaining,
            params.num_cycles,
            self.run.seconds_until_transition,
            &params,
        );
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Shut the actuator driver down.
    pub fn shutdown(&mut self) -> Result<(), ControlError> {
        self.port.shutdown().map_err(ControlError::Actuator)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use dip_common::actuator::{ActuatorError, ArrivalSender, CommandHandle, DriverSetup};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc, Mutex};

    const TICK: Duration = Duration::from_millis(250);

    struct TestPort {
        connected: Arc<AtomicBool>,
        moves: Arc<Mutex<Vec<MoveCommand>>>,
        fail_moves: Arc<AtomicBool>,
        disengages: Arc<Mutex<u32>>,
    }

    impl ActuatorPort for TestPort {
        fn name(&self) -> &'static str {
            "test"
        }

        fn version(&self) -> &'static str {
            "0.0.0"
        }

        fn init(&mut self, _setup: DriverSetup) -> Result<(), ActuatorError> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        fn move_to(&mut self, command: MoveCommand) -> Result<CommandHandle, ActuatorError> {
            if self.fail_moves.load(Ordering::SeqCst) {
                return Err(ActuatorError::MoveRejected("injected failure".to_string()));
            }
            self.moves.lock().unwrap().push(command);
            Ok(CommandHandle { generation: command.generation })
        }

        fn disengage(&mut self) -> Result<(), ActuatorError> {
            *self.disengages.lock().unwrap() += 1;
            Ok(())
        }

        fn shutdown(&mut self) -> Result<(), ActuatorError> {
            Ok(())
        }
    }

    struct Harness {
        controller: CycleController,
        arrivals: ArrivalSender,
        moves: Arc<Mutex<Vec<MoveCommand>>>,
        connected: Arc<AtomicBool>,
        fail_moves: Arc<AtomicBool>,
        disengages: Arc<Mutex<u32>>,
    }

    impl Harness {
        fn with_profile(profile: ArmProfile) -> Self {
            let (tx, rx) = mpsc::channel();
            let connected = Arc::new(AtomicBool::new(true));
            let moves = Arc::new(Mutex::new(Vec::new()));
            let fail_moves = Arc::new(AtomicBool::new(false));
            let disengages = Arc::new(Mutex::new(0));
            let port = TestPort {
                connected: Arc::clone(&connected),
                moves: Arc::clone(&moves),
                fail_moves: Arc::clone(&fail_moves),
                disengages: Arc::clone(&disengages),
            };
            Self {
                controller: CycleController::new(profile, Box::new(port), rx),
                arrivals: tx,
                moves,
                connected,
                fail_moves,
                disengages,
            }
        }

        fn new() -> Self {
            Self::with_profile(ArmProfile::default())
        }

        fn tick(&mut self) {
            self.controller.on_tick(TICK).unwrap();
        }

        fn last_generation(&self) -> u64 {
            self.moves.lock().unwrap().last().map(|m| m.generation).unwrap_or(0)
        }

        /// Inject an arrival for the most recent recorded move.
        fn arrive_at_target(&mut self) {
            let event = ArrivalEvent {
                position: self.controller.target_position(),
                generation: self.last_generation(),
            };
            self.arrivals.send(event).unwrap();
        }

        fn move_positions(&self) -> Vec<f64> {
            self.moves.lock().unwrap().iter().map(|m| m.position).collect()
        }

        fn disengage_count(&self) -> u32 {
            *self.disengages.lock().unwrap()
        }

        /// Drive the automation to the Done phase, injecting an arrival
        /// whenever a transit is waiting for one.
        fn run_to_done(&mut self, max_ticks: usize) {
            for _ in 0..max_ticks {
                if self.controller.phase() == RunPhase::Done {
                    return;
                }
                let waiting = matches!(self.controller.phase(), RunPhase::Transit { .. })
                    && !self.controller.snapshot().actuator.at_setpoint;
                if waiting {
                    self.arrive_at_target();
                }
                self.tick();
            }
            panic!("automation did not reach Done within {max_ticks} ticks");
        }
    }

    fn fast_params() -> CycleParams {
        // Two decrement ticks per dwell at the 250 ms test tick.
        CycleParams { num_cycles: 2, seconds_down: 0.5, minutes_up: 0.5 / 60.0 }
    }

    #[test]
    fn start_issues_warmup_move_to_up() {
        let mut h = Harness::new();
        let outcome = h.controller.handle_command(ControlCommand::Start(CycleParams::default()));
        assert!(outcome.is_accepted());
        assert_eq!(h.controller.phase(), RunPhase::Transit { from: TransitLeg::Start });
        assert_eq!(h.move_positions(), vec![72.0]);
        assert_eq!(h.controller.target_position(), 72.0);
        assert!(!h.controller.snapshot().actuator.at_setpoint);
        assert_eq!(h.controller.status_line(), "5 of 5 cycles remain\nStarting operation");
    }

    #[test]
    fn start_rejected_while_disconnected() {
        let mut h = Harness::new();
        h.connected.store(false, Ordering::SeqCst);
        let outcome = h.controller.handle_command(ControlCommand::Start(CycleParams::default()));
        assert_eq!(outcome, CommandOutcome::Rejected("actuator disconnected"));
        assert!(h.controller.is_idle());
        assert!(h.move_positions().is_empty());
        assert_eq!(h.controller.status_line(), "Cannot start: actuator disconnected");
    }

    #[test]
    fn start_rejected_with_invalid_params() {
        let mut h = Harness::new();
        let params = CycleParams { num_cycles: 0, ..CycleParams::default() };
        let outcome = h.controller.handle_command(ControlCommand::Start(params));
        assert_eq!(outcome, CommandOutcome::Rejected("invalid cycle parameters"));
        assert!(h.controller.is_idle());
        assert_eq!(h.controller.status_line(), "Cannot start: invalid cycle parameters");
    }

    #[test]
    fn start_rejected_while_running() {
        let mut h = Harness::new();
        assert!(h.controller.handle_command(ControlCommand::Start(fast_params())).is_accepted());
        let again = h.controller.handle_command(ControlCommand::Start(fast_params()));
        assert_eq!(again, CommandOutcome::Rejected("automation already active"));
        assert_eq!(h.move_positions().len(), 1);
    }

    #[test]
    fn warmup_arrival_heads_down_without_dwell() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        h.arrive_at_target();
        h.tick();
        assert_eq!(h.controller.phase(), RunPhase::Transit { from: TransitLeg::Up });
        assert_eq!(h.move_positions(), vec![72.0, 35.0]);
        assert_eq!(h.controller.status_line(), "2 of 2 cycles remain\nIn transit");
    }

    #[test]
    fn down_arrival_starts_down_dwell() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        h.arrive_at_target();
        h.tick();
        h.arrive_at_target();
        h.tick();
        assert_eq!(h.controller.phase(), RunPhase::Down);
        let snapshot = h.controller.snapshot();
        assert!((snapshot.seconds_until_transition - 0.5).abs() < 1e-9);
        assert!(snapshot.message.contains("remain in down position"));
    }

    #[test]
    fn down_dwell_expiry_issues_move_up() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        h.arrive_at_target();
        h.tick(); // warm-up arrival, head down
        h.arrive_at_target();
        h.tick(); // down arrival, dwell = 0.5 s
        h.tick(); // 0.25 s left
        assert_eq!(h.controller.phase(), RunPhase::Down);
        h.tick(); // expired
        assert_eq!(h.controller.phase(), RunPhase::Transit { from: TransitLeg::Down });
        assert_eq!(h.move_positions(), vec![72.0, 35.0, 72.0]);
    }

    #[test]
    fn up_arrival_starts_up_dwell() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        h.arrive_at_target();
        h.tick();
        h.arrive_at_target();
        h.tick();
        h.tick();
        h.tick(); // down dwell expired, moving up
        h.arrive_at_target();
        h.tick();
        assert_eq!(h.controller.phase(), RunPhase::Up);
        let snapshot = h.controller.snapshot();
        assert!((snapshot.seconds_until_transition - 0.5).abs() < 1e-9);
        assert!(snapshot.message.contains("remain in up position"));
    }

    #[test]
    fn full_run_issues_warmup_plus_two_moves_per_cycle() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        h.run_to_done(100);

        assert_eq!(h.move_positions(), vec![72.0, 35.0, 72.0, 35.0, 72.0]);
        assert_eq!(h.controller.moves_issued(), 5);
        assert_eq!(h.controller.snapshot().cycles_remaining, 0);
        assert_eq!(h.controller.status_line(), "0 of 2 cycles remain\nFinished operation");
        // No disengage on completion: the arm holds the up position.
        assert_eq!(h.disengage_count(), 0);

        // Done folds to idle on the next tick; the message stays.
        h.tick();
        assert!(h.controller.is_idle());
        assert_eq!(h.controller.status_line(), "0 of 2 cycles remain\nFinished operation");
    }

    #[test]
    fn cycles_remaining_counts_down_per_up_dwell() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        assert_eq!(h.controller.snapshot().cycles_remaining, 2);

        // First up dwell expiry takes the count to 1 and heads down.
        h.arrive_at_target();
        h.tick(); // warm-up at top
        h.arrive_at_target();
        h.tick(); // down dwell begins
        h.tick();
        h.tick(); // down dwell expires, move up
        h.arrive_at_target();
        h.tick(); // up dwell begins
        h.tick();
        h.tick(); // up dwell expires
        assert_eq!(h.controller.snapshot().cycles_remaining, 1);
        assert_eq!(h.controller.phase(), RunPhase::Transit { from: TransitLeg::Up });
    }

    #[test]
    fn stale_arrival_is_ignored() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        let current = h.last_generation();
        h.arrivals
            .send(ArrivalEvent { position: 72.0, generation: current - 1 })
            .unwrap();
        h.tick();
        assert_eq!(h.controller.phase(), RunPhase::Transit { from: TransitLeg::Start });
        assert!(!h.controller.snapshot().actuator.at_setpoint);

        h.arrivals.send(ArrivalEvent { position: 72.0, generation: current }).unwrap();
        h.tick();
        assert_eq!(h.controller.phase(), RunPhase::Transit { from: TransitLeg::Up });
    }

    #[test]
    fn off_target_arrival_does_not_settle() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        let generation = h.last_generation();
        h.arrivals.send(ArrivalEvent { position: 60.0, generation }).unwrap();
        h.tick();
        assert!(!h.controller.snapshot().actuator.at_setpoint);
        assert_eq!(h.controller.phase(), RunPhase::Transit { from: TransitLeg::Start });
    }

    #[test]
    fn settle_tolerance_is_strict() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        let generation = h.last_generation();

        // Exactly at the tolerance does not settle.
        h.arrivals.send(ArrivalEvent { position: 72.5, generation }).unwrap();
        h.tick();
        assert!(!h.controller.snapshot().actuator.at_setpoint);

        // Just inside does.
        h.arrivals.send(ArrivalEvent { position: 72.4, generation }).unwrap();
        h.tick();
        assert_eq!(h.controller.phase(), RunPhase::Transit { from: TransitLeg::Up });
    }

    #[test]
    fn manual_commands_rejected_while_running() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        let outcome = h.controller.handle_command(ControlCommand::JogUp);
        assert_eq!(outcome, CommandOutcome::Rejected("automation active"));
        assert_eq!(h.move_positions().len(), 1);
        assert_eq!(h.controller.target_position(), 72.0);
    }

    #[test]
    fn manual_commands_rejected_while_disconnected() {
        let mut h = Harness::new();
        h.connected.store(false, Ordering::SeqCst);
        let outcome = h.controller.handle_command(ControlCommand::MoveToUp);
        assert_eq!(outcome, CommandOutcome::Rejected("actuator disconnected"));
        assert!(h.move_positions().is_empty());
    }

    #[test]
    fn jog_steps_from_current_target() {
        let mut h = Harness::new();
        assert!(h.controller.handle_command(ControlCommand::JogUp).is_accepted());
        assert_eq!(h.controller.target_position(), 55.0); // mid 54 + 1
        assert!(h.controller.handle_command(ControlCommand::JogDown).is_accepted());
        assert!(h.controller.handle_command(ControlCommand::JogDown).is_accepted());
        assert_eq!(h.controller.target_position(), 53.0);
        assert_eq!(h.move_positions(), vec![55.0, 54.0, 53.0]);
    }

    #[test]
    fn out_of_bounds_jog_changes_nothing() {
        let mut h = Harness::new();
        assert!(h.controller.handle_command(ControlCommand::MoveToRetract).is_accepted());
        assert_eq!(h.controller.target_position(), 89.0);

        // 89 + 1 = 90 hits the exclusive upper bound.
        let outcome = h.controller.handle_command(ControlCommand::JogUp);
        assert_eq!(outcome, CommandOutcome::Rejected("target outside the permitted range"));
        assert_eq!(h.controller.target_position(), 89.0);
        assert_eq!(h.move_positions(), vec![89.0]);
    }

    #[test]
    fn stop_returns_to_idle_and_disengages() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        let outcome = h.controller.handle_command(ControlCommand::Stop);
        assert!(outcome.is_accepted());
        assert!(h.controller.is_idle());
        assert_eq!(h.disengage_count(), 1);
        assert_eq!(h.controller.status_line(), "Operation cancelled: actuator stopped");
    }

    #[test]
    fn stop_when_idle_still_disengages_quietly() {
        let mut h = Harness::new();
        assert!(h.controller.handle_command(ControlCommand::Stop).is_accepted());
        assert_eq!(h.disengage_count(), 1);
        assert_eq!(h.controller.status_line(), "");
    }

    #[test]
    fn disconnect_mid_run_cancels() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        h.arrive_at_target();
        h.tick();
        assert!(h.controller.is_running());

        h.connected.store(false, Ordering::SeqCst);
        h.tick();
        assert!(h.controller.is_idle());
        assert_eq!(h.disengage_count(), 1);
        assert_eq!(h.controller.status_line(), "Operation cancelled: actuator disconnected");
    }

    #[test]
    fn driver_failure_stalls_in_transit() {
        let mut h = Harness::new();
        h.fail_moves.store(true, Ordering::SeqCst);
        let outcome = h.controller.handle_command(ControlCommand::Start(fast_params()));

        // The move was committed before the driver refused it.
        assert!(outcome.is_accepted());
        assert_eq!(h.controller.phase(), RunPhase::Transit { from: TransitLeg::Start });
        assert!(h.move_positions().is_empty());

        // No arrival will ever come; the run stalls rather than retries.
        for _ in 0..10 {
            h.tick();
        }
        assert_eq!(h.controller.phase(), RunPhase::Transit { from: TransitLeg::Start });
        assert_eq!(h.move_positions().len(), 0);

        // Stop is still the way out.
        h.controller.handle_command(ControlCommand::Stop);
        assert!(h.controller.is_idle());
    }

    #[test]
    fn second_run_repeats_the_warmup() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        h.run_to_done(100);
        h.tick(); // fold to idle

        let outcome = h.controller.handle_command(ControlCommand::Start(fast_params()));
        assert!(outcome.is_accepted());
        assert_eq!(h.controller.phase(), RunPhase::Transit { from: TransitLeg::Start });

        // The warm-up branch runs again: arrival at the top heads down.
        h.arrive_at_target();
        h.tick();
        assert_eq!(h.controller.phase(), RunPhase::Transit { from: TransitLeg::Up });
        assert_eq!(h.move_positions(), vec![72.0, 35.0, 72.0, 35.0, 72.0, 72.0, 35.0]);
    }

    #[test]
    fn start_during_done_phase_is_accepted() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        h.run_to_done(100);
        assert_eq!(h.controller.phase(), RunPhase::Done);

        // Done is not active, so a new run may begin before the fold.
        let outcome = h.controller.handle_command(ControlCommand::Start(fast_params()));
        assert!(outcome.is_accepted());
        assert_eq!(h.controller.phase(), RunPhase::Transit { from: TransitLeg::Start });
    }

    #[test]
    fn countdown_holds_while_off_setpoint() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        h.arrive_at_target();
        h.tick();
        h.arrive_at_target();
        h.tick();
        assert_eq!(h.controller.phase(), RunPhase::Down);

        // Simulate the settled flag dropping: the countdown must freeze.
        h.controller.actuator.at_setpoint = false;
        for _ in 0..5 {
            h.tick();
        }
        let snapshot = h.controller.snapshot();
        assert_eq!(h.controller.phase(), RunPhase::Down);
        assert!((snapshot.seconds_until_transition - 0.5).abs() < 1e-9);

        h.controller.actuator.at_setpoint = true;
        h.tick();
        assert!((h.controller.snapshot().seconds_until_transition - 0.25).abs() < 1e-9);
    }

    #[test]
    fn mismatched_automated_target_is_a_defect() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));

        // Corrupt the tracked target to something neither up nor down.
        h.controller.actuator.target_position = 50.0;
        h.controller.actuator.at_setpoint = true;
        let err = h.controller.on_tick(TICK).unwrap_err();
        assert!(matches!(err, ControlError::TargetMismatch { target } if target == 50.0));
    }

    #[test]
    fn active_phase_without_params_is_a_defect() {
        let mut h = Harness::new();
        h.controller.handle_command(ControlCommand::Start(fast_params()));
        h.controller.run.params = None;
        h.controller.actuator.at_setpoint = true;
        let err = h.controller.on_tick(TICK).unwrap_err();
        assert!(matches!(err, ControlError::StateCorrupted(_)));
    }
}
