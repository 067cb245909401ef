//! Fixed-period tick loop.
//!
//! Drives the controller at the configured tick period with optional
//! PREEMPT_RT setup (mlockall, CPU pinning, SCHED_FIFO) behind the `rt`
//! feature. Overruns are counted and logged, never fatal: a late tick
//! only stretches a dwell, it cannot corrupt the phase machine.

use crate::command::{CommandOutcome, ControlCommand};
use crate::controller::CycleController;
use crate::error::ControlError;
use dip_common::profile::CycleParams;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

// ─── Tick Statistics ────────────────────────────────────────────────

/// O(1) per-tick timing statistics.
///
/// Updated every tick with no allocation.
#[derive(Debug, Clone)]
pub struct TickStats {
    /// Total ticks executed.
    pub tick_count: u64,
    /// Last tick duration [ns].
    pub last_tick_ns: i64,
    /// Minimum tick duration [ns].
    pub min_tick_ns: i64,
    /// Maximum tick duration [ns].
    pub max_tick_ns: i64,
    /// Running sum for average computation.
    pub sum_tick_ns: i64,
    /// Number of ticks that ran past the period.
    pub overruns: u64,
}

impl TickStats {
    /// Create a new zeroed stats instance.
    pub const fn new() -> Self {
        Self {
            tick_count: 0,
            last_tick_ns: 0,
            min_tick_ns: i64::MAX,
            max_tick_ns: 0,
            sum_tick_ns: 0,
            overruns: 0,
        }
    }

    /// Record a tick duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64) {
        self.tick_count += 1;
        self.last_tick_ns = duration_ns;
        if duration_ns < self.min_tick_ns {
            self.min_tick_ns = duration_ns;
        }
        if duration_ns > self.max_tick_ns {
            self.max_tick_ns = duration_ns;
        }
        self.sum_tick_ns += duration_ns;
    }

    /// Average tick time [ns] (returns 0 if no ticks).
    #[inline]
    pub fn avg_tick_ns(&self) -> i64 {
        if self.tick_count == 0 {
            0
        } else {
            self.sum_tick_ns / self.tick_count as i64
        }
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages (prevent page faults in the
/// tick loop).
///
/// No-op when the `rt` feature is not enabled.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), ControlError> {
    use nix::sys::mman::{mlockall, MlockAllFlags};
    mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE)
        .map_err(|e| ControlError::RtSetup(format!("mlockall failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), ControlError> {
    Ok(()) // No-op in simulation mode
}

/// Prefault stack pages to prevent page faults while ticking.
///
/// Touches a large stack allocation to force page allocation.
fn prefault_stack() {
    // Touch 1 MB of stack to prefault pages.
    let mut buf = [0u8; 1024 * 1024];
    // Prevent compiler from optimizing away the write.
    for byte in buf.iter_mut() {
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Pin the current thread to a specific CPU core.
///
/// No-op when the `rt` feature is not enabled.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), ControlError> {
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| ControlError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| ControlError::RtSetup(format!("sched_setaffinity failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), ControlError> {
    Ok(()) // No-op in simulation mode
}

/// Set SCHED_FIFO with the given RT priority.
///
/// No-op when the `rt` feature is not enabled.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), ControlError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(ControlError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), ControlError> {
    Ok(()) // No-op in simulation mode
}

/// Perform the full RT setup sequence.
///
/// Must be called before entering the tick loop. In simulation mode
/// (no `rt` feature), all RT calls are no-ops.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), ControlError> {
    // 1. Lock all memory pages.
    rt_mlockall()?;

    // 2. Prefault stack pages.
    prefault_stack();

    // 3. Pin to CPU core.
    rt_set_affinity(cpu_core)?;

    // 4. Set RT scheduler.
    rt_set_scheduler(rt_priority)?;

    Ok(())
}

// ─── Tick Runner ────────────────────────────────────────────────────

/// Fixed-period driver for the cycle controller.
///
/// Owns the controller and the shutdown flag. `run()` enters the loop
/// and returns once a started automation has come back to idle or the
/// flag is cleared.
pub struct TickRunner {
    controller: CycleController,
    period: Duration,
    running: Arc<AtomicBool>,
    stats: TickStats,
    started: bool,
}

impl TickRunner {
    /// Create a runner over a controller with the given tick period.
    pub fn new(controller: CycleController, period: Duration) -> Self {
        Self {
            controller,
            period,
            running: Arc::new(AtomicBool::new(true)),
            stats: TickStats::new(),
            started: false,
        }
    }

    /// Shared shutdown flag; clearing it stops the loop at the next tick.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Timing statistics recorded so far.
    pub fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Borrow the controller for status queries.
    pub fn controller(&self) -> &CycleController {
        &self.controller
    }

    /// Submit the start command for an automation run.
    ///
    /// # Errors
    /// Maps a controller rejection to [`ControlError::StartRejected`].
    pub fn start(&mut self, params: CycleParams) -> Result<(), ControlError> {
        match self.controller.handle_command(ControlCommand::Start(params)) {
            CommandOutcome::Accepted => {
                self.started = true;
                Ok(())
            }
            CommandOutcome::Rejected(reason) => Err(ControlError::StartRejected(reason)),
        }
    }

    /// Enter the tick loop.
    ///
    /// Returns when a started automation has come back to idle, or when
    /// the running flag is cleared. A still-active run is stopped and the
    /// arm disengaged before the loop exits on a cleared flag.
    ///
    /// # Errors
    /// Propagates controller-defect errors from the tick path.
    pub fn run(&mut self) -> Result<(), ControlError> {
        info!("Tick loop started: period {:?}", self.period);
        let mut last_line = String::new();

        loop {
            if !self.running.load(Ordering::SeqCst) {
                if self.controller.is_running() {
                    info!("Shutdown requested; stopping active run");
                    self.controller.handle_command(ControlCommand::Stop);
                }
                break;
            }

            let tick_start = Instant::now();
            self.controller.on_tick(self.period)?;
            let elapsed = tick_start.elapsed();
            self.stats.record(elapsed.as_nanos() as i64);
            if elapsed > self.period {
                self.stats.overruns += 1;
                warn!("Tick overrun: {elapsed:?} > {:?}", self.period);
            }

            let line = self.controller.status_line();
            if !line.is_empty() && line != last_line {
                info!("{}", line.replace('\n', " | "));
                last_line = line.to_string();
            }

            if self.started && self.controller.is_idle() {
                info!("Automation finished");
                break;
            }

            if let Some(remaining) = self.period.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }

        info!(
            "Tick loop done: {} ticks, avg {} us, max {} us, {} overruns",
            self.stats.tick_count,
            self.stats.avg_tick_ns() / 1_000,
            self.stats.max_tick_ns / 1_000,
            self.stats.overruns
        );
        Ok(())
    }

    /// Shut the controller and its driver down.
    pub fn shutdown(&mut self) -> Result<(), ControlError> {
        self.controller.shutdown()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
