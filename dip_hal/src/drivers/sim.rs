//! Simulation servo driver.
//!
//! The `SimServo` implements the `ActuatorPort` trait to provide a
//! software-emulated dip-coating arm for development and testing without
//! physical hardware. A background update thread advances the position
//! toward the pending target at the configured maximum velocity and
//! announces one arrival event per accepted command over the channel
//! handed to `init`.

use dip_common::actuator::{
    ActuatorError, ActuatorPort, ArrivalEvent, ArrivalSender, CommandHandle, DriverSetup,
    MoveCommand,
};
use dip_common::config::DriverSettings;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, trace};

/// A move accepted but not yet announced as arrived.
#[derive(Debug, Clone, Copy)]
struct PendingMove {
    /// Commanded target position.
    target: f64,
    /// Generation of the command, echoed in the arrival event.
    generation: u64,
}

/// State shared between the driver facade and its update thread.
#[derive(Debug)]
struct ServoShared {
    /// Current simulated position.
    position: f64,
    /// Whether the servo is holding/moving.
    engaged: bool,
    /// Command currently in flight.
    pending: Option<PendingMove>,
}

/// Simulation servo implementing the ActuatorPort trait.
pub struct SimServo {
    /// Driver name
    name: &'static str,
    /// Driver version
    version: &'static str,
    /// Initialized flag
    initialized: bool,
    /// Connection toggle, also exposed for tests
    connected: Arc<AtomicBool>,
    /// Update thread stop flag
    stop: Arc<AtomicBool>,
    /// State shared with the update thread
    shared: Arc<Mutex<ServoShared>>,
    /// Update thread handle
    worker: Option<thread::JoinHandle<()>>,
}

impl SimServo {
    /// Create a new simulation servo instance.
    pub fn new() -> Self {
        Self {
            name: "simulation",
            version: env!("CARGO_PKG_VERSION"),
            initialized: false,
            connected: Arc::new(AtomicBool::new(true)),
            stop: Arc::new(AtomicBool::new(false)),
            shared: Arc::new(Mutex::new(ServoShared {
                position: 0.0,
                engaged: false,
                pending: None,
            })),
            worker: None,
        }
    }

    /// Toggle the simulated connection.
    ///
    /// While disconnected the servo freezes in place and rejects moves.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Handle to the connection toggle, for tests that need to flip the
    /// connection after the driver has been boxed away.
    pub fn connection_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }
}

impl Default for SimServo {
    fn default() -> Self {
        Self::new()
    }
}

/// Update thread body: advance toward the pending target, announce
/// arrivals. Exits when the stop flag is set or the shared state is
/// poisoned.
fn update_loop(
    shared: Arc<Mutex<ServoShared>>,
    connected: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    events: ArrivalSender,
    settings: DriverSettings,
) {
    let step = Duration::from_millis(settings.update_ms);
    let step_limit = settings.max_velocity * step.as_secs_f64();

    while !stop.load(Ordering::SeqCst) {
        thread::sleep(step);
        if !connected.load(Ordering::SeqCst) {
            continue;
        }

        let arrival = {
            let Ok(mut servo) = shared.lock() else {
                break;
            };
            match servo.pending {
                Some(pending) if servo.engaged => {
                    let delta = pending.target - servo.position;
                    if delta.abs() <= step_limit {
                        servo.position = pending.target;
                    } else {
                        servo.position += step_limit * delta.signum();
                    }
                    if (servo.position - pending.target).abs() <= settings.arrival_window {
                        servo.pending = None;
                        Some(ArrivalEvent {
                            position: servo.position,
                            generation: pending.generation,
                        })
                    } else {
                        None
                    }
                }
                _ => None,
            }
        };

        if let Some(event) = arrival {
            debug!(
                "Simulated arrival at {:.2} (command #{})",
                event.position, event.generation
            );
            if events.send(event).is_err() {
                trace!("Arrival receiver dropped, event discarded");
            }
        }
    }
}

impl ActuatorPort for SimServo {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn init(&mut self, setup: DriverSetup) -> Result<(), ActuatorError> {
        if self.worker.is_some() {
            return Err(ActuatorError::InitFailed(
                "simulation servo already initialized".to_string(),
            ));
        }

        {
            let mut servo = self
                .shared
                .lock()
                .map_err(|_| ActuatorError::InitFailed("simulation state poisoned".to_string()))?;
            servo.position = setup.initial_position;
        }

        info!(
            "Initializing simulation servo at {:.2} (max velocity {:.1}/s, update step {} ms)",
            setup.initial_position, setup.settings.max_velocity, setup.settings.update_ms
        );

        let shared = Arc::clone(&self.shared);
        let connected = Arc::clone(&self.connected);
        let stop = Arc::clone(&self.stop);
        self.worker = Some(thread::spawn(move || {
            update_loop(shared, connected, stop, setup.events, setup.settings);
        }));
        self.initialized = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn move_to(&mut self, command: MoveCommand) -> Result<CommandHandle, ActuatorError> {
        if !self.initialized {
            return Err(ActuatorError::NotInitialized);
        }
        if !self.is_connected() {
            return Err(ActuatorError::NotConnected);
        }

        let mut servo = self
            .shared
            .lock()
            .map_err(|_| ActuatorError::MoveRejected("simulation state poisoned".to_string()))?;
        servo.engaged = true;
        servo.pending = Some(PendingMove {
            target: command.position,
            generation: command.generation,
        });
        debug!(
            "Simulated servo moving to {:.2} (command #{})",
            command.position, command.generation
        );
        Ok(CommandHandle {
            generation: command.generation,
        })
    }

    fn disengage(&mut self) -> Result<(), ActuatorError> {
        let mut servo = self
            .shared
            .lock()
            .map_err(|_| ActuatorError::ShutdownFailed("simulation state poisoned".to_string()))?;
        servo.engaged = false;
        servo.pending = None;
        debug!("Simulated servo disengaged at {:.2}", servo.position);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), ActuatorError> {
        info!("Shutting down simulation servo");
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| ActuatorError::ShutdownFailed("update thread panicked".to_string()))?;
        }
        self.initialized = false;
        Ok(())
    }
}

/// Factory function for the driver registry.
pub fn create_driver() -> Box<dyn ActuatorPort> {
    Box::new(SimServo::new())
}
