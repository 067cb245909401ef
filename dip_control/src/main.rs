//! # Dip Controller
//!
//! Headless cycle automation for a dip-coating arm. Loads the TOML
//! configuration, builds an actuator driver from the registry, then runs
//! one automation to completion (or until SIGINT) on a fixed tick.
//!
//! # Usage
//!
//! ```bash
//! # Run with the simulation driver and the default config
//! dip_control
//!
//! # Override the cycle parameters from the CLI
//! dip_control --cycles 3 --seconds-down 10 --minutes-up 0.5
//!
//! # Pick a driver explicitly, verbose logging
//! dip_control configs/dip.toml --driver simulation -v
//! ```

use clap::Parser;
use dip_common::actuator::DriverSetup;
use dip_common::config::{ConfigLoader, DipConfig};
use dip_common::consts::DEFAULT_CONFIG_PATH;
use dip_common::profile::CycleParams;
use dip_control::controller::CycleController;
use dip_control::runner::{rt_setup, TickRunner};
use dip_hal::drivers::register_builtin;
use dip_hal::registry::DriverRegistry;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Dip Controller — fixed-tick cycle automation for a dip-coating arm
#[derive(Parser, Debug)]
#[command(name = "dip_control")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Fixed-tick cycle automation for a dip-coating arm")]
struct Args {
    /// Path to the controller configuration TOML.
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Actuator driver to use (overrides the configured kind).
    #[arg(long, value_name = "NAME")]
    driver: Option<String>,

    /// List registered drivers and exit.
    #[arg(long)]
    list_drivers: bool,

    /// Number of cycles to run (overrides the configured value).
    #[arg(long)]
    cycles: Option<u32>,

    /// Hold time at the down position in seconds (overrides the configured value).
    #[arg(long)]
    seconds_down: Option<f64>,

    /// Hold time at the up position in minutes (overrides the configured value).
    #[arg(long)]
    minutes_up: Option<f64>,

    /// CPU core to pin the tick thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Dip Controller v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Dip Controller shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = DriverRegistry::new();
    register_builtin(&mut registry);

    if args.list_drivers {
        let mut names = registry.list_drivers();
        names.sort_unstable();
        for name in names {
            info!("driver: {name}");
        }
        return Ok(());
    }

    let config = DipConfig::load(&args.config)?;
    config.validate()?;
    info!(
        "Config OK: service '{}', tick {} ms, arm range ({}, {})",
        config.shared.service_name, config.runner.tick_ms, config.arm.min, config.arm.max
    );

    let params = merge_cycle_params(&config, args);
    params.validate()?;

    // Driver wiring: the sender side of the arrival channel goes to the
    // driver, the receiver to the controller.
    let driver_name = args.driver.as_deref().unwrap_or(&config.driver.kind);
    let (events, arrivals) = mpsc::channel();
    let mut port = registry.create_driver(driver_name)?;
    port.init(DriverSetup {
        events,
        initial_position: config.arm.mid_position(),
        settings: config.driver.clone(),
    })?;
    info!("Driver ready: {} v{}", port.name(), port.version());

    // RT setup (mlockall, affinity, scheduler).
    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let controller = CycleController::new(config.arm.clone(), port, arrivals);
    let mut runner = TickRunner::new(controller, Duration::from_millis(config.runner.tick_ms));

    // Signal handler clears the running flag; the loop notices within one
    // tick, stops the run and disengages the arm.
    let running = runner.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    info!(
        "Starting automation: {} cycles, {} s down, {} min up",
        params.num_cycles, params.seconds_down, params.minutes_up
    );
    runner.start(params)?;
    let result = runner.run();

    if let Err(e) = runner.shutdown() {
        warn!("Driver shutdown failed: {e}");
    }
    result.map_err(Into::into)
}

/// Apply CLI overrides on top of the configured cycle parameters.
fn merge_cycle_params(config: &DipConfig, args: &Args) -> CycleParams {
    let mut params = config.cycle;
    if let Some(cycles) = args.cycles {
        params.num_cycles = cycles;
    }
    if let Some(seconds_down) = args.seconds_down {
        params.seconds_down = seconds_down;
    }
    if let Some(minutes_up) = args.minutes_up {
        params.minutes_up = minutes_up;
    }
    params
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
