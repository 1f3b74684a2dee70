//! # emBODY Joint Control Unit
//!
//! Host runner for the joint control core. Loads a board TOML, builds the
//! controller bank against a simulated board, optionally performs RT setup,
//! and ticks at the configured period until the tick budget is spent or
//! Ctrl-C is received.
//!
//! On start every joint is switched to `Position` mode and commanded to
//! `--target`, so a run exercises the full trajectory → PID → actuator path.

use clap::Parser;
use embody_common::control_unit::command::JointCommand;
use embody_common::control_unit::state::ControlMode;
use embody_control_unit::config::load_board_config;
use embody_control_unit::cycle::{CycleRunner, RtPlacement};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// emBODY joint control unit: periodic joint control on a simulated board
#[derive(Parser, Debug)]
#[command(name = "embody_control_unit")]
#[command(version)]
#[command(about = "Fixed-point joint control loop on a simulated motor board")]
struct Args {
    /// Path to the board configuration TOML.
    #[arg(short, long, default_value = "config/board.toml")]
    config: PathBuf,

    /// Number of ticks to run (0 = until Ctrl-C).
    #[arg(short, long, default_value_t = 5000)]
    ticks: u64,

    /// Position target for every joint [encoder ticks].
    #[arg(long, default_value_t = 1000, allow_negative_numbers = true)]
    target: i32,

    /// Trajectory velocity [ticks per tick].
    #[arg(long, default_value_t = 2)]
    velocity: i16,

    /// CPU core to pin the tick thread to (`rt` builds).
    #[arg(long)]
    cpu_core: Option<usize>,

    /// SCHED_FIFO priority, 1..=99 (`rt` builds).
    #[arg(long)]
    rt_priority: Option<i32>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let loaded = match load_board_config(&args.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            // Tracing is not up yet: the log level lives in the config.
            eprintln!("FATAL: {}: {e}", args.config.display());
            process::exit(1);
        }
    };

    setup_tracing(&args, loaded.board.log_level.as_directive());
    info!("emBODY control unit v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Config OK: board={} profile={:?} cycle_time={}µs joints={} smoothing={}",
        loaded.board.board_id,
        loaded.board.profile,
        loaded.board.cycle_time_us,
        loaded.joint_count(),
        loaded.board.smoothing
    );

    if let Err(e) = run(&args, &loaded) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("emBODY control unit shutdown complete");
}

fn run(args: &Args, loaded: &embody_control_unit::config::LoadedConfig) -> Result<(), Box<dyn std::error::Error>> {
    RtPlacement {
        cpu_core: args.cpu_core,
        priority: args.rt_priority,
    }
    .apply()?;

    let mut runner = CycleRunner::new(loaded)?;

    for j in 0..runner.bank().joint_count() {
        let bank = runner.bank_mut();
        bank.submit(j, JointCommand::SetControlMode(ControlMode::Position))?;
        bank.submit(
            j,
            JointCommand::SetPosition {
                position: args.target,
                velocity: args.velocity,
            },
        )?;
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    runner.run(&running, args.ticks)?;
    if !running.load(Ordering::SeqCst) {
        info!("Received shutdown signal");
    }
    Ok(())
}

/// Setup tracing subscriber. `RUST_LOG` overrides `--verbose`, which
/// overrides the config log level.
fn setup_tracing(args: &Args, config_level: &str) {
    let default = if args.verbose { "debug" } else { config_level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    if args.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).compact().init();
    }
}
