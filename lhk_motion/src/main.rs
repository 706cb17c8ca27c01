//! # LHK
//!
//! Bring-up tool for the liquid-handling motion kernel running on
//! simulated axes.
//!
//! # Usage
//!
//! ```bash
//! # Validate the machine file and build the topology
//! lhk --config machine.toml check
//!
//! # Enable and home everything, X axes concurrently
//! lhk --config machine.toml -v home
//!
//! # Print every group's status snapshot as JSON logs
//! lhk --config machine.toml --json status
//! ```

use clap::{Parser, Subcommand};
use lhk_common::config::LogLevel;
use lhk_common::hal::consts::DEFAULT_CONFIG_PATH;
use lhk_motion::config::{load_config, MachineConfig};
use lhk_motion::{Machine, MotionGroup, MotionResult, Topology, WashStationState};
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// LHK - liquid-handling motion kernel
#[derive(Parser, Debug)]
#[command(name = "lhk")]
#[command(version)]
#[command(about = "Motion kernel bring-up on simulated hardware")]
struct Args {
    /// Path to the machine file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Load the machine file, build the topology and print a summary.
    Check,
    /// Enable every group and home it.
    Home,
    /// Refresh and print every group's status.
    Status,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args.config);
    setup_tracing(&args, config.as_ref().ok().map(|c| c.shared.log_level));

    info!("LHK v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&args, &config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }
}

fn run(args: &Args, config: &MachineConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Config OK: {} axes, {} arms, {} stages",
        config.axes.len(),
        config.topology.arms.len(),
        config.topology.stages.len()
    );
    let machine = Machine::from_config(config)?;
    let topology = machine.topology();

    match args.command {
        Command::Check => print_summary(topology),
        Command::Home => {
            let start = Instant::now();
            home_all(topology, config.home_timeout())?;
            info!(
                "Homing finished in {}ms, all homed: {}",
                start.elapsed().as_millis(),
                topology.is_homed(false)?
            );
        }
        Command::Status => {
            topology.refresh_all()?;
            print_status(topology);
        }
    }
    Ok(())
}

/// Enable, then home X of every arm concurrently, then W/Z, wash heads
/// and stages.
fn home_all(topology: &Topology, timeout: Duration) -> MotionResult<()> {
    topology.reset()?;
    for arm in topology.available_arms() {
        arm.enable(true)?;
    }
    for stage in topology.stages() {
        stage.enable(true)?;
    }

    // X homes are capped by the topology's permits, not by thread count
    thread::scope(|scope| {
        let handles: Vec<_> = topology
            .available_arms()
            .map(|arm| scope.spawn(move || arm.home_x()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect::<MotionResult<Vec<()>>>()
    })?;

    for arm in topology.available_arms() {
        arm.home(&["W", "Z"], timeout)?;
    }
    for station in topology.wash_stations() {
        station.home(&["A", "B"], timeout)?;
    }
    for stage in topology.stages() {
        let group = stage.group();
        let motion_roles: Vec<&str> = group
            .roles()
            .into_iter()
            .filter(|role| matches!(*role, "Y" | "R"))
            .collect();
        group.home(&motion_roles, timeout)?;
    }
    for station in topology.wash_stations() {
        station.set_state(WashStationState::ServingTips);
    }
    Ok(())
}

fn print_summary(topology: &Topology) {
    for arm in topology.arms() {
        println!(
            "{:<16} roles={:?} available={}",
            arm.to_string(),
            arm.group().roles(),
            arm.is_available()
        );
    }
    for stage in topology.stages() {
        let kind = if stage.as_wash_station().is_some() {
            "wash station"
        } else {
            "stage"
        };
        println!("{:<16} roles={:?} kind={}", stage.name(), stage.group().roles(), kind);
    }
}

fn print_status(topology: &Topology) {
    let groups = topology
        .arms()
        .iter()
        .map(|arm| arm.as_ref() as &dyn MotionGroup)
        .chain(topology.stages().iter().map(|stage| stage.as_motion_group()));
    for group in groups {
        for role in group.group().roles() {
            if let Some(status) = group.group().status(role) {
                println!(
                    "{:<16} {:<2} homed={:<5} enabled={:<5} position={:>9.3}mm",
                    group.name(),
                    role,
                    status.is_homed,
                    status.is_enabled,
                    status.position_mm
                );
            }
        }
    }
}

/// Setup tracing subscriber from CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: Option<LogLevel>) {
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        configured.unwrap_or_default()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

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
