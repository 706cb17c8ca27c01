//! Integration test: X-homing concurrency cap and the shared homing budget.

use lhk_common::hal::{Axis, AxisSettings};
use lhk_hal::{AxisBank, SimAxis, SimAxisConfig, SimOutputPort};
use lhk_motion::topology::{ArmConfig, TopologyConfig};
use lhk_motion::{AxisGroup, MotionError, MotionGroup, Topology};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// ── Helpers ─────────────────────────────────────────────────────────

const ARMS: u8 = 5;
const X_HOME_MS: u64 = 60;

fn axis(id: u8, home_time_ms: u64) -> SimAxisConfig {
    SimAxisConfig {
        id,
        name: format!("axis{id}"),
        settings: AxisSettings::new(300.0, 2000.0, 0.0, 600.0),
        home_time_ms,
        time_scale: 0.0,
        initial_position: 0.0,
        homed: false,
    }
}

/// `ARMS` arms; arm n uses axes 3n-2 (X), 3n-1 (Z) and 3n (W).
fn make_topology() -> (AxisBank, Topology) {
    let mut axes = Vec::new();
    let mut arms = Vec::new();
    for n in 1..=ARMS {
        let x = 3 * n - 2;
        axes.extend([axis(x, X_HOME_MS), axis(x + 1, 0), axis(x + 2, 0)]);
        arms.push(ArmConfig {
            x,
            z: x + 1,
            w: x + 2,
            w_shuck_offset_mm: 0.0,
            available: true,
        });
    }
    let bank = AxisBank::from_configs(&axes).unwrap();
    let config = TopologyConfig { arms, stages: Vec::new() };
    let topology = Topology::build(&config, &bank.axes(), Arc::new(SimOutputPort::new(4)), 2).unwrap();
    (bank, topology)
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn at_most_two_x_axes_home_at_once() {
    let (bank, topology) = make_topology();
    let permits = Arc::clone(topology.x_homing());
    let done = AtomicBool::new(false);
    let peak = AtomicUsize::new(0);

    let start = Instant::now();
    thread::scope(|scope| {
        scope.spawn(|| {
            while !done.load(Ordering::Acquire) {
                let in_use = permits.capacity() - permits.available();
                peak.fetch_max(in_use, Ordering::AcqRel);
                thread::sleep(Duration::from_millis(2));
            }
        });

        let homers: Vec<_> = topology
            .arms()
            .iter()
            .map(|arm| scope.spawn(move || arm.home_x()))
            .collect();
        for homer in homers {
            homer.join().unwrap().unwrap();
        }
        done.store(true, Ordering::Release);
    });
    let elapsed = start.elapsed();

    // Five homes through two permits take at least three rounds
    assert!(elapsed >= Duration::from_millis(3 * X_HOME_MS), "{elapsed:?}");
    assert!(peak.load(Ordering::Acquire) <= 2);
    assert_eq!(permits.available(), 2);
    for n in 1..=ARMS {
        assert!(bank.sim(3 * n - 2).unwrap().is_homed());
    }
}

#[test]
fn failed_x_home_releases_permit() {
    let (bank, topology) = make_topology();
    bank.sim(1).unwrap().fail_next_home("limit switch not found");

    let err = topology.arm(1).unwrap().home_x().unwrap_err();
    assert!(matches!(err, MotionError::Axis(ref fault) if fault.axis_id == 1));
    assert_eq!(topology.x_homing().available(), 2);

    topology.arm(1).unwrap().home_x().unwrap();
    assert_eq!(topology.x_homing().available(), 2);
}

#[test]
fn arm_home_wz_marks_group_homed_after_refresh() {
    let (bank, topology) = make_topology();
    let arm = topology.arm(3).unwrap();
    arm.home_x().unwrap();
    arm.home_wz().unwrap();

    assert!(!arm.is_homed(true).unwrap());
    assert!(arm.is_homed(false).unwrap());
    assert!(bank.sim(8).unwrap().is_homed());
    assert!(!topology.is_homed(false).unwrap());
}

#[test]
fn homing_budget_is_shared_across_axes() {
    let fast = Arc::new(
        SimAxis::new(1, "fast", AxisSettings::new(100.0, 1000.0, 0.0, 100.0))
            .with_home_duration(Duration::from_millis(80)),
    );
    let slow = Arc::new(
        SimAxis::new(2, "slow", AxisSettings::new(100.0, 1000.0, 0.0, 100.0))
            .with_home_duration(Duration::from_millis(200)),
    );
    let mut group = AxisGroup::new(1, "Pair");
    group.add_axis("F", fast.clone()).unwrap();
    group.add_axis("S", slow.clone()).unwrap();

    // 150ms would cover each axis on its own, but not both in sequence
    let err = group
        .home(&["F", "S"], Duration::from_millis(150))
        .unwrap_err();
    assert!(matches!(err, MotionError::Axis(ref fault) if fault.axis_id == 2));
    assert!(fast.is_homed());
    assert!(!slow.is_homed());

    group.home(&["F", "S"], Duration::from_millis(400)).unwrap();
    assert!(group.is_homed(false).unwrap());
}

#[test]
fn unknown_role_is_rejected_before_any_command() {
    let fast = Arc::new(SimAxis::new(1, "fast", AxisSettings::new(100.0, 1000.0, 0.0, 100.0)));
    let mut group = AxisGroup::new(1, "Single");
    group.add_axis("F", fast.clone()).unwrap();

    assert!(matches!(
        group.home(&["F", "Q"], Duration::from_millis(100)),
        Err(MotionError::UnknownRole { .. })
    ));
    assert!(fast.commands().is_empty());
    assert!(matches!(
        group.add_axis("F", fast.clone()),
        Err(MotionError::DuplicateRole { .. })
    ));
}
