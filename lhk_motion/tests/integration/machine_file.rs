//! Integration test: machine file → simulated axes → topology.

use super::common::{machine, machine_config, MACHINE_TOML};
use lhk_common::config::ConfigError;
use lhk_common::hal::Axis;
use lhk_motion::config::load_config;
use lhk_motion::topology::StageConfig;
use lhk_motion::{FluidicsConfig, Machine, MotionError, MotionGroup};
use std::fs;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

const LINES: [&str; 5] = ["bath_water", "plenum_water", "overflow_exhaust", "vacuum", "air"];

fn fluidics_with(bits: [usize; 5]) -> FluidicsConfig {
    FluidicsConfig {
        bath_water: bits[0],
        plenum_water: bits[1],
        overflow_exhaust: bits[2],
        vacuum: bits[3],
        air: bits[4],
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn machine_file_loads_from_disk() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("machine.toml");
    fs::write(&path, MACHINE_TOML).unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.shared.service_name, "integration");
    assert_eq!(config.axes.len(), 11);

    let machine = Machine::from_config(&config).unwrap();
    let topology = machine.topology();
    assert_eq!(topology.arms().len(), 2);
    assert_eq!(topology.stages().len(), 2);
    assert_eq!(topology.wash_stations().len(), 1);
    assert_eq!(machine.bank().len(), 11);
    assert_eq!(machine.outputs().len(), 8);
}

#[test]
fn missing_file_is_reported_with_path() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("absent.toml");
    assert!(matches!(load_config(&path), Err(ConfigError::FileNotFound(p)) if p == path));
}

#[test]
fn teachpoints_reach_every_stage() {
    let machine = machine();
    let topology = machine.topology();

    let stage = topology.stage(1).unwrap();
    assert_eq!(stage.stage().center_position(1).unwrap(), (130.0, 80.0));
    stage.move_to_robot_teachpoint(0).unwrap();
    assert_eq!(stage.stage().y_position().unwrap(), 210.0);
    assert_eq!(stage.stage().r_position().unwrap(), 12.0);

    let spacing = topology.arm_spacing(1, 2, 1).unwrap();
    assert!((spacing - 27.0).abs() < 1e-9);
}

#[test]
fn plunger_offset_from_machine_file() {
    let machine = machine();
    let arm = machine.topology().arm(2).unwrap();
    // 0.5mm at 4µL/mm
    assert_eq!(arm.w().offset_ul(), 2.0);

    arm.move_w_to_absolute_ul(40.0, true).unwrap();
    assert_eq!(arm.w().position_ul().unwrap(), 40.0);
    assert_eq!(machine.bank().sim(6).unwrap().position_mm().unwrap(), 10.5);
}

#[test]
fn missing_axis_fails_whole_build() {
    let mut config = machine_config();
    config.axes.retain(|axis| axis.id != 27);

    match Machine::from_config(&config) {
        Err(MotionError::MissingAxis { component, axis_id }) => {
            assert_eq!(component, "stage 2");
            assert_eq!(axis_id, 27);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn invalid_axis_settings_surface_as_hal_error() {
    let mut config = machine_config();
    config.axes[0].settings.max_limit = -1.0;
    assert!(matches!(
        Machine::from_config(&config),
        Err(MotionError::Hal(_))
    ));
}

#[test]
fn every_fluidic_collision_fails_construction() {
    let mut checked = 0;
    for first in 0..LINES.len() {
        for second in first + 1..LINES.len() {
            let mut bits = [0, 1, 2, 3, 4];
            bits[second] = bits[first];

            let mut config = machine_config();
            config.topology.stages[1] = StageConfig::WashStation {
                y: 22,
                a: 26,
                b: 27,
                fluidics: fluidics_with(bits),
            };
            match Machine::from_config(&config) {
                Err(MotionError::InvalidFluidics { component, reason }) => {
                    assert_eq!(component, "Wash station 2");
                    assert!(reason.contains(LINES[first]), "{reason}");
                    assert!(reason.contains(LINES[second]), "{reason}");
                }
                other => panic!("collision {first}/{second} accepted: {other:?}"),
            }
            checked += 1;
        }
    }
    assert_eq!(checked, 10);
}

#[test]
fn status_snapshot_is_stale_until_refreshed() {
    let machine = machine();
    let topology = machine.topology();
    let arm = topology.arm(1).unwrap();
    assert_eq!(arm.group().status("X").unwrap().position_mm, 0.0);

    machine.bank().sim(1).unwrap().set_position(250.0);
    assert_eq!(arm.group().status("X").unwrap().position_mm, 0.0);

    topology.refresh_all().unwrap();
    assert_eq!(arm.group().status("X").unwrap().position_mm, 250.0);
    assert_eq!(arm.name(), "Arm 1");
}
