//! Integration test: wash station interlocks on a machine-file topology.

use super::common::machine;
use lhk_common::hal::Axis;
use lhk_common::teachpoint::WasherPosition;
use lhk_motion::{MotionGroup, StageMotion, WashStationState};

#[test]
fn stage_leaves_safe_zone_only_with_head_retracted() {
    let machine = machine();
    let topology = machine.topology();
    let stage = topology.stage(2).unwrap();
    let y = machine.bank().sim(22).unwrap();
    let a = machine.bank().sim(26).unwrap();
    let b = machine.bank().sim(27).unwrap();
    assert_eq!(y.position_mm().unwrap(), 200.0);

    // Plenum 5mm below retracted
    a.set_position(25.0);
    let err = stage.move_to(50.0, 0.0).unwrap_err();
    assert!(err.is_unsafe_motion());
    assert_eq!(y.motion_command_count(), 0);
    assert_eq!(a.motion_command_count(), 0);
    assert_eq!(b.motion_command_count(), 0);

    a.set_position(30.0);
    stage.move_to(50.0, 0.0).unwrap();
    assert_eq!(y.position_mm().unwrap(), 50.0);
}

#[test]
fn wash_cycle_through_the_trait_object() {
    let machine = machine();
    let topology = machine.topology();
    let station = topology
        .stage(2)
        .unwrap()
        .as_wash_station()
        .unwrap();
    let a = machine.bank().sim(26).unwrap();
    let b = machine.bank().sim(27).unwrap();

    station.set_state(WashStationState::Washing);
    station.move_to_washer().unwrap();
    station
        .move_washer(WasherPosition::Wash, true, true, 0.5)
        .unwrap();
    assert_eq!(a.position_mm().unwrap(), 10.0);
    assert_eq!(b.position_mm().unwrap(), 22.0);

    // Head engaged: stage stays put, even for a jog
    assert!(station.move_to(250.0, 0.0).unwrap_err().is_unsafe_motion());
    assert!(station.jog("Y", 1.0).unwrap_err().is_unsafe_motion());

    station.set_bath_water(true).unwrap();
    station.set_plenum_water(true).unwrap();
    station.set_bath_water(false).unwrap();
    station.set_plenum_water(false).unwrap();
    station.set_vacuum(true).unwrap();
    station.set_air(true).unwrap();
    station.move_washer(WasherPosition::Dry, true, true, 1.0).unwrap();
    station.set_air(false).unwrap();
    station.set_vacuum(false).unwrap();
    assert_eq!(machine.outputs().output_state(3), Some(false));
    assert_eq!(machine.outputs().writes().len(), 8);

    station.clear_for_stage().unwrap();
    assert!(station.is_y_safe_to_move().unwrap());
    station.move_to(250.0, 0.0).unwrap();
    station.set_state(WashStationState::ServingTips);
    assert_eq!(station.state(), WashStationState::ServingTips);
}

#[test]
fn washer_refuses_to_engage_over_the_plate_area() {
    let machine = machine();
    let station = machine.topology().wash_station(2).unwrap();
    let b = machine.bank().sim(27).unwrap();

    station.move_to(60.0, 0.0).unwrap();
    assert!(!station.is_washer_safe_to_move().unwrap());
    let err = station
        .move_washer(WasherPosition::Dry, false, true, 1.0)
        .unwrap_err();
    assert!(err.is_unsafe_motion());
    assert_eq!(b.motion_command_count(), 0);

    // Retracting is always allowed
    station
        .move_washer(WasherPosition::Retracted, true, true, 1.0)
        .unwrap();
}

#[test]
fn wash_station_homes_head_before_stage() {
    let machine = machine();
    let station = machine.topology().wash_station(2).unwrap();
    station.home_ab().unwrap();
    station.home(&["Y"], std::time::Duration::from_secs(1)).unwrap();
    assert!(station.is_homed(false).unwrap());
}
