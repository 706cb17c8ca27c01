//! Integration test: tip press strategies on a machine-file arm.

use super::common::machine;
use lhk_common::hal::Axis;
use lhk_hal::AxisCommand;
use lhk_motion::arm::POSITION_PRESS_ATTEMPTS;
use lhk_motion::{MotionError, PressFailure, PressRequest, PressStrategy};

// ── Helpers ─────────────────────────────────────────────────────────

fn position_press() -> PressRequest {
    PressRequest {
        z_teachpoint: 48.0,
        z_offset: 3.0,
        additional_push: 1.0,
        strategy: PressStrategy::PositionLimited,
    }
}

fn absolute_targets(commands: &[AxisCommand]) -> Vec<f64> {
    commands
        .iter()
        .filter_map(|c| match c {
            AxisCommand::MoveAbsolute { position, .. } => Some(*position),
            _ => None,
        })
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn position_press_succeeds_on_third_attempt() {
    let machine = machine();
    let arm = machine.topology().arm(1).unwrap();
    let z = machine.bank().sim(2).unwrap();
    z.set_position(5.0);
    z.fail_moves_to(50.0, 2, Some(47.0));

    let position = arm.press_tip(&position_press()).unwrap();
    assert_eq!(position, 50.0);
    // Back to the pre-press position between attempts
    assert_eq!(absolute_targets(&z.commands()), vec![50.0, 5.0, 50.0, 5.0, 50.0]);
}

#[test]
fn position_press_gives_up_after_all_attempts() {
    let machine = machine();
    let arm = machine.topology().arm(1).unwrap();
    let z = machine.bank().sim(2).unwrap();
    z.fail_moves_to(50.0, POSITION_PRESS_ATTEMPTS, Some(47.25));

    match arm.press_tip(&position_press()) {
        Err(MotionError::Press { axis_id, failure }) => {
            assert_eq!(axis_id, 2);
            assert_eq!(
                failure,
                PressFailure::RetriesExhausted {
                    attempts: 3,
                    commanded: 50.0,
                    actual: 47.25,
                    position_error: -2.75,
                }
            );
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(absolute_targets(&z.commands()), vec![50.0, 0.0, 50.0, 0.0, 50.0]);
    assert_eq!(z.position_mm().unwrap(), 47.25);
}

#[test]
fn position_press_does_not_swallow_other_faults() {
    let machine = machine();
    let arm = machine.topology().arm(1).unwrap();
    let z = machine.bank().sim(2).unwrap();
    z.fail_moves_to(50.0, 1, Some(47.0));
    // The return move itself faults: no further attempt
    z.fail_moves_to(0.0, 1, None);

    assert!(matches!(
        arm.press_tip(&position_press()),
        Err(MotionError::Axis(fault)) if fault.axis_id == 2
    ));
    assert_eq!(absolute_targets(&z.commands()), vec![50.0, 0.0]);
}

#[test]
fn torque_press_reports_stop_position() {
    let machine = machine();
    let arm = machine.topology().arm(2).unwrap();
    let z = machine.bank().sim(5).unwrap();
    let request = PressRequest {
        strategy: PressStrategy::TorqueLimited,
        ..position_press()
    };

    z.set_torque_stop(Some(51.2));
    assert_eq!(arm.press_tip(&request).unwrap(), 51.2);

    // Drove all the way to the overshoot target: nothing to seat on
    z.set_position(0.0);
    z.set_torque_stop(None);
    assert!(matches!(
        arm.press_tip(&request),
        Err(MotionError::Press { failure: PressFailure::NoTipPresent { .. }, .. })
    ));
    assert_eq!(z.position_mm().unwrap(), 52.0);
}
