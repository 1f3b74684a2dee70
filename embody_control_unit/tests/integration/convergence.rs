//! Integration test: closed loop against the simulated motor plant.

use embody_common::control_unit::command::JointCommand;
use embody_common::control_unit::error::JointFault;
use embody_common::control_unit::state::{BoardProfile, ControlMode};
use embody_control_unit::config::LoadedConfig;
use embody_control_unit::cycle::CycleRunner;

use super::board_config;

fn runner(min: i32, max: i32) -> CycleRunner {
    let mut board = board_config(BoardProfile::Standard, 2);
    for joint in board.joints.iter_mut() {
        joint.min_position = min;
        joint.max_position = max;
    }
    CycleRunner::new(&LoadedConfig { board }).unwrap()
}

#[test]
fn position_move_settles_on_target() {
    let mut r = runner(-5000, 5000);
    r.bank_mut()
        .submit(0, JointCommand::SetControlMode(ControlMode::Position))
        .unwrap();
    r.run_unpaced(1);
    r.bank_mut()
        .submit(0, JointCommand::SetPosition { position: -1200, velocity: 3 })
        .unwrap();
    r.run_unpaced(300);
    assert!(!r.bank().status(0).unwrap().in_position);

    r.run_unpaced(2000);
    let s = r.bank().status(0).unwrap();
    assert!(s.in_position);
    assert_eq!(s.desired, -1200);
    assert!((s.position + 1200).abs() <= 5, "{}", s.position);
    // Untouched joint stays put.
    assert_eq!(r.board().position(1), Some(0));
}

#[test]
fn hard_stop_calibration_finds_the_stop() {
    // Mechanical stops sit 500 ticks beyond the limits.
    let mut r = runner(-1000, 1000);
    r.bank_mut()
        .submit(0, JointCommand::CalibrateHardStops { pwm: 1500 })
        .unwrap();

    let mut found_at = None;
    for k in 0..2000 {
        r.run_unpaced(1);
        if r.bank().status(0).unwrap().calibrated {
            found_at = Some(k);
            break;
        }
    }
    let k = found_at.expect("hard stop not found");
    let s = r.bank().status(0).unwrap();
    assert_eq!(s.hard_stop_position, Some(1500));
    assert!(s.faults.contains(JointFault::HARD_STOP));
    assert!(!s.faults.has_critical());
    assert_eq!(s.mode, ControlMode::HandleHardStops);
    assert!(r.bank().calibration_cycles() as usize >= k);

    // Next tick handles the stop: pad off, back to Idle, zero output.
    r.run_unpaced(1);
    let s = r.bank().status(0).unwrap();
    assert_eq!(s.mode, ControlMode::Idle);
    assert!(!s.pad_enabled);
    assert_eq!(r.board().pad_disable_count(0), 1);
    assert_eq!(r.board().duty(0), Some(0));

    // Hard-stop flag is informational: Position is still allowed.
    r.bank_mut().submit(0, JointCommand::EnablePad).unwrap();
    r.bank_mut()
        .submit(0, JointCommand::SetControlMode(ControlMode::Position))
        .unwrap();
    r.run_unpaced(1);
    assert_eq!(r.bank().status(0).unwrap().mode, ControlMode::Position);
    assert_eq!(r.bank().status(0).unwrap().desired, 1500);
}

#[test]
fn absolute_calibration_completes_with_trajectory() {
    let mut r = runner(-5000, 5000);
    r.bank_mut()
        .submit(0, JointCommand::CalibrateAbsolute { target: 300, velocity: 10 })
        .unwrap();
    r.run_unpaced(10);
    let joint = r.bank().joint(0).unwrap();
    assert_eq!(joint.mode.mode(), ControlMode::CalibAbsPosSensor);
    assert_eq!(joint.trajectory.desired_absolute, 100);
    assert!(!joint.calibrated);

    r.run_unpaced(25);
    let joint = r.bank().joint(0).unwrap();
    assert_eq!(joint.trajectory.desired_absolute, 300);
    assert!(joint.calibrated);
    // Not a Position-mode move.
    assert!(!joint.status().in_position);
}

#[test]
fn stop_trajectory_holds_position() {
    let mut r = runner(-5000, 5000);
    r.bank_mut()
        .submit(0, JointCommand::SetControlMode(ControlMode::Position))
        .unwrap();
    r.run_unpaced(1);
    r.bank_mut()
        .submit(0, JointCommand::SetPosition { position: 4000, velocity: 4 })
        .unwrap();
    r.run_unpaced(100);
    let held = r.bank().status(0).unwrap().desired;
    assert_eq!(held, 400);

    r.bank_mut().submit(0, JointCommand::StopTrajectory).unwrap();
    r.run_unpaced(50);
    let s = r.bank().status(0).unwrap();
    assert_eq!(s.desired, held);
    assert!(s.in_position);
}
