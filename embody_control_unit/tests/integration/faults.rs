//! Integration test: fault latching, escalation and recovery.

use embody_common::control_unit::command::JointCommand;
use embody_common::control_unit::error::JointFault;
use embody_common::control_unit::state::{BoardProfile, ControlMode};
use embody_control_unit::state::bank::ControllerBank;

use super::{ScriptedBoard, board_config};

fn bank_with_i2t(limit: i64) -> ControllerBank {
    let mut config = board_config(BoardProfile::Standard, 2);
    for joint in config.joints.iter_mut() {
        joint.max_allowed_current = 1600;
        joint.i2t_limit = limit;
    }
    ControllerBank::with_linear_profile(&config).unwrap()
}

#[test]
fn i2t_trips_only_above_the_current_limit() {
    // Excess of 300 mA charges 90 000 per tick.
    let mut bank = bank_with_i2t(1_000_000);
    let mut io = ScriptedBoard::new();
    bank.submit(0, JointCommand::SetControlMode(ControlMode::Position)).unwrap();
    bank.submit(1, JointCommand::SetControlMode(ControlMode::Position)).unwrap();

    io.current = [1900, 1600, 0, 0];
    for _ in 0..11 {
        bank.tick(&mut io);
    }
    assert!(bank.status(0).unwrap().faults.is_empty());
    assert_eq!(bank.joint(0).unwrap().monitor.i2t_value(), 990_000);

    bank.tick(&mut io);
    let s = bank.status(0).unwrap();
    assert!(s.faults.contains(JointFault::OVERCURRENT));
    assert_eq!(s.mode, ControlMode::Idle);
    assert!(!s.pad_enabled);

    // At the limit exactly nothing accumulates.
    let s1 = bank.status(1).unwrap();
    assert!(s1.faults.is_empty());
    assert_eq!(s1.mode, ControlMode::Position);
    assert_eq!(bank.joint(1).unwrap().monitor.i2t_value(), 0);
}

#[test]
fn i2t_discharges_below_the_limit() {
    let mut bank = bank_with_i2t(1_000_000);
    let mut io = ScriptedBoard::new();
    io.current[0] = 1900;
    for _ in 0..5 {
        bank.tick(&mut io);
    }
    assert_eq!(bank.joint(0).unwrap().monitor.i2t_value(), 450_000);

    // Negative current counts by magnitude: 1000 below the limit drains
    // 360 000 per tick, floored at zero.
    io.current[0] = -1000;
    bank.tick(&mut io);
    assert_eq!(bank.joint(0).unwrap().monitor.i2t_value(), 90_000);
    bank.tick(&mut io);
    assert_eq!(bank.joint(0).unwrap().monitor.i2t_value(), 0);
}

#[test]
fn critical_fault_blocks_modes_until_cleared() {
    let mut bank = ControllerBank::with_linear_profile(&board_config(BoardProfile::Standard, 2)).unwrap();
    let mut io = ScriptedBoard::new();
    bank.submit(0, JointCommand::SetControlMode(ControlMode::Velocity)).unwrap();
    bank.tick(&mut io);

    io.amp_fault[0] = true;
    bank.tick(&mut io);
    io.amp_fault[0] = false;
    assert_eq!(bank.status(0).unwrap().mode, ControlMode::Idle);
    assert_eq!(io.pad_disables[0], 1);

    for mode in [
        ControlMode::Position,
        ControlMode::Velocity,
        ControlMode::OpenLoop,
        ControlMode::CalibHardStops,
    ] {
        bank.submit(0, JointCommand::SetControlMode(mode)).unwrap();
        bank.tick(&mut io);
        assert_eq!(bank.status(0).unwrap().mode, ControlMode::Idle, "{mode:?}");
        assert_eq!(bank.joint(0).unwrap().last_rejection, Some("fault latched"));
    }

    // Idle stays reachable.
    bank.submit(0, JointCommand::SetControlMode(ControlMode::Idle)).unwrap();
    bank.tick(&mut io);
    assert_eq!(io.pad_disables[0], 1);

    bank.submit(0, JointCommand::ClearFaults).unwrap();
    bank.submit(0, JointCommand::EnablePad).unwrap();
    bank.submit(0, JointCommand::SetControlMode(ControlMode::Position)).unwrap();
    bank.tick(&mut io);
    let s = bank.status(0).unwrap();
    assert_eq!(s.mode, ControlMode::Position);
    assert!(s.pad_enabled);
    assert!(io.pad_enabled[0]);
    assert!(s.faults.is_empty());

    // The other joint was never affected.
    assert!(bank.status(1).unwrap().faults.is_empty());
    assert_eq!(io.pad_disables[1], 0);
}

#[test]
fn sensor_failure_in_torque_mode() {
    let mut bank = ControllerBank::with_linear_profile(&board_config(BoardProfile::TorqueSensing, 1)).unwrap();
    let mut io = ScriptedBoard::new();
    bank.submit(0, JointCommand::SetControlMode(ControlMode::Torque)).unwrap();
    bank.tick(&mut io);
    assert_eq!(bank.status(0).unwrap().mode, ControlMode::Torque);

    io.encoder_broken[0] = true;
    bank.tick(&mut io);
    let s = bank.status(0).unwrap();
    assert!(s.faults.contains(JointFault::SENSOR_FAULT));
    assert_eq!(s.mode, ControlMode::Idle);
    assert_eq!(io.duty[0], 0);
}

#[test]
fn fault_while_idle_disables_the_pad() {
    let mut bank = ControllerBank::with_linear_profile(&board_config(BoardProfile::Standard, 2)).unwrap();
    let mut io = ScriptedBoard::new();
    bank.submit(0, JointCommand::EnablePad).unwrap();
    bank.tick(&mut io);
    assert!(bank.status(0).unwrap().pad_enabled);

    io.amp_fault[0] = true;
    for _ in 0..5 {
        bank.tick(&mut io);
    }
    let s = bank.status(0).unwrap();
    assert!(s.faults.contains(JointFault::AMP_FAULT));
    assert_eq!(s.mode, ControlMode::Idle);
    assert!(!s.pad_enabled);
    assert!(!io.pad_enabled[0]);
    // Dropped once, not every tick the fault stays latched.
    assert_eq!(io.pad_disables[0], 1);
    assert_eq!(io.duty[0], 0);

    // Re-arming needs the fault cleared first.
    io.amp_fault[0] = false;
    bank.submit(0, JointCommand::EnablePad).unwrap();
    bank.tick(&mut io);
    assert!(!bank.status(0).unwrap().pad_enabled);
    bank.submit(0, JointCommand::ClearFaults).unwrap();
    bank.submit(0, JointCommand::EnablePad).unwrap();
    bank.tick(&mut io);
    assert!(bank.status(0).unwrap().pad_enabled);
    assert!(io.pad_enabled[0]);

    assert_eq!(io.pad_disables[1], 0);
}

#[test]
fn overcurrent_while_idle_disables_the_pad() {
    let mut bank = bank_with_i2t(100_000);
    let mut io = ScriptedBoard::new();
    io.current[0] = 1900;
    bank.tick(&mut io);
    assert!(bank.status(0).unwrap().pad_enabled);

    bank.tick(&mut io);
    let s = bank.status(0).unwrap();
    assert!(s.faults.contains(JointFault::OVERCURRENT));
    assert!(!s.pad_enabled);
    assert_eq!(io.pad_disables[0], 1);
}

#[test]
fn full_queue_reports_error_and_drains_next_tick() {
    let mut bank = ControllerBank::with_linear_profile(&board_config(BoardProfile::Standard, 1)).unwrap();
    let mut io = ScriptedBoard::new();
    for k in 0..8 {
        bank.submit(0, JointCommand::SetTorque(k)).unwrap();
    }
    assert!(bank.submit(0, JointCommand::SetTorque(99)).is_err());
    bank.tick(&mut io);
    assert_eq!(bank.joint(0).unwrap().setpoint.torque, 7);
    assert!(bank.submit(0, JointCommand::SetTorque(99)).is_ok());
}
