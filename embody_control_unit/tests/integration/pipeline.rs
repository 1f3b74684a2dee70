//! Integration test: command → trajectory → PID → actuator, one tick at a time.

use embody_common::control_unit::command::JointCommand;
use embody_common::control_unit::config::PidGainsConfig;
use embody_common::control_unit::state::{BoardProfile, ControlMode};
use embody_control_unit::state::bank::ControllerBank;

use super::{ScriptedBoard, board_config};

// ── Helpers ─────────────────────────────────────────────────────────

fn position_bank(kd: i16) -> ControllerBank {
    let mut config = board_config(BoardProfile::Standard, 2);
    config.joints[0].position = PidGainsConfig {
        kd,
        ..PidGainsConfig::position_default()
    };
    ControllerBank::with_linear_profile(&config).unwrap()
}

fn enter(bank: &mut ControllerBank, io: &mut ScriptedBoard, joint: usize, mode: ControlMode) {
    bank.submit(joint, JointCommand::SetControlMode(mode)).unwrap();
    bank.tick(io);
    assert_eq!(bank.status(joint).unwrap().mode, mode);
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn step_of_1000_proportional_only() {
    let mut bank = position_bank(0);
    let mut io = ScriptedBoard::new();
    enter(&mut bank, &mut io, 0, ControlMode::Position);

    // Velocity 0 jumps straight to the target.
    bank.submit(0, JointCommand::SetPosition { position: 1000, velocity: 0 }).unwrap();
    bank.tick(&mut io);

    let s = bank.status(0).unwrap();
    assert_eq!(s.desired, 1000);
    assert_eq!(s.error, 1000);
    assert_eq!(s.output, 1250);
    assert_eq!(io.duty[0], 1250);
    assert!(s.in_position);
}

#[test]
fn step_of_1000_with_default_derivative() {
    let mut bank = position_bank(40);
    let mut io = ScriptedBoard::new();
    enter(&mut bank, &mut io, 0, ControlMode::Position);

    bank.submit(0, JointCommand::SetPosition { position: 1000, velocity: 0 }).unwrap();
    bank.tick(&mut io);
    // P = 1250, D = avg of [5000, 0 × 9] = 500.
    assert_eq!(io.duty[0], 1750);

    bank.tick(&mut io);
    // Error unchanged: D_raw = 0, history still holds the 5000.
    assert_eq!(io.duty[0], 1750);
}

#[test]
fn move_advances_at_commanded_velocity() {
    let mut bank = position_bank(40);
    let mut io = ScriptedBoard::new();
    enter(&mut bank, &mut io, 0, ControlMode::Position);

    bank.submit(0, JointCommand::SetPosition { position: 100, velocity: 7 }).unwrap();
    let mut desired = Vec::new();
    for _ in 0..16 {
        bank.tick(&mut io);
        desired.push(bank.status(0).unwrap().desired);
        io.position[0] = bank.status(0).unwrap().desired;
    }
    assert_eq!(&desired[..3], &[7, 14, 21]);
    assert_eq!(desired[13], 98);
    assert_eq!(desired[14], 100);
    assert_eq!(desired[15], 100);
    assert!(bank.status(0).unwrap().in_position);
}

#[test]
fn target_is_clamped_to_limits() {
    let mut bank = position_bank(0);
    let mut io = ScriptedBoard::new();
    enter(&mut bank, &mut io, 0, ControlMode::Position);

    bank.submit(0, JointCommand::SetPositionLimits { min: -500, max: 500 }).unwrap();
    bank.submit(0, JointCommand::SetPosition { position: 9000, velocity: 0 }).unwrap();
    bank.tick(&mut io);
    assert_eq!(bank.status(0).unwrap().desired, 500);
}

#[test]
fn handle_hard_stops_runs_exactly_once() {
    let mut bank = position_bank(40);
    let mut io = ScriptedBoard::new();
    enter(&mut bank, &mut io, 0, ControlMode::Position);
    bank.submit(0, JointCommand::SetPosition { position: 1000, velocity: 0 }).unwrap();
    bank.tick(&mut io);
    assert_ne!(io.duty[0], 0);

    bank.submit(0, JointCommand::SetControlMode(ControlMode::HandleHardStops)).unwrap();
    bank.tick(&mut io);
    let s = bank.status(0).unwrap();
    assert_eq!(s.mode, ControlMode::Idle);
    assert_eq!(s.output, 0);
    assert!(!s.pad_enabled);
    assert_eq!(io.pad_disables[0], 1);
    assert_eq!(io.duty[0], 0);

    for _ in 0..10 {
        bank.tick(&mut io);
        assert_eq!(bank.status(0).unwrap().mode, ControlMode::Idle);
        assert_eq!(io.duty[0], 0);
    }
    assert_eq!(io.pad_disables[0], 1);
    // The other joint never saw a pad disable.
    assert_eq!(io.pad_disables[1], 0);
}

#[test]
fn idle_ignores_errors_and_keeps_desired() {
    let mut bank = position_bank(40);
    let mut io = ScriptedBoard::new();
    io.position[0] = 5000;
    for _ in 0..5 {
        bank.tick(&mut io);
        let s = bank.status(0).unwrap();
        assert_eq!(s.output, 0);
        assert_eq!(s.desired, 0);
        assert!(!s.in_position);
    }
    assert_eq!(io.duty_writes[0], 5);
}

#[test]
fn position_command_outside_position_mode_does_not_move() {
    let mut bank = position_bank(0);
    let mut io = ScriptedBoard::new();
    enter(&mut bank, &mut io, 0, ControlMode::Velocity);

    bank.submit(0, JointCommand::SetPosition { position: 800, velocity: 0 }).unwrap();
    for _ in 0..5 {
        bank.tick(&mut io);
    }
    assert_eq!(bank.status(0).unwrap().desired, 0);
    assert_eq!(bank.joint(0).unwrap().setpoint.position, 800);
}

#[test]
fn velocity_mode_ramps_and_stops_at_limit() {
    let mut bank = position_bank(0);
    let mut io = ScriptedBoard::new();
    enter(&mut bank, &mut io, 0, ControlMode::Velocity);

    bank.submit(0, JointCommand::SetPositionLimits { min: -500, max: 500 }).unwrap();
    // 160 >> 4 = 10 ticks per tick once ramped, 16 per tick acceleration.
    bank.submit(0, JointCommand::SetVelocity { velocity: 160, acceleration: 16 }).unwrap();

    let mut previous = 0;
    for k in 0..200 {
        bank.tick(&mut io);
        let desired = bank.status(0).unwrap().desired;
        assert!(desired <= 500, "tick {k}: {desired}");
        assert!(desired >= previous, "tick {k}: {desired} < {previous}");
        previous = desired;
    }
    let joint = bank.joint(0).unwrap();
    assert_eq!(joint.trajectory.desired, 500);
    assert_eq!(joint.setpoint.velocity, 0);
    assert_eq!(joint.trajectory.desired_velocity, 0);
}

#[test]
fn velocity_mode_applies_relative_moves() {
    let mut bank = position_bank(0);
    let mut io = ScriptedBoard::new();
    io.position[0] = 40;
    enter(&mut bank, &mut io, 0, ControlMode::Velocity);
    assert_eq!(bank.status(0).unwrap().desired, 40);

    bank.submit(0, JointCommand::RelativeMove { delta: 103, ticks: 10 }).unwrap();
    for _ in 0..12 {
        bank.tick(&mut io);
    }
    assert_eq!(bank.status(0).unwrap().desired, 143);
}

#[test]
fn open_loop_outputs_offset() {
    let mut bank = position_bank(40);
    let mut io = ScriptedBoard::new();
    io.position[0] = 700;
    enter(&mut bank, &mut io, 0, ControlMode::OpenLoop);
    bank.submit(0, JointCommand::SetOffset(-321)).unwrap();
    bank.tick(&mut io);
    assert_eq!(io.duty[0], -321);
    assert_eq!(bank.status(0).unwrap().desired, 700);
}

#[test]
fn output_limit_clamps_final_command() {
    let mut bank = position_bank(0);
    let mut io = ScriptedBoard::new();
    enter(&mut bank, &mut io, 0, ControlMode::Position);
    bank.submit(
        0,
        JointCommand::SetGains {
            pid: embody_common::control_unit::command::PidLoop::Position,
            gains: PidGainsConfig {
                output_limit: 900,
                kd: 0,
                ..PidGainsConfig::position_default()
            },
        },
    )
    .unwrap();
    bank.submit(0, JointCommand::SetPosition { position: -1000, velocity: 0 }).unwrap();
    bank.tick(&mut io);
    assert_eq!(io.duty[0], -900);
}

#[test]
fn smoothing_filters_the_step() {
    let mut config = board_config(BoardProfile::Standard, 1);
    config.smoothing = true;
    config.joints[0].position.kd = 0;
    let mut bank = ControllerBank::with_linear_profile(&config).unwrap();
    let mut io = ScriptedBoard::new();
    enter(&mut bank, &mut io, 0, ControlMode::Position);

    bank.submit(0, JointCommand::SetPosition { position: 800, velocity: 0 }).unwrap();
    bank.tick(&mut io);
    // Raw command 1000: 0.0114 · (0 + 1000) = 11.4.
    assert_eq!(io.duty[0], 11);
    bank.tick(&mut io);
    // 0.9773 · 11.4 + 0.0114 · 2000 = 33.94.
    assert_eq!(io.duty[0], 33);
    for _ in 0..1000 {
        bank.tick(&mut io);
    }
    assert!((io.duty[0] - 1004).abs() <= 2, "{}", io.duty[0]);
}

#[test]
fn reentering_position_at_rest_has_no_derivative_kick() {
    let mut bank = position_bank(40);
    let mut io = ScriptedBoard::new();
    enter(&mut bank, &mut io, 0, ControlMode::Position);

    // Stalled joint: the error sits at 1000 and fills the derivative history.
    bank.submit(0, JointCommand::SetPosition { position: 1000, velocity: 0 }).unwrap();
    for _ in 0..20 {
        bank.tick(&mut io);
    }
    assert_eq!(bank.status(0).unwrap().error, 1000);

    enter(&mut bank, &mut io, 0, ControlMode::Idle);
    enter(&mut bank, &mut io, 0, ControlMode::Position);
    let s = bank.status(0).unwrap();
    assert_eq!((s.desired, s.position, s.error), (0, 0, 0));
    assert_eq!(s.output, 0);
    assert_eq!(io.duty[0], 0);

    let pid = &bank.joint(0).unwrap().control.position;
    assert_eq!((pid.error_old, pid.integral, pid.derivative), (0, 0, 0));
}
