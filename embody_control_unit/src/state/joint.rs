//! Per-joint control context.
//!
//! One `JointControlContext` per configured joint, created at board
//! initialization and owned by the `ControllerBank`. Every pipeline stage
//! receives the parts it needs by reference.

use embody_common::consts::COMMAND_QUEUE_DEPTH;
use embody_common::control_unit::command::JointCommand;
use embody_common::control_unit::config::JointConfig;
use embody_common::control_unit::status::JointStatus;
use heapless::Deque;

use super::mode::ModeStateMachine;
use crate::control::output::{JointControlState, LoopGains};
use crate::safety::monitor::FaultMonitor;

// ─── Setpoint ───────────────────────────────────────────────────────

/// Commanded values, written only when commands are applied at the start
/// of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Setpoint {
    /// Position target of the last move command.
    pub position: i32,
    /// Velocity mode target (`ticks/ms << vel_shift`).
    pub velocity: i16,
    /// Velocity ramp acceleration.
    pub acceleration: i16,
    /// Torque mode target.
    pub torque: i32,
    /// Velocity of position moves [ticks per tick].
    pub trajectory_velocity: i16,
    pub min_position: i32,
    pub max_position: i32,
    pub max_velocity: i16,
}

impl Setpoint {
    pub fn from_config(cfg: &JointConfig) -> Self {
        Self {
            acceleration: cfg.acceleration,
            min_position: cfg.min_position,
            max_position: cfg.max_position,
            max_velocity: cfg.max_velocity,
            ..Self::default()
        }
    }

    /// Clamp a position target into the limits.
    #[inline]
    pub fn clamp_position(&self, position: i32) -> i32 {
        position.clamp(self.min_position, self.max_position.max(self.min_position))
    }
}

// ─── Trajectory State ───────────────────────────────────────────────

/// Output of the trajectory generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrajectoryState {
    /// Desired encoder position.
    pub desired: i32,
    /// Desired absolute sensor position (absolute calibration only).
    pub desired_absolute: i32,
    /// Ramp velocity (`ticks/ms << vel_shift`).
    pub desired_velocity: i16,
    /// Sub-tick remainder of the velocity integration.
    pub velocity_accumulator: i16,
    /// Torque loop reference.
    pub desired_torque: i32,
    /// `desired` before this tick's update.
    pub previous_desired: i32,
    /// Trajectory reached its target.
    pub ended: bool,
}

impl TrajectoryState {
    /// Re-seed at `position` with the velocity ramp stopped.
    pub fn reseed(&mut self, position: i32) {
        *self = Self {
            desired: position,
            previous_desired: position,
            ended: true,
            ..Self::default()
        };
    }
}

// ─── Joint Parameters ───────────────────────────────────────────────

/// Per-joint parameters outside the PID gains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointParams {
    pub vel_shift: u8,
    pub calibration_pwm: i32,
    pub impedance_stiffness: i32,
    pub strain_channel: Option<u8>,
    pub current_limit: i32,
    pub hard_stop_ticks: u32,
}

impl From<&JointConfig> for JointParams {
    fn from(cfg: &JointConfig) -> Self {
        Self {
            vel_shift: cfg.vel_shift,
            calibration_pwm: cfg.calibration_pwm,
            impedance_stiffness: cfg.impedance_stiffness,
            strain_channel: cfg.strain_channel,
            current_limit: cfg.current_limit,
            hard_stop_ticks: cfg.hard_stop_ticks,
        }
    }
}

// ─── Joint Control Context ──────────────────────────────────────────

/// Everything the tick knows about one joint.
#[derive(Debug)]
pub struct JointControlContext {
    pub index: usize,
    pub params: JointParams,
    pub gains: LoopGains,
    pub setpoint: Setpoint,
    pub trajectory: TrajectoryState,
    pub control: JointControlState,
    pub mode: ModeStateMachine,
    pub monitor: FaultMonitor,
    pub pad_enabled: bool,
    pub calibrated: bool,
    pub hard_stop_position: Option<i32>,
    /// Last encoder reading.
    pub position: i32,
    /// Last current reading.
    pub current: i32,
    /// Last strain reading.
    pub torque: i32,
    /// Last command written to the actuator.
    pub output: i32,
    /// Reason of the most recent rejected command.
    pub last_rejection: Option<&'static str>,
    pub(crate) commands: Deque<JointCommand, COMMAND_QUEUE_DEPTH>,
}

impl JointControlContext {
    pub fn new(index: usize, cfg: &JointConfig) -> Self {
        Self {
            index,
            params: JointParams::from(cfg),
            gains: LoopGains::from(cfg),
            setpoint: Setpoint::from_config(cfg),
            trajectory: TrajectoryState::default(),
            control: JointControlState::default(),
            mode: ModeStateMachine::new(),
            monitor: FaultMonitor::new(cfg),
            pad_enabled: true,
            calibrated: false,
            hard_stop_position: None,
            position: 0,
            current: 0,
            torque: 0,
            output: 0,
            last_rejection: None,
            commands: Deque::new(),
        }
    }

    /// Number of commands waiting for the next tick.
    #[inline]
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    /// Snapshot for publication.
    pub fn status(&self) -> JointStatus {
        let mode = self.mode.mode();
        JointStatus {
            mode,
            in_position: crate::safety::monitor::check_in_position(mode, self.trajectory.ended),
            calibrated: self.calibrated,
            pad_enabled: self.pad_enabled,
            faults: self.monitor.faults(),
            output: self.output,
            position: self.position,
            desired: self.trajectory.desired,
            error: self.control.active_error(mode),
            hard_stop_position: self.hard_stop_position,
        }
    }
}
