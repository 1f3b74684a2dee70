//! Mode dispatcher and output composer.
//!
//! Selects the PID instance(s) for the active control mode, adds the loop
//! offset, applies optional smoothing and the output clamp, and returns the
//! command written to the actuator.
//!
//! Also defines `JointControlState`, which holds the three PID instances of a
//! joint and the smoothing filter.

use embody_common::control_unit::config::JointConfig;
use embody_common::control_unit::state::{ControlMode, ProfileBehavior};

use super::filters::OutputSmoother;
use super::fixed::{l_sub, sat16};
use super::pid::{PidGains, PidState, PidVariant, pid_compute, pid_step};

// ─── JointControlState ──────────────────────────────────────────────

/// Per-joint controller state.
#[derive(Debug, Clone, Default)]
pub struct JointControlState {
    pub position: PidState,
    pub torque: PidState,
    pub current: PidState,
    pub smoother: OutputSmoother,
}

impl JointControlState {
    /// Clear error history, derivative taps and integrals of all three
    /// loops. The smoother is left alone.
    #[inline]
    pub fn reset_loops(&mut self) {
        self.position.reset();
        self.torque.reset();
        self.current.reset();
    }

    /// Saturated error of the loop that drives `mode`.
    pub fn active_error(&self, mode: ControlMode) -> i32 {
        if mode.uses_position_loop() {
            self.position.error
        } else if mode.uses_torque_loop() {
            self.torque.error
        } else {
            0
        }
    }
}

/// Gains of the three loops of a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopGains {
    pub position: PidGains,
    pub torque: PidGains,
    pub current: PidGains,
}

impl From<&JointConfig> for LoopGains {
    fn from(cfg: &JointConfig) -> Self {
        Self {
            position: PidGains::from(&cfg.position),
            torque: PidGains::from(&cfg.torque),
            current: PidGains::from(&cfg.current),
        }
    }
}

// ─── Decoupling ─────────────────────────────────────────────────────

/// Torque-error mixing for one joint of a decoupled pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoupling {
    /// This joint's row of the mixing matrix.
    pub row: [i32; 2],
    /// Position of this joint in the pair (0 or 1).
    pub own: usize,
    /// Most recent raw torque error of the partner joint.
    pub partner_raw_error: i32,
}

impl Decoupling {
    /// Mix this joint's raw error with the partner's.
    #[inline]
    pub fn apply(&self, own_raw_error: i32) -> i32 {
        let mut errors = [0i64; 2];
        errors[self.own & 1] = own_raw_error as i64;
        errors[(self.own + 1) & 1] = self.partner_raw_error as i64;
        let mixed = self.row[0] as i64 * errors[0] + self.row[1] as i64 * errors[1];
        sat16(mixed.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }
}

// ─── Output Composition ─────────────────────────────────────────────

/// Board and joint settings the composer needs.
#[derive(Debug, Clone, Copy)]
pub struct OutputContext<'a> {
    pub gains: &'a LoopGains,
    pub behavior: ProfileBehavior,
    pub current_limit: i32,
    pub calibration_pwm: i32,
    pub smoothing: bool,
    pub decoupling: Option<Decoupling>,
}

/// Feedback and references for one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlInput {
    pub desired: i32,
    pub position: i32,
    pub desired_torque: i32,
    pub torque: i32,
    pub current: i32,
}

/// Virtual spring torque: `sign · stiffness · (position − desired)`.
#[inline]
pub fn impedance_torque(sign: i8, stiffness: i32, position: i32, desired: i32) -> i32 {
    let t = sign as i64 * stiffness as i64 * l_sub(position, desired) as i64;
    t.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Compute the actuator command for one joint in `mode`.
pub fn compose_output(
    state: &mut JointControlState,
    mode: ControlMode,
    ctx: &OutputContext<'_>,
    input: &ControlInput,
) -> i32 {
    let (raw, gains) = match mode {
        ControlMode::Idle | ControlMode::HandleHardStops => {
            state.smoother.reset();
            return 0;
        }
        ControlMode::Position | ControlMode::Velocity | ControlMode::CalibAbsPosSensor => {
            if ctx.behavior.current_cascade {
                (current_cascade(state, ctx, input), &ctx.gains.current)
            } else {
                let pid = pid_compute(
                    &mut state.position,
                    &ctx.gains.position,
                    PidVariant::Standard,
                    input.desired,
                    input.position,
                );
                (ctx.gains.position.with_offset(pid), &ctx.gains.position)
            }
        }
        ControlMode::Torque | ControlMode::Impedance => {
            state.torque.load_error(input.desired_torque, input.torque);
            if let Some(dec) = ctx.decoupling {
                let mixed = dec.apply(state.torque.raw_error);
                state.torque.set_error(mixed);
            }
            let pid = pid_step(&mut state.torque, &ctx.gains.torque, PidVariant::Standard);
            (ctx.gains.torque.with_offset(pid), &ctx.gains.torque)
        }
        ControlMode::OpenLoop => (ctx.gains.position.ko as i32, &ctx.gains.position),
        ControlMode::CalibHardStops => (ctx.calibration_pwm, &PidGains::UNLIMITED),
    };

    let smoothed = if ctx.smoothing {
        state.smoother.apply(raw)
    } else {
        raw
    };
    gains.limit_output(smoothed)
}

/// Position loop clamped to `±current_limit`, then the current loop.
fn current_cascade(state: &mut JointControlState, ctx: &OutputContext<'_>, input: &ControlInput) -> i32 {
    let pos = pid_compute(
        &mut state.position,
        &ctx.gains.position,
        PidVariant::Standard,
        input.desired,
        input.position,
    );
    let limit = ctx.current_limit.max(0);
    let desired_current = ctx.gains.position.with_offset(pos).clamp(-limit, limit);
    let pwm = pid_compute(
        &mut state.current,
        &ctx.gains.current,
        PidVariant::CurrentLoop,
        desired_current,
        input.current,
    );
    ctx.gains.current.with_offset(pwm)
}
