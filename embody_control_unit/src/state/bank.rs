//! Controller bank: all joints of a board and the per-tick pipeline.
//!
//! ## Tick Order (per joint, sequential)
//! 1. Read amplifier, encoder and current feedback; update I²T.
//! 2. Drain queued commands (one-tick latency).
//! 3. Read strain feedback when a torque loop is active.
//! 4. Escalate latched critical faults to `HandleHardStops`.
//! 5. Trajectory → limits → torque reference → PID(s) → output.
//! 6. Write the actuator, run hard-stop detection.
//!
//! Nothing in the tick allocates or blocks. Commands are queued into a
//! fixed-depth deque per joint by [`ControllerBank::submit`].

use embody_common::config::ConfigError;
use embody_common::consts::MAX_JOINTS;
use embody_common::control_unit::command::{JointCommand, PidLoop};
use embody_common::control_unit::config::{BoardConfig, DecouplingConfig};
use embody_common::control_unit::error::JointFault;
use embody_common::control_unit::state::{BoardProfile, ControlMode};
use embody_common::control_unit::status::JointStatus;
use embody_common::hal::driver::BoardIo;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::joint::JointControlContext;
use super::mode::{ModeEvent, ModeGuard, TransitionResult, leaves_idle};
use crate::control::output::{ControlInput, Decoupling, OutputContext, compose_output, impedance_torque};
use crate::control::pid::PidGains;
use crate::trajectory::desired::compute_desired;
use crate::trajectory::limits::LimitClamp;
use crate::trajectory::profile::{LinearProfile, TrajectoryStepper};

/// Errors returned when queueing a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Joint index not configured on this board.
    #[error("Joint {0} not configured")]
    InvalidJoint(usize),

    /// Joint command queue is full.
    #[error("Command queue full for joint {0}")]
    QueueFull(usize),

    /// Position limits are empty or inverted.
    #[error("Invalid position limits [{min}, {max}]")]
    InvalidLimits { min: i32, max: i32 },

    /// Gains failed validation.
    #[error("Invalid gains: {0}")]
    InvalidGains(String),
}

// The bank is built on one thread and moved into the tick thread.
static_assertions::assert_impl_all!(ControllerBank<LinearProfile>: Send);

/// Board-wide settings copied out of the configuration.
#[derive(Debug, Clone, Copy)]
struct BoardSettings {
    profile: BoardProfile,
    smoothing: bool,
    impedance_sign: i8,
}

/// All joint contexts of one board plus the shared trajectory stepper.
#[derive(Debug)]
pub struct ControllerBank<S: TrajectoryStepper = LinearProfile> {
    settings: BoardSettings,
    decoupling: Option<DecouplingConfig>,
    joints: heapless::Vec<JointControlContext, MAX_JOINTS>,
    stepper: S,
    calibration_cycles: u32,
    ticks: u64,
}

impl ControllerBank<LinearProfile> {
    /// Build a bank with the default linear trajectory profile.
    pub fn with_linear_profile(config: &BoardConfig) -> Result<Self, ConfigError> {
        Self::new(config, LinearProfile::new())
    }
}

impl<S: TrajectoryStepper> ControllerBank<S> {
    /// Validate `config` and create one context per joint.
    pub fn new(config: &BoardConfig, stepper: S) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut joints = heapless::Vec::new();
        for (index, joint) in config.joints_by_id().iter().enumerate() {
            joints
                .push(JointControlContext::new(index, joint))
                .map_err(|_| ConfigError::ValidationError(format!("more than {MAX_JOINTS} joints")))?;
        }

        Ok(Self {
            settings: BoardSettings {
                profile: config.profile,
                smoothing: config.smoothing,
                impedance_sign: config.impedance_sign,
            },
            decoupling: config.decoupling,
            joints,
            stepper,
            calibration_cycles: 0,
            ticks: 0,
        })
    }

    #[inline]
    pub fn profile(&self) -> BoardProfile {
        self.settings.profile
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    pub fn joint(&self, joint: usize) -> Option<&JointControlContext> {
        self.joints.get(joint)
    }

    /// Published status of `joint`.
    pub fn status(&self, joint: usize) -> Option<JointStatus> {
        self.joints.get(joint).map(JointControlContext::status)
    }

    /// Status of every joint, in joint order.
    pub fn statuses(&self) -> impl Iterator<Item = JointStatus> + '_ {
        self.joints.iter().map(JointControlContext::status)
    }

    /// Ticks spent in `CalibHardStops`, summed over all joints.
    #[inline]
    pub fn calibration_cycles(&self) -> u32 {
        self.calibration_cycles
    }

    /// Completed ticks.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[inline]
    pub fn stepper(&self) -> &S {
        &self.stepper
    }

    /// Queue a command for the next tick.
    pub fn submit(&mut self, joint: usize, command: JointCommand) -> Result<(), CommandError> {
        let ctx = self.joints.get_mut(joint).ok_or(CommandError::InvalidJoint(joint))?;

        match command {
            JointCommand::SetPositionLimits { min, max } if min >= max => {
                return Err(CommandError::InvalidLimits { min, max });
            }
            JointCommand::SetGains { gains, .. } => {
                gains.validate().map_err(CommandError::InvalidGains)?;
            }
            _ => {}
        }

        ctx.commands
            .push_back(command)
            .map_err(|_| CommandError::QueueFull(joint))
    }

    /// Run one control tick over all joints.
    pub fn tick<B: BoardIo + ?Sized>(&mut self, io: &mut B) {
        for j in 0..self.joints.len() {
            let decoupling = self.decoupling_for(j);
            let calibrating = tick_joint(
                &mut self.joints[j],
                &self.settings,
                decoupling,
                &mut self.stepper,
                io,
            );
            if calibrating {
                self.calibration_cycles = self.calibration_cycles.wrapping_add(1);
            }
        }
        self.ticks += 1;
    }

    /// Mixing row for `joint` if it belongs to the decoupled pair.
    fn decoupling_for(&self, joint: usize) -> Option<Decoupling> {
        let dec = self.decoupling?;
        let own = dec.joints.iter().position(|&j| j as usize == joint)?;
        let partner = dec.joints[1 - own] as usize;
        let partner_raw_error = self.joints.get(partner)?.control.torque.raw_error;
        Some(Decoupling {
            row: dec.matrix[own],
            own,
            partner_raw_error,
        })
    }
}

// ─── Per-Joint Tick ─────────────────────────────────────────────────

#[inline]
fn guard(ctx: &JointControlContext, settings: &BoardSettings) -> ModeGuard {
    ModeGuard {
        profile: settings.profile,
        faulted: ctx.monitor.has_critical(),
    }
}

/// Run the pipeline for one joint. Returns true if the joint spent this
/// tick calibrating against the hard stops.
fn tick_joint<S, B>(
    ctx: &mut JointControlContext,
    settings: &BoardSettings,
    decoupling: Option<Decoupling>,
    stepper: &mut S,
    io: &mut B,
) -> bool
where
    S: TrajectoryStepper,
    B: BoardIo + ?Sized,
{
    let j = ctx.index;

    // ── 1. Feedback ─────────────────────────────────────────
    if io.read_amplifier_fault(j) && ctx.monitor.latch(JointFault::AMP_FAULT) {
        warn!("Joint {j}: amplifier fault");
    }
    match io.read_encoder_position(j) {
        Ok(position) => ctx.position = position,
        Err(e) => {
            if ctx.monitor.latch(JointFault::SENSOR_FAULT) {
                warn!("Joint {j}: {e}");
            }
        }
    }
    match io.read_current_sensor(j) {
        Ok(current) => {
            ctx.current = current;
            if ctx.monitor.update_current(current) {
                warn!("Joint {j}: I2T overcurrent (filt={})", ctx.monitor.i2t_value());
            }
        }
        Err(e) => {
            if ctx.monitor.latch(JointFault::SENSOR_FAULT) {
                warn!("Joint {j}: {e}");
            }
        }
    }

    // ── 2. Commands ─────────────────────────────────────────
    while let Some(command) = ctx.commands.pop_front() {
        apply_command(ctx, command, settings, stepper, io);
    }

    // ── 3. Strain feedback ──────────────────────────────────
    if ctx.mode.mode().uses_torque_loop() {
        match ctx.params.strain_channel.map(|ch| io.read_strain_torque(ch)) {
            Some(Ok(torque)) => ctx.torque = torque as i32,
            Some(Err(e)) => {
                if ctx.monitor.latch(JointFault::SENSOR_FAULT) {
                    warn!("Joint {j}: {e}");
                }
            }
            None => ctx.torque = 0,
        }
    }

    // ── 4. Fault escalation ─────────────────────────────────
    if ctx.monitor.has_critical() {
        let from = ctx.mode.mode();
        let g = guard(ctx, settings);
        if let TransitionResult::Ok(to) = ctx.mode.handle_event(ModeEvent::CriticalFault, g) {
            if to != from {
                warn!(
                    "Joint {j}: faults {:?} force {:?} -> {:?}",
                    ctx.monitor.faults(),
                    from,
                    to
                );
            }
        }
        // Idle joints skip HandleHardStops, so the pad is dropped here.
        if ctx.mode.mode() == ControlMode::Idle && ctx.pad_enabled {
            io.disable_actuator_pad(j);
            ctx.pad_enabled = false;
            warn!("Joint {j}: faults {:?} disable actuator pad while idle", ctx.monitor.faults());
        }
    }

    let mode = ctx.mode.mode();

    // ── 5. Hard stop handling (one tick) ────────────────────
    if mode == ControlMode::HandleHardStops {
        io.disable_actuator_pad(j);
        ctx.pad_enabled = false;
        stepper.abort(j);
        ctx.control.smoother.reset();
        let g = guard(ctx, settings);
        ctx.mode.handle_event(ModeEvent::HardStopsHandled, g);
        ctx.output = 0;
        io.write_pwm_duty(j, 0);
        debug!("Joint {j}: actuator pad disabled, back to Idle");
        return false;
    }

    // ── 6. Trajectory and limits ────────────────────────────
    let clamp = compute_desired(
        mode,
        j,
        &mut ctx.trajectory,
        &mut ctx.setpoint,
        stepper,
        ctx.params.vel_shift,
    );
    if clamp != LimitClamp::None {
        debug!("Joint {j}: desired clamped to {:?} limit ({})", clamp, ctx.trajectory.desired);
    }

    // ── 7. Torque reference ─────────────────────────────────
    match mode {
        ControlMode::Torque => ctx.trajectory.desired_torque = ctx.setpoint.torque,
        ControlMode::Impedance => {
            ctx.trajectory.desired_torque = impedance_torque(
                settings.impedance_sign,
                ctx.params.impedance_stiffness,
                ctx.position,
                ctx.trajectory.desired,
            );
        }
        _ => {}
    }

    // ── 8. Output ───────────────────────────────────────────
    let out_ctx = OutputContext {
        gains: &ctx.gains,
        behavior: settings.profile.behavior(),
        current_limit: ctx.params.current_limit,
        calibration_pwm: ctx.params.calibration_pwm,
        smoothing: settings.smoothing,
        decoupling: if mode.uses_torque_loop() { decoupling } else { None },
    };
    let input = ControlInput {
        desired: ctx.trajectory.desired,
        position: ctx.position,
        desired_torque: ctx.trajectory.desired_torque,
        torque: ctx.torque,
        current: ctx.current,
    };
    let output = compose_output(&mut ctx.control, mode, &out_ctx, &input);
    ctx.output = output;
    io.write_pwm_duty(j, output);

    // ── 9. Calibration monitoring ───────────────────────────
    match mode {
        ControlMode::CalibHardStops => {
            if ctx.monitor.update_hard_stop(ctx.position, ctx.params.hard_stop_ticks) {
                ctx.calibrated = true;
                ctx.hard_stop_position = Some(ctx.position);
                ctx.monitor.latch(JointFault::HARD_STOP);
                ctx.monitor.reset_hard_stop();
                let g = guard(ctx, settings);
                ctx.mode.handle_event(ModeEvent::HardStopReached, g);
                info!("Joint {j}: hard stop found at {}", ctx.position);
            }
            true
        }
        ControlMode::CalibAbsPosSensor => {
            if ctx.trajectory.ended && !ctx.calibrated {
                ctx.calibrated = true;
                info!("Joint {j}: absolute calibration complete at {}", ctx.trajectory.desired_absolute);
            }
            false
        }
        _ => false,
    }
}

// ─── Command Application ────────────────────────────────────────────

fn apply_command<S, B>(
    ctx: &mut JointControlContext,
    command: JointCommand,
    settings: &BoardSettings,
    stepper: &mut S,
    io: &mut B,
) where
    S: TrajectoryStepper,
    B: BoardIo + ?Sized,
{
    let j = ctx.index;
    match command {
        JointCommand::SetControlMode(mode) => {
            request_mode(ctx, mode, settings, stepper);
        }
        JointCommand::SetPosition { position, velocity } => {
            let target = ctx.setpoint.clamp_position(position);
            ctx.setpoint.position = target;
            ctx.setpoint.trajectory_velocity = velocity;
            if matches!(ctx.mode.mode(), ControlMode::Position | ControlMode::Impedance) {
                stepper.start(j, ctx.trajectory.desired, target, velocity);
                ctx.trajectory.ended = stepper.is_ended(j);
            } else {
                debug!("Joint {j}: position {target} stored, not started in {:?}", ctx.mode.mode());
            }
        }
        JointCommand::RelativeMove { delta, ticks } => stepper.start_delta(j, delta, ticks),
        JointCommand::SetVelocity { velocity, acceleration } => {
            ctx.setpoint.velocity = velocity;
            if acceleration > 0 {
                ctx.setpoint.acceleration = acceleration;
            }
        }
        JointCommand::SetTorque(torque) => ctx.setpoint.torque = torque,
        JointCommand::SetPositionLimits { min, max } => {
            ctx.setpoint.min_position = min;
            ctx.setpoint.max_position = max;
        }
        JointCommand::SetMaxVelocity(v) => ctx.setpoint.max_velocity = v.max(0),
        JointCommand::SetGains { pid, gains } => {
            let gains = PidGains::from(&gains);
            match pid {
                PidLoop::Position => ctx.gains.position = gains,
                PidLoop::Torque => ctx.gains.torque = gains,
                PidLoop::Current => ctx.gains.current = gains,
            }
        }
        JointCommand::SetOffset(ko) => ctx.gains.position.ko = ko,
        JointCommand::CalibrateHardStops { pwm } => {
            ctx.params.calibration_pwm = pwm;
            if request_mode(ctx, ControlMode::CalibHardStops, settings, stepper) {
                ctx.calibrated = false;
                ctx.hard_stop_position = None;
                ctx.monitor.reset_hard_stop();
            }
        }
        JointCommand::CalibrateAbsolute { target, velocity } => {
            if request_mode(ctx, ControlMode::CalibAbsPosSensor, settings, stepper) {
                ctx.calibrated = false;
                ctx.trajectory.desired_absolute = ctx.trajectory.desired;
                stepper.start(j, ctx.trajectory.desired, target, velocity);
                ctx.trajectory.ended = stepper.is_ended(j);
            }
        }
        JointCommand::StopTrajectory => {
            stepper.abort(j);
            ctx.setpoint.velocity = 0;
        }
        JointCommand::EnablePad => {
            if ctx.monitor.has_critical() {
                ctx.last_rejection = Some("fault latched");
                warn!("Joint {j}: pad enable rejected, faults {:?}", ctx.monitor.faults());
            } else {
                io.enable_actuator_pad(j);
                ctx.pad_enabled = true;
            }
        }
        JointCommand::DisablePad => {
            io.disable_actuator_pad(j);
            ctx.pad_enabled = false;
        }
        JointCommand::ClearFaults => {
            if !ctx.monitor.faults().is_empty() {
                info!("Joint {j}: clearing faults {:?}", ctx.monitor.faults());
            }
            ctx.monitor.clear();
            ctx.last_rejection = None;
        }
    }
}

/// Run a mode request through the state machine. Returns true if accepted.
fn request_mode<S: TrajectoryStepper>(
    ctx: &mut JointControlContext,
    requested: ControlMode,
    settings: &BoardSettings,
    stepper: &mut S,
) -> bool {
    let j = ctx.index;
    let from = ctx.mode.mode();
    let g = guard(ctx, settings);
    match ctx.mode.handle_event(ModeEvent::Command(requested), g) {
        TransitionResult::Ok(to) => {
            if leaves_idle(from, to) {
                ctx.control.reset_loops();
                ctx.trajectory.reseed(ctx.position);
                ctx.setpoint.velocity = 0;
                stepper.start(j, ctx.position, ctx.position, 0);
            }
            if to != from {
                debug!("Joint {j}: {:?} -> {:?}", from, to);
            }
            true
        }
        TransitionResult::Rejected(reason) => {
            ctx.last_rejection = Some(reason);
            warn!("Joint {j}: {:?} request rejected: {reason}", requested);
            false
        }
    }
}
