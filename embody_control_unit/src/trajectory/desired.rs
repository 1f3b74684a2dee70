//! Per-tick desired position generation.

use embody_common::control_unit::state::ControlMode;

use super::limits::{LimitClamp, check_desired_within_limits};
use super::profile::TrajectoryStepper;
use super::velocity::step_velocity;
use crate::control::fixed::l_add;
use crate::state::joint::{Setpoint, TrajectoryState};

/// Advance the trajectory of `joint` by one tick and enforce limits.
///
/// Records `previous_desired` before touching `desired`, updates `ended`
/// from the stepper, and returns the limit that was applied. Modes that do
/// not run a trajectory leave the state untouched.
pub fn compute_desired<S: TrajectoryStepper + ?Sized>(
    mode: ControlMode,
    joint: usize,
    traj: &mut TrajectoryState,
    sp: &mut Setpoint,
    stepper: &mut S,
    vel_shift: u8,
) -> LimitClamp {
    if !mode.runs_trajectory() {
        return LimitClamp::None;
    }

    let previous = traj.desired;
    traj.previous_desired = previous;

    match mode {
        ControlMode::Position | ControlMode::Impedance => {
            traj.desired = stepper.step(joint);
        }
        ControlMode::CalibAbsPosSensor => {
            traj.desired_absolute = stepper.step(joint);
        }
        ControlMode::Velocity => {
            let delta = l_add(stepper.step_delta(joint), step_velocity(traj, sp, vel_shift));
            traj.desired = l_add(traj.desired, delta);
        }
        _ => {}
    }
    traj.ended = stepper.is_ended(joint);

    check_desired_within_limits(mode, traj, sp, previous)
}
