//! Velocity ramp with delta-sigma position integration.
//!
//! The ramp velocity is expressed in `ticks/ms << vel_shift`. Each tick the
//! integer part (`|v| >> vel_shift`) is emitted as a position delta and the
//! discarded low bits go into a signed accumulator. Whenever the accumulator
//! holds at least one whole tick, that tick is emitted too, so the
//! integrated position never drifts from `v · t >> vel_shift` by more than
//! one count.
//!
//! The carry takes the accumulator's sign, not the current velocity's: after
//! a reversal the fraction collected in the old direction is paid back
//! before any count is emitted in the new one.

use embody_common::consts::CONTROLLER_PERIOD;

use crate::state::joint::{Setpoint, TrajectoryState};

/// Advance the velocity ramp by one tick and return the position delta.
///
/// Clamps the commanded velocity to `±max_velocity` (writing the clamp back
/// into the setpoint), moves the ramp velocity toward it by at most
/// `acceleration · CONTROLLER_PERIOD`, and integrates.
pub fn step_velocity(traj: &mut TrajectoryState, sp: &mut Setpoint, vel_shift: u8) -> i32 {
    let max_vel = sp.max_velocity.max(0);
    sp.velocity = sp.velocity.clamp(-max_vel, max_vel);

    let dv = sp.velocity as i32 - traj.desired_velocity as i32;
    let da = sp.acceleration as i32 * CONTROLLER_PERIOD;

    if dv.abs() < da {
        traj.desired_velocity = sp.velocity;
    } else if dv > 0 {
        traj.desired_velocity = (traj.desired_velocity as i32 + da) as i16;
    } else {
        traj.desired_velocity = (traj.desired_velocity as i32 - da) as i16;
    }

    integrate(traj, vel_shift)
}

/// Delta-sigma integration of `desired_velocity` into a position delta.
fn integrate(traj: &mut TrajectoryState, vel_shift: u8) -> i32 {
    let v = traj.desired_velocity as i32;
    let magnitude = v.abs();
    let whole = magnitude >> vel_shift;
    let fraction = magnitude - (whole << vel_shift);

    let signed_whole = if v > 0 { whole } else { -whole };
    let mut delta = signed_whole * CONTROLLER_PERIOD;

    let mut acc = traj.velocity_accumulator as i32;
    if v > 0 {
        acc += fraction;
    } else {
        acc -= fraction;
    }

    // Re-inject whole ticks in the accumulator's own direction.
    let carry = acc.abs() >> vel_shift;
    if acc > 0 {
        delta += carry * CONTROLLER_PERIOD;
        acc -= carry << vel_shift;
    } else {
        delta -= carry * CONTROLLER_PERIOD;
        acc += carry << vel_shift;
    }

    traj.velocity_accumulator = acc as i16;
    delta
}
