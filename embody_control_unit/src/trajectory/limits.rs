//! Directional position limit enforcement.
//!
//! A desired position outside `[min_position, max_position]` is clamped only
//! while it keeps moving further out. A trajectory that starts out of range
//! and walks back toward the legal interval is left alone.

use embody_common::control_unit::state::ControlMode;

use crate::state::joint::{Setpoint, TrajectoryState};

/// Which limit, if any, was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitClamp {
    None,
    Min,
    Max,
}

/// Clamp `traj.desired` against the setpoint limits.
///
/// Skipped in `CalibAbsPosSensor`. In `Velocity` mode a clamp also zeroes
/// the commanded velocity so the ramp decelerates.
pub fn check_desired_within_limits(
    mode: ControlMode,
    traj: &mut TrajectoryState,
    sp: &mut Setpoint,
    previous_desired: i32,
) -> LimitClamp {
    if mode == ControlMode::CalibAbsPosSensor {
        return LimitClamp::None;
    }

    let moving = traj.desired as i64 - previous_desired as i64;

    if traj.desired < sp.min_position && moving < 0 {
        traj.desired = sp.min_position;
        if mode == ControlMode::Velocity {
            sp.velocity = 0;
        }
        return LimitClamp::Min;
    }
    if traj.desired > sp.max_position && moving > 0 {
        traj.desired = sp.max_position;
        if mode == ControlMode::Velocity {
            sp.velocity = 0;
        }
        return LimitClamp::Max;
    }
    LimitClamp::None
}
