//! External joint commands.
//!
//! Commands are produced outside the tick (protocol layer, runner, tests),
//! queued per joint and applied at the start of the next tick.

use serde::{Deserialize, Serialize};

use super::config::PidGainsConfig;
use super::state::ControlMode;

/// Selects one of the three PID instances of a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PidLoop {
    Position = 0,
    Torque = 1,
    Current = 2,
}

impl PidLoop {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Position),
            1 => Some(Self::Torque),
            2 => Some(Self::Current),
            _ => None,
        }
    }
}

impl Default for PidLoop {
    fn default() -> Self {
        Self::Position
    }
}

/// A command addressed to a single joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum JointCommand {
    /// Request a control mode change.
    SetControlMode(ControlMode),
    /// Start a trajectory from the current desired position to `position`.
    SetPosition { position: i32, velocity: i16 },
    /// Move by `delta` ticks spread over `ticks` control periods.
    RelativeMove { delta: i32, ticks: u32 },
    /// Velocity ramp target. `acceleration` 0 keeps the configured value.
    SetVelocity { velocity: i16, acceleration: i16 },
    /// Torque setpoint for `Torque` mode.
    SetTorque(i32),
    /// Replace the position limits.
    SetPositionLimits { min: i32, max: i32 },
    /// Replace the velocity limit.
    SetMaxVelocity(i16),
    /// Replace the gains of one PID loop.
    SetGains { pid: PidLoop, gains: PidGainsConfig },
    /// Set the position loop offset (the `OpenLoop` output).
    SetOffset(i16),
    /// Enter `CalibHardStops` pushing with `pwm`.
    CalibrateHardStops { pwm: i32 },
    /// Enter `CalibAbsPosSensor` and walk to `target` at `velocity`.
    CalibrateAbsolute { target: i32, velocity: i16 },
    /// Abort any running trajectory, holding the current desired position.
    StopTrajectory,
    EnablePad,
    DisablePad,
    /// Clear latched faults.
    ClearFaults,
}
