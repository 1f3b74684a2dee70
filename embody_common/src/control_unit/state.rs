//! Control mode and board profile enums.
//!
//! All enums use `#[repr(u8)]` so they can travel in a single byte of a
//! command or status frame. `BoardProfile` replaces per-firmware-revision
//! build switches with a runtime table of behavior flags.

use serde::{Deserialize, Serialize};

// ─── Control Mode ───────────────────────────────────────────────────

/// Per-joint control mode.
///
/// Exactly one mode is active per joint per tick. Changes take effect at the
/// next tick boundary, either from an external command or from fault
/// escalation (`HandleHardStops` → `Idle`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControlMode {
    /// No control, output forced to 0.
    Idle = 0,
    /// Trajectory-tracking position loop.
    Position = 1,
    /// Velocity ramp integrated into the position setpoint.
    Velocity = 2,
    /// Torque loop against strain sensor feedback.
    Torque = 3,
    /// Virtual spring around the trajectory, closed through the torque loop.
    Impedance = 4,
    /// Constant output equal to the position loop offset.
    OpenLoop = 5,
    /// Absolute sensor calibration; encoder limits are bypassed.
    CalibAbsPosSensor = 6,
    /// Constant calibration PWM until a hard stop is found.
    CalibHardStops = 7,
    /// One-shot: disable the actuator pad and fall back to `Idle`.
    HandleHardStops = 8,
}

impl ControlMode {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Position),
            2 => Some(Self::Velocity),
            3 => Some(Self::Torque),
            4 => Some(Self::Impedance),
            5 => Some(Self::OpenLoop),
            6 => Some(Self::CalibAbsPosSensor),
            7 => Some(Self::CalibHardStops),
            8 => Some(Self::HandleHardStops),
            _ => None,
        }
    }

    /// Modes in which the trajectory generator advances every tick.
    #[inline]
    pub const fn runs_trajectory(&self) -> bool {
        matches!(
            self,
            Self::Position | Self::Velocity | Self::Impedance | Self::CalibAbsPosSensor
        )
    }

    /// Modes closed through the position PID.
    #[inline]
    pub const fn uses_position_loop(&self) -> bool {
        matches!(self, Self::Position | Self::Velocity | Self::CalibAbsPosSensor)
    }

    /// Modes closed through the torque PID.
    #[inline]
    pub const fn uses_torque_loop(&self) -> bool {
        matches!(self, Self::Torque | Self::Impedance)
    }

    /// Modes that may still be commanded while a fault is latched.
    #[inline]
    pub const fn allowed_while_faulted(&self) -> bool {
        matches!(self, Self::Idle | Self::HandleHardStops)
    }
}

impl Default for ControlMode {
    fn default() -> Self {
        Self::Idle
    }
}

// ─── Board Profile ──────────────────────────────────────────────────

/// Motor-control board variant.
///
/// Selected once at startup from the board configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BoardProfile {
    /// Position/velocity only, open loop available.
    Standard = 0,
    /// Adds a torque loop closed on a strain gauge channel.
    TorqueSensing = 1,
    /// Torque and impedance loops with optional pairwise error decoupling.
    ShoulderTorque = 2,
    /// Position loop cascaded into a current loop.
    CurrentCascade = 3,
}

impl BoardProfile {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Standard),
            1 => Some(Self::TorqueSensing),
            2 => Some(Self::ShoulderTorque),
            3 => Some(Self::CurrentCascade),
            _ => None,
        }
    }

    /// Behavior flags for this profile.
    pub const fn behavior(&self) -> ProfileBehavior {
        match self {
            Self::Standard => ProfileBehavior {
                torque_loop: false,
                impedance: false,
                open_loop: true,
                current_cascade: false,
                decoupling_allowed: false,
            },
            Self::TorqueSensing => ProfileBehavior {
                torque_loop: true,
                impedance: false,
                open_loop: false,
                current_cascade: false,
                decoupling_allowed: false,
            },
            Self::ShoulderTorque => ProfileBehavior {
                torque_loop: true,
                impedance: true,
                open_loop: false,
                current_cascade: false,
                decoupling_allowed: true,
            },
            Self::CurrentCascade => ProfileBehavior {
                torque_loop: false,
                impedance: false,
                open_loop: true,
                current_cascade: true,
                decoupling_allowed: false,
            },
        }
    }

    /// Returns true if joints on this board may be commanded into `mode`.
    pub const fn supports(&self, mode: ControlMode) -> bool {
        let b = self.behavior();
        match mode {
            ControlMode::Torque => b.torque_loop,
            ControlMode::Impedance => b.impedance,
            ControlMode::OpenLoop => b.open_loop,
            _ => true,
        }
    }
}

impl Default for BoardProfile {
    fn default() -> Self {
        Self::Standard
    }
}

/// Behavior matrix of a board profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileBehavior {
    /// `Torque` mode available (requires strain channels).
    pub torque_loop: bool,
    /// `Impedance` mode available.
    pub impedance: bool,
    /// `OpenLoop` mode available.
    pub open_loop: bool,
    /// Position loop output feeds a current loop instead of the PWM.
    pub current_cascade: bool,
    /// A torque-error decoupling matrix may be configured.
    pub decoupling_allowed: bool,
}
