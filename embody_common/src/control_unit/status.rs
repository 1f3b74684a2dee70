//! Per-joint status published after each tick.

use serde::{Deserialize, Serialize};

use super::error::JointFault;
use super::state::ControlMode;

/// Snapshot of one joint at the end of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JointStatus {
    pub mode: ControlMode,
    /// Position mode and trajectory ended.
    pub in_position: bool,
    /// Set by a completed calibration.
    pub calibrated: bool,
    /// Actuator pad state.
    pub pad_enabled: bool,
    /// Latched faults.
    #[serde(with = "fault_bits")]
    pub faults: JointFault,
    /// Last command written to the actuator.
    pub output: i32,
    /// Last encoder reading.
    pub position: i32,
    /// Desired position after limit enforcement.
    pub desired: i32,
    /// Saturated error of the active loop.
    pub error: i32,
    /// Encoder position where the hard stop was found, if any.
    pub hard_stop_position: Option<i32>,
}

impl JointStatus {
    /// True when any critical fault is latched.
    #[inline]
    pub const fn is_faulted(&self) -> bool {
        self.faults.has_critical()
    }
}

mod fault_bits {
    use super::JointFault;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(f: &JointFault, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(f.bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<JointFault, D::Error> {
        Ok(JointFault::from_bits_truncate(u8::deserialize(d)?))
    }
}
