//! Joint fault bitflags.
//!
//! Faults are latched per joint until an explicit clear. Flags in
//! `CRITICAL_MASK` force the joint into `HandleHardStops` on the next tick.

use bitflags::bitflags;

bitflags! {
    /// Per-joint fault flags.
    ///
    /// CRITICAL flags (→ HandleHardStops): AMP_FAULT, OVERCURRENT, SENSOR_FAULT.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct JointFault: u8 {
        /// Amplifier reported a fault. **CRITICAL**.
        const AMP_FAULT      = 0x01;
        /// I²T integrator above its limit. **CRITICAL**.
        const OVERCURRENT    = 0x02;
        /// Encoder, strain or current sensor read failed. **CRITICAL**.
        const SENSOR_FAULT   = 0x04;
        /// Hard stop reached during calibration (informational).
        const HARD_STOP      = 0x08;
    }
}

impl JointFault {
    /// Mask of all CRITICAL flags that force `HandleHardStops`.
    pub const CRITICAL_MASK: Self = Self::from_bits_truncate(
        Self::AMP_FAULT.bits() | Self::OVERCURRENT.bits() | Self::SENSOR_FAULT.bits(),
    );

    /// Returns true if any CRITICAL flag is set.
    #[inline]
    pub const fn has_critical(&self) -> bool {
        self.intersects(Self::CRITICAL_MASK)
    }
}

impl Default for JointFault {
    fn default() -> Self {
        Self::empty()
    }
}
