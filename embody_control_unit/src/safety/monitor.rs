//! In-position check, fault latching and hard-stop detection.

use embody_common::control_unit::config::JointConfig;
use embody_common::control_unit::error::JointFault;
use embody_common::control_unit::state::ControlMode;

use super::i2t::I2tMonitor;

/// Encoder movement below which a calibrating joint counts as stalled.
pub const HARD_STOP_TOLERANCE: i32 = 1;

/// True only in `Position` mode with the trajectory ended.
#[inline]
pub const fn check_in_position(mode: ControlMode, ended: bool) -> bool {
    matches!(mode, ControlMode::Position) && ended
}

// ─── Hard-Stop Detector ─────────────────────────────────────────────

/// Counts consecutive ticks without encoder movement.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardStopDetector {
    last_position: Option<i32>,
    stalled_ticks: u32,
}

impl HardStopDetector {
    /// Feed one encoder sample. Returns true once the joint has been stalled
    /// for `threshold` consecutive ticks.
    pub fn update(&mut self, position: i32, threshold: u32) -> bool {
        match self.last_position {
            Some(last) if (position as i64 - last as i64).abs() <= HARD_STOP_TOLERANCE as i64 => {
                self.stalled_ticks = self.stalled_ticks.saturating_add(1);
            }
            _ => {
                self.stalled_ticks = 0;
                self.last_position = Some(position);
            }
        }
        self.stalled_ticks >= threshold
    }

    #[inline]
    pub const fn stalled_ticks(&self) -> u32 {
        self.stalled_ticks
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ─── Fault Monitor ──────────────────────────────────────────────────

/// Latched fault flags plus the detectors that raise them.
#[derive(Debug, Clone)]
pub struct FaultMonitor {
    faults: JointFault,
    i2t: I2tMonitor,
    hard_stop: HardStopDetector,
}

impl FaultMonitor {
    pub fn new(cfg: &JointConfig) -> Self {
        Self {
            faults: JointFault::empty(),
            i2t: I2tMonitor::new(cfg.max_allowed_current, cfg.i2t_limit),
            hard_stop: HardStopDetector::default(),
        }
    }

    #[inline]
    pub const fn faults(&self) -> JointFault {
        self.faults
    }

    #[inline]
    pub const fn has_critical(&self) -> bool {
        self.faults.has_critical()
    }

    /// Latch `flags`. Returns true if a critical flag was newly set.
    #[inline]
    pub fn latch(&mut self, flags: JointFault) -> bool {
        let newly_critical = !self.faults.has_critical() && flags.has_critical();
        self.faults |= flags;
        newly_critical
    }

    /// Feed one current sample into the I²T integrator.
    pub fn update_current(&mut self, current: i32) -> bool {
        if self.i2t.update(current) {
            self.latch(JointFault::OVERCURRENT)
        } else {
            false
        }
    }

    #[inline]
    pub const fn i2t_value(&self) -> i64 {
        self.i2t.value()
    }

    /// Feed one encoder sample while calibrating against the hard stops.
    pub fn update_hard_stop(&mut self, position: i32, threshold: u32) -> bool {
        self.hard_stop.update(position, threshold)
    }

    pub fn reset_hard_stop(&mut self) {
        self.hard_stop.reset();
    }

    /// Clear every latched flag and discharge the I²T integrator.
    pub fn clear(&mut self) {
        self.faults = JointFault::empty();
        self.i2t.reset();
    }
}
