//! Trajectory stepper interface and the default linear profile.
//!
//! A stepper produces one absolute position sample per tick (`step`) for
//! Position, Impedance and absolute calibration, plus an incremental sample
//! (`step_delta`) that Velocity mode adds on top of its ramp.

use embody_common::consts::MAX_JOINTS;

/// Per-joint trajectory generator.
pub trait TrajectoryStepper {
    /// Start a move from `from` to `to` at `velocity` [ticks per tick].
    fn start(&mut self, joint: usize, from: i32, to: i32, velocity: i16);

    /// Start a relative move of `delta` spread over `ticks` steps.
    fn start_delta(&mut self, joint: usize, delta: i32, ticks: u32);

    /// Stop the running move, holding the last sample.
    fn abort(&mut self, joint: usize);

    /// Next absolute sample.
    fn step(&mut self, joint: usize) -> i32;

    /// Next relative increment, 0 when no relative move is running.
    fn step_delta(&mut self, joint: usize) -> i32;

    /// True when the absolute move reached its target (or was aborted).
    fn is_ended(&self, joint: usize) -> bool;
}

// ─── Linear Profile ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    current: i32,
    target: i32,
    velocity: i32,
    active: bool,
    delta_remaining: i32,
    delta_ticks: u32,
}

/// Constant-velocity profile, one slot per joint.
///
/// The absolute move advances by `velocity` each tick and lands exactly on
/// the target. A relative move distributes its delta evenly, pushing the
/// remainder into the last steps.
#[derive(Debug, Clone)]
pub struct LinearProfile {
    slots: [Slot; MAX_JOINTS],
}

impl Default for LinearProfile {
    fn default() -> Self {
        Self {
            slots: [Slot::default(); MAX_JOINTS],
        }
    }
}

impl LinearProfile {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrajectoryStepper for LinearProfile {
    fn start(&mut self, joint: usize, from: i32, to: i32, velocity: i16) {
        let Some(slot) = self.slots.get_mut(joint) else {
            return;
        };
        slot.current = from;
        slot.target = to;
        slot.velocity = (velocity as i32).abs();
        if from == to || slot.velocity == 0 {
            slot.current = to;
            slot.active = false;
        } else {
            slot.active = true;
        }
    }

    fn start_delta(&mut self, joint: usize, delta: i32, ticks: u32) {
        if let Some(slot) = self.slots.get_mut(joint) {
            slot.delta_remaining = delta;
            slot.delta_ticks = ticks.max(1);
        }
    }

    fn abort(&mut self, joint: usize) {
        if let Some(slot) = self.slots.get_mut(joint) {
            slot.active = false;
            slot.target = slot.current;
            slot.delta_remaining = 0;
            slot.delta_ticks = 0;
        }
    }

    fn step(&mut self, joint: usize) -> i32 {
        let Some(slot) = self.slots.get_mut(joint) else {
            return 0;
        };
        if slot.active {
            let remaining = slot.target as i64 - slot.current as i64;
            if remaining.abs() <= slot.velocity as i64 {
                slot.current = slot.target;
                slot.active = false;
            } else {
                let step = if remaining > 0 { slot.velocity } else { -slot.velocity };
                slot.current = slot.current.saturating_add(step);
            }
        }
        slot.current
    }

    fn step_delta(&mut self, joint: usize) -> i32 {
        let Some(slot) = self.slots.get_mut(joint) else {
            return 0;
        };
        if slot.delta_ticks == 0 {
            return 0;
        }
        let inc = slot.delta_remaining / slot.delta_ticks as i32;
        slot.delta_remaining -= inc;
        slot.delta_ticks -= 1;
        if slot.delta_ticks == 0 {
            let rest = slot.delta_remaining;
            slot.delta_remaining = 0;
            return inc.saturating_add(rest);
        }
        inc
    }

    fn is_ended(&self, joint: usize) -> bool {
        self.slots.get(joint).is_none_or(|s| !s.active)
    }
}
