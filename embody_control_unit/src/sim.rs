//! Simulated board for host runs and integration tests.
//!
//! Each joint is a first-order motor plant driven by the PWM duty:
//! velocity relaxes toward `pwm · gain` with time constant `tau_ticks`, the
//! encoder integrates velocity, and two hard stops bound the travel. Motor
//! current is proportional to the duty and the strain gauge reads the motor
//! torque plus the spring load against the hard stops.

use embody_common::consts::MAX_JOINTS;
use embody_common::control_unit::config::BoardConfig;
use embody_common::hal::driver::{HalError, JointActuator, JointFeedback};

/// Plant parameters shared by all joints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantParams {
    /// Steady-state velocity per unit duty [ticks per tick].
    pub gain: f64,
    /// Velocity time constant [ticks].
    pub tau_ticks: f64,
    /// Motor current per unit duty [mA].
    pub current_per_duty: f64,
    /// Strain reading per unit duty.
    pub torque_per_duty: f64,
    /// Distance from the configured limits to the mechanical stops [ticks].
    pub stop_margin: i32,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            gain: 0.01,
            tau_ticks: 20.0,
            current_per_duty: 1.0,
            torque_per_duty: 0.5,
            stop_margin: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SimJoint {
    position: f64,
    velocity: f64,
    duty: i32,
    pad_enabled: bool,
    hard_stop_min: f64,
    hard_stop_max: f64,
    strain_channel: Option<u8>,
    amp_fault: bool,
    encoder_broken: bool,
    current_offset: i32,
}

/// Board stand-in implementing [`JointFeedback`] and [`JointActuator`].
#[derive(Debug, Clone)]
pub struct SimulatedBoard {
    params: PlantParams,
    joints: heapless::Vec<SimJoint, MAX_JOINTS>,
    pad_disables: [u32; MAX_JOINTS],
}

impl SimulatedBoard {
    /// One plant per configured joint, resting at 0 with the pad enabled.
    pub fn new(config: &BoardConfig, params: PlantParams) -> Self {
        let mut joints = heapless::Vec::new();
        for joint in config.joints_by_id().iter().take(MAX_JOINTS) {
            let sim = SimJoint {
                pad_enabled: true,
                hard_stop_min: joint.min_position.saturating_sub(params.stop_margin) as f64,
                hard_stop_max: joint.max_position.saturating_add(params.stop_margin) as f64,
                strain_channel: joint.strain_channel,
                ..SimJoint::default()
            };
            // Capacity matches MAX_JOINTS and the iterator is bounded by it.
            let _ = joints.push(sim);
        }
        Self {
            params,
            joints,
            pad_disables: [0; MAX_JOINTS],
        }
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Advance every plant by one tick.
    pub fn step(&mut self) {
        let p = self.params;
        let alpha = if p.tau_ticks > 1.0 { 1.0 / p.tau_ticks } else { 1.0 };
        for j in self.joints.iter_mut() {
            let drive = if j.pad_enabled { j.duty as f64 } else { 0.0 };
            j.velocity += (drive * p.gain - j.velocity) * alpha;
            j.position += j.velocity;
            if j.position <= j.hard_stop_min {
                j.position = j.hard_stop_min;
                j.velocity = j.velocity.max(0.0);
            } else if j.position >= j.hard_stop_max {
                j.position = j.hard_stop_max;
                j.velocity = j.velocity.min(0.0);
            }
        }
    }

    /// Encoder position of `joint`, rounded.
    pub fn position(&self, joint: usize) -> Option<i32> {
        self.joints.get(joint).map(|j| j.position.round() as i32)
    }

    /// Place `joint` at `position` at rest.
    pub fn set_position(&mut self, joint: usize, position: i32) {
        if let Some(j) = self.joints.get_mut(joint) {
            j.position = position as f64;
            j.velocity = 0.0;
        }
    }

    /// Last duty written to `joint`.
    pub fn duty(&self, joint: usize) -> Option<i32> {
        self.joints.get(joint).map(|j| j.duty)
    }

    pub fn pad_enabled(&self, joint: usize) -> Option<bool> {
        self.joints.get(joint).map(|j| j.pad_enabled)
    }

    /// Number of pad disable requests received for `joint`.
    pub fn pad_disable_count(&self, joint: usize) -> u32 {
        self.pad_disables.get(joint).copied().unwrap_or(0)
    }

    /// Mechanical stops of `joint`.
    pub fn hard_stops(&self, joint: usize) -> Option<(i32, i32)> {
        self.joints
            .get(joint)
            .map(|j| (j.hard_stop_min as i32, j.hard_stop_max as i32))
    }

    // ─── Fault Injection ────────────────────────────────────────────

    pub fn set_amplifier_fault(&mut self, joint: usize, fault: bool) {
        if let Some(j) = self.joints.get_mut(joint) {
            j.amp_fault = fault;
        }
    }

    pub fn set_encoder_broken(&mut self, joint: usize, broken: bool) {
        if let Some(j) = self.joints.get_mut(joint) {
            j.encoder_broken = broken;
        }
    }

    /// Add a constant to the current reading of `joint` [mA].
    pub fn set_current_offset(&mut self, joint: usize, offset: i32) {
        if let Some(j) = self.joints.get_mut(joint) {
            j.current_offset = offset;
        }
    }

    fn at_stop(j: &SimJoint) -> f64 {
        if j.position <= j.hard_stop_min {
            -1.0
        } else if j.position >= j.hard_stop_max {
            1.0
        } else {
            0.0
        }
    }
}

impl JointFeedback for SimulatedBoard {
    fn read_encoder_position(&mut self, joint: usize) -> Result<i32, HalError> {
        let j = self.joints.get(joint).ok_or(HalError::InvalidJoint(joint))?;
        if j.encoder_broken {
            return Err(HalError::EncoderFault(joint));
        }
        Ok(j.position.round() as i32)
    }

    fn read_strain_torque(&mut self, channel: u8) -> Result<i16, HalError> {
        let j = self
            .joints
            .iter()
            .find(|j| j.strain_channel == Some(channel))
            .ok_or(HalError::StrainFault(channel))?;
        let motor = if j.pad_enabled { j.duty as f64 * self.params.torque_per_duty } else { 0.0 };
        // Reaction of the stop cancels the motor torque while pushing into it.
        let reaction = if Self::at_stop(j) * motor > 0.0 { -motor } else { 0.0 };
        let torque = (motor + reaction).round();
        Ok(torque.clamp(i16::MIN as f64, i16::MAX as f64) as i16)
    }

    fn read_current_sensor(&mut self, joint: usize) -> Result<i32, HalError> {
        let j = self.joints.get(joint).ok_or(HalError::CurrentFault(joint))?;
        let drive = if j.pad_enabled { j.duty as f64 } else { 0.0 };
        Ok((drive * self.params.current_per_duty).round() as i32 + j.current_offset)
    }

    fn read_amplifier_fault(&mut self, joint: usize) -> bool {
        self.joints.get(joint).is_some_and(|j| j.amp_fault)
    }
}

impl JointActuator for SimulatedBoard {
    fn write_pwm_duty(&mut self, joint: usize, duty: i32) {
        if let Some(j) = self.joints.get_mut(joint) {
            j.duty = duty;
        }
    }

    fn disable_actuator_pad(&mut self, joint: usize) {
        if let Some(j) = self.joints.get_mut(joint) {
            j.pad_enabled = false;
            if let Some(count) = self.pad_disables.get_mut(joint) {
                *count += 1;
            }
        }
    }

    fn enable_actuator_pad(&mut self, joint: usize) {
        if let Some(j) = self.joints.get_mut(joint) {
            j.pad_enabled = true;
        }
    }
}
