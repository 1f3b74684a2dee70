//! Shared fixtures for the integration tests.

mod config;
mod convergence;
mod faults;
mod pipeline;

use embody_common::control_unit::config::{BoardConfig, JointConfig};
use embody_common::control_unit::state::BoardProfile;
use embody_common::hal::driver::{HalError, JointActuator, JointFeedback};

pub const JOINTS: usize = 4;

/// Scripted board: feedback is set by the test, writes are recorded.
#[derive(Debug, Default)]
pub struct ScriptedBoard {
    pub position: [i32; JOINTS],
    pub strain: [i16; JOINTS],
    pub current: [i32; JOINTS],
    pub amp_fault: [bool; JOINTS],
    pub encoder_broken: [bool; JOINTS],
    pub duty: [i32; JOINTS],
    pub pad_enabled: [bool; JOINTS],
    pub pad_disables: [u32; JOINTS],
    pub duty_writes: [u32; JOINTS],
}

impl ScriptedBoard {
    pub fn new() -> Self {
        Self {
            pad_enabled: [true; JOINTS],
            ..Self::default()
        }
    }
}

impl JointFeedback for ScriptedBoard {
    fn read_encoder_position(&mut self, joint: usize) -> Result<i32, HalError> {
        match self.encoder_broken.get(joint) {
            None => Err(HalError::InvalidJoint(joint)),
            Some(true) => Err(HalError::EncoderFault(joint)),
            Some(false) => Ok(self.position[joint]),
        }
    }

    fn read_strain_torque(&mut self, channel: u8) -> Result<i16, HalError> {
        self.strain
            .get(channel as usize)
            .copied()
            .ok_or(HalError::StrainFault(channel))
    }

    fn read_current_sensor(&mut self, joint: usize) -> Result<i32, HalError> {
        self.current.get(joint).copied().ok_or(HalError::CurrentFault(joint))
    }

    fn read_amplifier_fault(&mut self, joint: usize) -> bool {
        self.amp_fault.get(joint).copied().unwrap_or(false)
    }
}

impl JointActuator for ScriptedBoard {
    fn write_pwm_duty(&mut self, joint: usize, duty: i32) {
        self.duty[joint] = duty;
        self.duty_writes[joint] += 1;
    }

    fn disable_actuator_pad(&mut self, joint: usize) {
        self.pad_enabled[joint] = false;
        self.pad_disables[joint] += 1;
    }

    fn enable_actuator_pad(&mut self, joint: usize) {
        self.pad_enabled[joint] = true;
    }
}

/// Board config with `n` default joints, strain channel = joint id.
pub fn board_config(profile: BoardProfile, n: u8) -> BoardConfig {
    BoardConfig {
        board_id: 1,
        profile,
        cycle_time_us: 1000,
        smoothing: false,
        impedance_sign: -1,
        log_level: Default::default(),
        decoupling: None,
        joints: (0..n)
            .map(|id| JointConfig {
                strain_channel: Some(id),
                ..JointConfig::with_id(id)
            })
            .collect(),
    }
}
