//! Feedback and actuator traits and HAL error types.
//!
//! This module defines:
//! - `HalError` enum - Error types for sensor reads
//! - `JointFeedback` trait - Encoder, strain, current and amplifier readings
//! - `JointActuator` trait - PWM duty and pad control
//! - `BoardIo` trait - Everything the tick needs from a board
//!
//! # Timing Contracts
//!
//! Every method is called from inside the tick and must return within a
//! small fraction of the cycle. Implementations must not block or allocate.

use thiserror::Error;

/// Error types for HAL reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// Joint index not wired on this board.
    #[error("Joint {0} not present on this board")]
    InvalidJoint(usize),

    /// Encoder read failed.
    #[error("Encoder read failed on joint {0}")]
    EncoderFault(usize),

    /// Strain gauge channel read failed.
    #[error("Strain channel {0} read failed")]
    StrainFault(u8),

    /// Current sensor read failed.
    #[error("Current sensor read failed on joint {0}")]
    CurrentFault(usize),
}

/// Sensor side of a motor-control board.
pub trait JointFeedback {
    /// Motor encoder position [ticks].
    fn read_encoder_position(&mut self, joint: usize) -> Result<i32, HalError>;

    /// Strain gauge torque sample for `channel`.
    fn read_strain_torque(&mut self, channel: u8) -> Result<i16, HalError>;

    /// Motor current [mA].
    fn read_current_sensor(&mut self, joint: usize) -> Result<i32, HalError>;

    /// True while the amplifier signals a fault.
    fn read_amplifier_fault(&mut self, joint: usize) -> bool;
}

/// Actuator side of a motor-control board.
pub trait JointActuator {
    /// Write the PWM duty (or current reference) for `joint`.
    fn write_pwm_duty(&mut self, joint: usize, duty: i32);

    /// Cut the actuator power stage.
    fn disable_actuator_pad(&mut self, joint: usize);

    /// Re-enable the actuator power stage.
    fn enable_actuator_pad(&mut self, joint: usize);
}

/// Full board interface used by the tick.
pub trait BoardIo: JointFeedback + JointActuator {}

impl<T: JointFeedback + JointActuator> BoardIo for T {}
