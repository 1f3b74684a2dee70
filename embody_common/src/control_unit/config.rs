//! Board and joint configuration structures.
//!
//! All config types use `serde::Deserialize` for TOML loading. Optional
//! fields fall back to the firmware defaults in [`crate::consts`] through
//! `#[serde(default)]`. `BoardConfig::validate` runs once at load time and
//! rejects anything the tick could not execute safely.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, LogLevel};
use crate::consts::{
    CYCLE_TIME_US, CYCLE_TIME_US_MAX, CYCLE_TIME_US_MIN, DEFAULT_ACCELERATION,
    DEFAULT_CURRENT_KD, DEFAULT_CURRENT_KI, DEFAULT_CURRENT_KP, DEFAULT_CURRENT_KR,
    DEFAULT_CURRENT_LIMIT, DEFAULT_HARD_STOP_TICKS, DEFAULT_I2T_LIMIT,
    DEFAULT_IMPEDANCE_STIFFNESS, DEFAULT_INTEGRAL_LIMIT, DEFAULT_MAX_ALLOWED_CURRENT,
    DEFAULT_MAX_POSITION, DEFAULT_MAX_VELOCITY, DEFAULT_POSITION_KD, DEFAULT_POSITION_KI,
    DEFAULT_POSITION_KP, DEFAULT_POSITION_KR, DEFAULT_TORQUE_KP, DEFAULT_TORQUE_KR,
    DEFAULT_VEL_SHIFT, MAX_JOINTS, MAX_SHIFT,
};

use super::state::BoardProfile;

// ─── Top-Level Config ───────────────────────────────────────────────

/// Motor-control board configuration.
///
/// Loaded from TOML at startup. Immutable once the tick loop is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Board identifier, used in log output only.
    #[serde(default)]
    pub board_id: u8,

    /// Board variant driving the behavior table.
    #[serde(default)]
    pub profile: BoardProfile,

    /// Tick period in microseconds (default: 1000 = 1 ms).
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,

    /// Enable the output smoothing filter.
    #[serde(default)]
    pub smoothing: bool,

    /// Sign of the impedance spring (-1 or +1).
    #[serde(default = "default_impedance_sign")]
    pub impedance_sign: i8,

    /// Runner log level when `RUST_LOG` is unset.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Optional torque-error decoupling between two joints.
    #[serde(default)]
    pub decoupling: Option<DecouplingConfig>,

    /// Joint table. Ids must form `0..joints.len()`.
    pub joints: Vec<JointConfig>,
}

fn default_cycle_time_us() -> u32 {
    CYCLE_TIME_US
}

fn default_impedance_sign() -> i8 {
    -1
}

impl BoardConfig {
    /// Validate the whole board configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.joints.is_empty() {
            return Err(ConfigError::ValidationError("no joints configured".into()));
        }
        if self.joints.len() > MAX_JOINTS {
            return Err(ConfigError::ValidationError(format!(
                "{} joints configured, maximum is {MAX_JOINTS}",
                self.joints.len()
            )));
        }
        if !(CYCLE_TIME_US_MIN..=CYCLE_TIME_US_MAX).contains(&self.cycle_time_us) {
            return Err(ConfigError::ValidationError(format!(
                "cycle_time_us {} outside [{CYCLE_TIME_US_MIN}, {CYCLE_TIME_US_MAX}]",
                self.cycle_time_us
            )));
        }
        if self.impedance_sign != 1 && self.impedance_sign != -1 {
            return Err(ConfigError::ValidationError(format!(
                "impedance_sign must be -1 or 1, got {}",
                self.impedance_sign
            )));
        }

        let mut seen = [false; MAX_JOINTS];
        for joint in &self.joints {
            let idx = joint.id as usize;
            if idx >= self.joints.len() {
                return Err(ConfigError::ValidationError(format!(
                    "joint id {} outside 0..{}",
                    joint.id,
                    self.joints.len()
                )));
            }
            if seen[idx] {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate joint id {}",
                    joint.id
                )));
            }
            seen[idx] = true;

            joint
                .validate()
                .map_err(|e| ConfigError::ValidationError(format!("joint {}: {e}", joint.id)))?;

            let behavior = self.profile.behavior();
            if behavior.torque_loop && joint.strain_channel.is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "joint {}: profile {:?} requires a strain_channel",
                    joint.id, self.profile
                )));
            }
            if behavior.current_cascade && joint.current_limit <= 0 {
                return Err(ConfigError::ValidationError(format!(
                    "joint {}: current_limit must be > 0 for current cascade",
                    joint.id
                )));
            }
        }

        if let Some(dec) = &self.decoupling {
            if !self.profile.behavior().decoupling_allowed {
                return Err(ConfigError::ValidationError(format!(
                    "decoupling not supported by profile {:?}",
                    self.profile
                )));
            }
            let [a, b] = dec.joints;
            if a == b || a as usize >= self.joints.len() || b as usize >= self.joints.len() {
                return Err(ConfigError::ValidationError(format!(
                    "invalid decoupling pair [{a}, {b}]"
                )));
            }
        }

        Ok(())
    }

    /// Joints ordered by id, so that the table index equals the joint index.
    pub fn joints_by_id(&self) -> Vec<JointConfig> {
        let mut joints = self.joints.clone();
        joints.sort_by_key(|j| j.id);
        joints
    }
}

// ─── Decoupling ─────────────────────────────────────────────────────

/// Pairwise torque-error decoupling.
///
/// `error'[k] = Σ matrix[k][i] · raw_error[joints[i]]`, saturated to 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecouplingConfig {
    /// The two coupled joint indices.
    pub joints: [u8; 2],
    /// Integer mixing matrix.
    #[serde(default = "default_decoupling_matrix")]
    pub matrix: [[i32; 2]; 2],
}

fn default_decoupling_matrix() -> [[i32; 2]; 2] {
    [[1, 0], [0, 1]]
}

// ─── Joint Config ───────────────────────────────────────────────────

/// Per-joint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointConfig {
    /// Joint index on the board.
    pub id: u8,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// Lower position limit [encoder ticks].
    #[serde(default = "default_min_position")]
    pub min_position: i32,

    /// Upper position limit [encoder ticks].
    #[serde(default = "default_max_position")]
    pub max_position: i32,

    /// Velocity limit [ticks/ms << vel_shift].
    #[serde(default = "default_max_velocity")]
    pub max_velocity: i16,

    /// Velocity ramp acceleration [per tick, same scale as velocity].
    #[serde(default = "default_acceleration")]
    pub acceleration: i16,

    /// Right-shift applied to the ramp velocity.
    #[serde(default = "default_vel_shift")]
    pub vel_shift: u8,

    /// PWM applied while searching the hard stops.
    #[serde(default)]
    pub calibration_pwm: i32,

    /// Impedance spring constant.
    #[serde(default = "default_impedance_stiffness")]
    pub impedance_stiffness: i32,

    /// Strain gauge channel feeding the torque loop.
    #[serde(default)]
    pub strain_channel: Option<u8>,

    /// Clamp on the position loop output in current cascade.
    #[serde(default = "default_current_limit")]
    pub current_limit: i32,

    /// Current above which the I²T integrator charges.
    #[serde(default = "default_max_allowed_current")]
    pub max_allowed_current: i32,

    /// I²T trip threshold.
    #[serde(default = "default_i2t_limit")]
    pub i2t_limit: i64,

    /// Consecutive stalled ticks that identify a hard stop.
    #[serde(default = "default_hard_stop_ticks")]
    pub hard_stop_ticks: u32,

    /// Position loop gains.
    #[serde(default = "PidGainsConfig::position_default")]
    pub position: PidGainsConfig,

    /// Torque loop gains.
    #[serde(default = "PidGainsConfig::torque_default")]
    pub torque: PidGainsConfig,

    /// Current loop gains.
    #[serde(default = "PidGainsConfig::current_default")]
    pub current: PidGainsConfig,
}

fn default_min_position() -> i32 {
    -DEFAULT_MAX_POSITION
}
fn default_max_position() -> i32 {
    DEFAULT_MAX_POSITION
}
fn default_max_velocity() -> i16 {
    DEFAULT_MAX_VELOCITY
}
fn default_acceleration() -> i16 {
    DEFAULT_ACCELERATION
}
fn default_vel_shift() -> u8 {
    DEFAULT_VEL_SHIFT
}
fn default_impedance_stiffness() -> i32 {
    DEFAULT_IMPEDANCE_STIFFNESS
}
fn default_current_limit() -> i32 {
    DEFAULT_CURRENT_LIMIT
}
fn default_max_allowed_current() -> i32 {
    DEFAULT_MAX_ALLOWED_CURRENT
}
fn default_i2t_limit() -> i64 {
    DEFAULT_I2T_LIMIT
}
fn default_hard_stop_ticks() -> u32 {
    DEFAULT_HARD_STOP_TICKS
}

impl JointConfig {
    /// Joint with firmware defaults everywhere except the id.
    pub fn with_id(id: u8) -> Self {
        Self {
            id,
            name: String::new(),
            min_position: default_min_position(),
            max_position: default_max_position(),
            max_velocity: default_max_velocity(),
            acceleration: default_acceleration(),
            vel_shift: default_vel_shift(),
            calibration_pwm: 0,
            impedance_stiffness: default_impedance_stiffness(),
            strain_channel: None,
            current_limit: default_current_limit(),
            max_allowed_current: default_max_allowed_current(),
            i2t_limit: default_i2t_limit(),
            hard_stop_ticks: default_hard_stop_ticks(),
            position: PidGainsConfig::position_default(),
            torque: PidGainsConfig::torque_default(),
            current: PidGainsConfig::current_default(),
        }
    }

    /// Validate joint-local parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_position >= self.max_position {
            return Err(format!(
                "min_position ({}) must be < max_position ({})",
                self.min_position, self.max_position
            ));
        }
        if self.max_velocity < 0 {
            return Err(format!("max_velocity must be >= 0, got {}", self.max_velocity));
        }
        if self.acceleration < 0 {
            return Err(format!("acceleration must be >= 0, got {}", self.acceleration));
        }
        if self.vel_shift > MAX_SHIFT {
            return Err(format!("vel_shift {} > {MAX_SHIFT}", self.vel_shift));
        }
        if self.max_allowed_current < 0 {
            return Err("max_allowed_current must be >= 0".into());
        }
        if self.i2t_limit <= 0 {
            return Err("i2t_limit must be > 0".into());
        }
        if self.hard_stop_ticks == 0 {
            return Err("hard_stop_ticks must be > 0".into());
        }
        self.position.validate().map_err(|e| format!("position: {e}"))?;
        self.torque.validate().map_err(|e| format!("torque: {e}"))?;
        self.current.validate().map_err(|e| format!("current: {e}"))?;
        Ok(())
    }
}

// ─── PID Gains ──────────────────────────────────────────────────────

/// Fixed-point PID gains for one loop.
///
/// Effective gain is `k >> kr`. `ko` is a constant output offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGainsConfig {
    pub kp: i16,
    pub kd: i16,
    pub ki: i16,
    pub ko: i16,
    /// Shift gain: right shift applied to every product.
    pub kr: u8,
    /// Symmetric clamp of the integral accumulator.
    pub integral_limit: i32,
    /// Symmetric clamp of the final command, 0 = disabled.
    pub output_limit: i32,
}

impl Default for PidGainsConfig {
    fn default() -> Self {
        Self {
            kp: 0,
            kd: 0,
            ki: 0,
            ko: 0,
            kr: 0,
            integral_limit: DEFAULT_INTEGRAL_LIMIT,
            output_limit: 0,
        }
    }
}

impl PidGainsConfig {
    pub fn position_default() -> Self {
        Self {
            kp: DEFAULT_POSITION_KP,
            kd: DEFAULT_POSITION_KD,
            ki: DEFAULT_POSITION_KI,
            kr: DEFAULT_POSITION_KR,
            ..Self::default()
        }
    }

    pub fn torque_default() -> Self {
        Self {
            kp: DEFAULT_TORQUE_KP,
            kr: DEFAULT_TORQUE_KR,
            ..Self::default()
        }
    }

    pub fn current_default() -> Self {
        Self {
            kp: DEFAULT_CURRENT_KP,
            kd: DEFAULT_CURRENT_KD,
            ki: DEFAULT_CURRENT_KI,
            kr: DEFAULT_CURRENT_KR,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.kr > MAX_SHIFT {
            return Err(format!("kr {} > {MAX_SHIFT}", self.kr));
        }
        if self.integral_limit < 0 {
            return Err(format!("integral_limit must be >= 0, got {}", self.integral_limit));
        }
        if self.output_limit < 0 {
            return Err(format!("output_limit must be >= 0, got {}", self.output_limit));
        }
        Ok(())
    }
}
