//! Prelude module for common re-exports.
//!
//! This module provides convenient re-exports of commonly used types
//! so that consumers can do `use embody_common::prelude::*;` and get
//! the most important types without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use embody_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel};
pub use crate::control_unit::config::{BoardConfig, DecouplingConfig, JointConfig, PidGainsConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CYCLE_TIME_US, MAX_16, MAX_JOINTS, MIN_16};

// ─── Control Unit ───────────────────────────────────────────────────
pub use crate::control_unit::command::{JointCommand, PidLoop};
pub use crate::control_unit::error::JointFault;
pub use crate::control_unit::state::{BoardProfile, ControlMode, ProfileBehavior};
pub use crate::control_unit::status::JointStatus;

// ─── HAL ────────────────────────────────────────────────────────────
pub use crate::hal::driver::{BoardIo, HalError, JointActuator, JointFeedback};

/// Default tick period as Duration.
pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_micros(CYCLE_TIME_US as u64);
