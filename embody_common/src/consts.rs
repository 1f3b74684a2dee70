//! Board-wide constants for the emBODY joint control core.
//!
//! Single source of truth for fixed-point bounds, array capacities and the
//! firmware default gains. Imported by all crates; do not duplicate.

use static_assertions::const_assert;

/// Maximum number of joints handled by one motor-control board.
pub const MAX_JOINTS: usize = 12;

const_assert!(MAX_JOINTS > 0 && MAX_JOINTS <= u8::MAX as usize);

/// Upper bound of the 16-bit signed working range.
pub const MAX_16: i32 = i16::MAX as i32;

/// Lower bound of the 16-bit signed working range.
pub const MIN_16: i32 = i16::MIN as i32;

/// Control period expressed in trajectory ticks (1 tick = 1 ms).
pub const CONTROLLER_PERIOD: i32 = 1;

/// Default control cycle time in microseconds (1 kHz).
pub const CYCLE_TIME_US: u32 = 1000;

/// Accepted cycle time range [µs].
pub const CYCLE_TIME_US_MIN: u32 = 100;
pub const CYCLE_TIME_US_MAX: u32 = 10_000;

/// Depth of the derivative moving-average window.
pub const DERIVATIVE_HISTORY_DEPTH: usize = 10;

/// Largest usable right-shift for gains and velocity scaling.
pub const MAX_SHIFT: u8 = 15;

/// Maximum number of pending external commands per joint.
pub const COMMAND_QUEUE_DEPTH: usize = 8;

// ─── Trajectory defaults ────────────────────────────────────────────

/// Default symmetric position limit [encoder ticks].
pub const DEFAULT_MAX_POSITION: i32 = 16_000;

/// Default velocity limit [16·ticks/ms].
pub const DEFAULT_MAX_VELOCITY: i16 = 0x7fff / 2;

/// Default acceleration [16·ticks/ms²].
pub const DEFAULT_ACCELERATION: i16 = 0;

/// Default velocity shift (divide by 16).
pub const DEFAULT_VEL_SHIFT: u8 = 4;

// ─── Position loop defaults ─────────────────────────────────────────

pub const DEFAULT_POSITION_KP: i16 = 10;
pub const DEFAULT_POSITION_KD: i16 = 40;
pub const DEFAULT_POSITION_KI: i16 = 0;
pub const DEFAULT_POSITION_KR: u8 = 3;

/// Default integral accumulator limit.
pub const DEFAULT_INTEGRAL_LIMIT: i32 = 0x7fff;

// ─── Torque loop defaults ───────────────────────────────────────────

pub const DEFAULT_TORQUE_KP: i16 = 32;
pub const DEFAULT_TORQUE_KR: u8 = 10;

// ─── Current loop defaults ──────────────────────────────────────────

pub const DEFAULT_CURRENT_KP: i16 = 40;
pub const DEFAULT_CURRENT_KD: i16 = 30;
pub const DEFAULT_CURRENT_KI: i16 = 1;
pub const DEFAULT_CURRENT_KR: u8 = 6;

/// Default clamp applied to the position loop output in current cascade.
pub const DEFAULT_CURRENT_LIMIT: i32 = 250;

// ─── Fault monitor defaults ─────────────────────────────────────────

/// Continuous current above which the I²T integrator charges [mA].
pub const DEFAULT_MAX_ALLOWED_CURRENT: i32 = 1600;

/// I²T trip threshold (300 mA² × 20 000 ms).
pub const DEFAULT_I2T_LIMIT: i64 = 1_800_000_000;

/// Consecutive stalled ticks that identify a mechanical hard stop.
pub const DEFAULT_HARD_STOP_TICKS: u32 = 50;

/// Virtual spring stiffness used in impedance mode.
pub const DEFAULT_IMPEDANCE_STIFFNESS: i32 = 20;
