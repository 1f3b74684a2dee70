//! Fixed-point PID with shift gains, averaged derivative and clamped
//! integral.
//!
//! Every product is scaled by `>> kr` with a sign-preserving shift. Zero Ki
//! keeps the integral at its current value; zero Kd drains the derivative
//! history to zero over ten ticks.
//!
//! The error is loaded in a separate step ([`PidState::load_error`]) so that a
//! board-level decoupling stage can rewrite it before [`pid_step`] runs.

use embody_common::consts::MAX_SHIFT;
use embody_common::control_unit::config::PidGainsConfig;

use super::fixed::{l_add, l_sub, mul_shift, sat16};
use super::history::DerivativeHistory;

/// Integral pre-clamp behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PidVariant {
    /// Per-tick integral increment saturated to 16 bits before accumulation.
    #[default]
    Standard,
    /// Current loop: the increment is accumulated unclamped; only the
    /// accumulator limit applies.
    CurrentLoop,
}

/// Internal state of one PID instance.
///
/// Errors, derivative history and integral persist across ticks and are
/// cleared when the joint leaves `Idle`.
#[derive(Debug, Clone, Default)]
pub struct PidState {
    /// Error used by the algorithm (after optional decoupling).
    pub error: i32,
    /// Error of the previous tick.
    pub error_old: i32,
    /// Saturated error before decoupling.
    pub raw_error: i32,
    history: DerivativeHistory,
    /// Integral accumulator, always within `±integral_limit`.
    pub integral: i32,
    pub proportional: i32,
    pub derivative: i32,
    pub pd: i32,
    /// Last output before the `ko` offset.
    pub output: i32,
}

impl PidState {
    /// Reset all internal state to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Shift the error history and load `desired − feedback`, saturated to
    /// 16 bits. Returns the saturated error.
    #[inline]
    pub fn load_error(&mut self, desired: i32, feedback: i32) -> i32 {
        self.load_raw_error(l_sub(desired, feedback))
    }

    /// Like [`load_error`](Self::load_error) for an error computed elsewhere.
    #[inline]
    pub fn load_raw_error(&mut self, error: i32) -> i32 {
        self.error_old = self.error;
        self.raw_error = sat16(error);
        self.error = self.raw_error;
        self.raw_error
    }

    /// Replace the working error (decoupling hook).
    #[inline]
    pub fn set_error(&mut self, error: i32) {
        self.error = sat16(error);
    }
}

/// PID gains in firmware units. Effective gain is `k >> kr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidGains {
    pub kp: i16,
    pub kd: i16,
    pub ki: i16,
    /// Output offset added by the caller.
    pub ko: i16,
    pub kr: u8,
    pub integral_limit: i32,
    /// Final command clamp, 0 = disabled.
    pub output_limit: i32,
}

impl From<&PidGainsConfig> for PidGains {
    fn from(cfg: &PidGainsConfig) -> Self {
        Self {
            kp: cfg.kp,
            kd: cfg.kd,
            ki: cfg.ki,
            ko: cfg.ko,
            kr: cfg.kr.min(MAX_SHIFT),
            integral_limit: cfg.integral_limit.max(0),
            output_limit: cfg.output_limit.max(0),
        }
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self::from(&PidGainsConfig::position_default())
    }
}

impl PidGains {
    /// Zero gains with the output clamp disabled.
    pub const UNLIMITED: Self = Self {
        kp: 0,
        kd: 0,
        ki: 0,
        ko: 0,
        kr: 0,
        integral_limit: 0,
        output_limit: 0,
    };

    /// Apply the output clamp, if enabled.
    #[inline]
    pub fn limit_output(&self, value: i32) -> i32 {
        if self.output_limit > 0 {
            value.clamp(-self.output_limit, self.output_limit)
        } else {
            value
        }
    }

    /// `value + ko`, saturating.
    #[inline]
    pub fn with_offset(&self, value: i32) -> i32 {
        l_add(value, self.ko as i32)
    }
}

/// Run the PID on the already loaded error.
///
/// Returns the output before the `ko` offset.
#[inline]
pub fn pid_step(state: &mut PidState, gains: &PidGains, variant: PidVariant) -> i32 {
    let error = state.error;

    // ── P term ──────────────────────────────────────────────
    let p = mul_shift(error, gains.kp, gains.kr);

    // ── D term (10-tap moving average) ──────────────────────
    let d_raw = mul_shift(l_sub(error, state.error_old), gains.kd, gains.kr);
    state.history.push(d_raw);
    let d = state.history.average();

    // ── I term (clamped accumulator) ────────────────────────
    let i_raw = mul_shift(error, gains.ki, gains.kr);
    let i_raw = match variant {
        PidVariant::Standard => sat16(i_raw),
        PidVariant::CurrentLoop => i_raw,
    };
    state.integral = l_add(state.integral, i_raw).clamp(-gains.integral_limit, gains.integral_limit);

    let pd = l_add(p, d);
    let output = l_add(pd, state.integral);

    state.proportional = p;
    state.derivative = d;
    state.pd = pd;
    state.output = output;
    output
}

/// Load `desired − feedback` and run one PID tick.
#[inline]
pub fn pid_compute(
    state: &mut PidState,
    gains: &PidGains,
    variant: PidVariant,
    desired: i32,
    feedback: i32,
) -> i32 {
    state.load_error(desired, feedback);
    pid_step(state, gains, variant)
}

// ─── Tests ──────────────────────────────────────────────────────────
