//! Saturating fixed-point primitives.
//!
//! All arithmetic in the tick goes through these helpers. Overflow never
//! wraps: 32-bit operations saturate at `i32::MIN`/`i32::MAX` and 16-bit
//! narrowing clamps to `[MIN_16, MAX_16]`.

use embody_common::consts::{MAX_16, MIN_16};

/// Clamp to the signed 16-bit range, keeping the `i32` type.
#[inline]
pub const fn sat16(x: i32) -> i32 {
    if x > MAX_16 {
        MAX_16
    } else if x < MIN_16 {
        MIN_16
    } else {
        x
    }
}

/// Saturating 32-bit add.
#[inline]
pub const fn l_add(a: i32, b: i32) -> i32 {
    a.saturating_add(b)
}

/// Saturating 32-bit subtract.
#[inline]
pub const fn l_sub(a: i32, b: i32) -> i32 {
    a.saturating_sub(b)
}

/// Low 16 bits of a 32-bit word, reinterpreted as signed.
#[inline]
pub const fn extract_l(x: i32) -> i16 {
    x as i16
}

/// High 16 bits of a 32-bit word.
#[inline]
pub const fn extract_h(x: i32) -> i16 {
    (x >> 16) as i16
}

/// Sign-preserving right shift.
///
/// Negative values are shifted as magnitudes, so the result truncates toward
/// zero: `shift_right_signed(-1, 3) == 0`, where `-1 >> 3 == -1`.
/// `i32::MIN` saturates to `i32::MAX` before negation.
#[inline]
pub const fn shift_right_signed(x: i32, k: u8) -> i32 {
    if x < 0 {
        -(x.saturating_neg() >> k)
    } else {
        x >> k
    }
}

/// Sign-preserving right shift of a 64-bit product, saturated to `i32`.
#[inline]
pub const fn shift_product(x: i64, k: u8) -> i32 {
    let shifted = if x < 0 { -((-x) >> k) } else { x >> k };
    if shifted > i32::MAX as i64 {
        i32::MAX
    } else if shifted < i32::MIN as i64 {
        i32::MIN
    } else {
        shifted as i32
    }
}

/// Saturating `i32 · i16` with sign-preserving shift.
#[inline]
pub const fn mul_shift(x: i32, gain: i16, k: u8) -> i32 {
    shift_product(x as i64 * gain as i64, k)
}
