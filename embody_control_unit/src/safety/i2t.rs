//! I²T motor overload integrator.
//!
//! Charges with the square of the current excess above `max_allowed` and
//! discharges with the square of the margin below it, floored at zero.
//! Crossing `limit` reports an overcurrent condition.

/// Thermal overload state of one motor.
#[derive(Debug, Clone, Copy)]
pub struct I2tMonitor {
    filt: i64,
    max_allowed: i32,
    limit: i64,
}

impl I2tMonitor {
    pub const fn new(max_allowed: i32, limit: i64) -> Self {
        Self {
            filt: 0,
            max_allowed,
            limit,
        }
    }

    /// Integrate one current sample [mA]. Returns true when above the limit.
    #[inline]
    pub fn update(&mut self, current: i32) -> bool {
        let excess = current.unsigned_abs() as i64 - self.max_allowed as i64;
        let sq = excess.saturating_mul(excess);
        self.filt = if excess > 0 {
            self.filt.saturating_add(sq)
        } else {
            self.filt.saturating_sub(sq).max(0)
        };
        self.tripped()
    }

    #[inline]
    pub const fn tripped(&self) -> bool {
        self.filt > self.limit
    }

    #[inline]
    pub const fn value(&self) -> i64 {
        self.filt
    }

    #[inline]
    pub fn reset(&mut self) {
        self.filt = 0;
    }
}
