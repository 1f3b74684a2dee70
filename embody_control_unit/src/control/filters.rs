//! Output smoothing filter.
//!
//! First-order IIR applied to the composed command when the board enables
//! smoothing:
//!
//! ```text
//! y[n] = 0.9773·y[n−1] + 0.0114·(x[n−1] + x[n])
//! ```
//!
//! DC gain is `2·0.0114 / (1 − 0.9773) ≈ 1.004`, so a constant input settles
//! slightly above itself. The state is float; the output is truncated back
//! to an integer command.

const POLE: f32 = 0.9773;
const ZERO_GAIN: f32 = 0.0114;

/// Internal state of the smoothing filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputSmoother {
    prev_input: i32,
    prev_output: f32,
}

impl OutputSmoother {
    /// Reset filter state to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feed one sample and return the filtered command.
    #[inline]
    pub fn apply(&mut self, input: i32) -> i32 {
        let y = POLE * self.prev_output + ZERO_GAIN * (self.prev_input as f32 + input as f32);
        self.prev_input = input;
        self.prev_output = y;
        // `as` saturates on overflow and maps NaN to 0.
        y as i32
    }

    /// Last filtered value before truncation.
    #[inline]
    pub fn value(&self) -> f32 {
        self.prev_output
    }
}
