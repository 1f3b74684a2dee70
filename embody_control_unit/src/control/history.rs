//! Fixed-depth FIFO of derivative samples.

use embody_common::consts::DERIVATIVE_HISTORY_DEPTH;
use heapless::HistoryBuffer;

/// Last `DERIVATIVE_HISTORY_DEPTH` raw derivative terms.
///
/// Starts full of zeros, so the average is meaningful from the first tick.
#[derive(Debug, Clone)]
pub struct DerivativeHistory {
    samples: HistoryBuffer<i32, DERIVATIVE_HISTORY_DEPTH>,
}

impl Default for DerivativeHistory {
    fn default() -> Self {
        Self {
            samples: HistoryBuffer::new_with(0),
        }
    }
}

impl DerivativeHistory {
    /// Push a sample, evicting the oldest.
    #[inline]
    pub fn push(&mut self, sample: i32) {
        self.samples.write(sample);
    }

    /// Truncating mean over the full window.
    #[inline]
    pub fn average(&self) -> i32 {
        let sum: i64 = self.samples.as_slice().iter().map(|&s| s as i64).sum();
        (sum / DERIVATIVE_HISTORY_DEPTH as i64) as i32
    }

    /// Most recent sample.
    #[inline]
    pub fn latest(&self) -> i32 {
        self.samples.recent().copied().unwrap_or(0)
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
