//! Accumulating window of decoded PCM samples.
//!
//! Samples are appended in arrival order and taken out all at once when the
//! window is flushed.  An optional retention cap bounds memory while nothing
//! is flushing (transcription disabled): once the cap is reached the
//! **oldest** samples are discarded so the most recent audio is kept.
//!
//! # Example
//!
//! ```rust
//! use device_stream::audio::AudioWindow;
//!
//! let mut window = AudioWindow::new(2, Some(4));
//! window.push(&[1, 2, 3, 4, 5]); // 5 samples → cap 4 → oldest dropped
//! assert!(window.is_ready());
//! assert_eq!(window.take(), vec![2, 3, 4, 5]);
//! assert!(window.is_empty());
//! ```

use std::collections::VecDeque;

use crate::codec::WAV_SAMPLE_RATE;

// ---------------------------------------------------------------------------
// AudioWindow
// ---------------------------------------------------------------------------

/// Append-only sample buffer with a flush threshold.
#[derive(Debug, Clone)]
pub struct AudioWindow {
    samples: VecDeque<i16>,
    /// Ready to flush once `len() > threshold`.
    threshold: usize,
    /// Maximum retained samples; `None` grows without bound.
    max_samples: Option<usize>,
    /// Samples discarded by the cap since creation.
    dropped: u64,
}

impl AudioWindow {
    /// Create an empty window.
    ///
    /// A cap of `Some(0)` is treated as unbounded.  A cap at or below the
    /// threshold could never become ready, so it is raised to
    /// `threshold + 1`.
    pub fn new(threshold: usize, max_samples: Option<usize>) -> Self {
        let max_samples = max_samples.filter(|&cap| cap > 0).map(|cap| {
            let floor = threshold.saturating_add(1);
            if cap < floor {
                log::warn!(
                    "audio: window cap {cap} is not above the flush threshold {threshold}, using {floor}"
                );
            }
            cap.max(floor)
        });
        Self {
            samples: VecDeque::new(),
            threshold,
            max_samples,
            dropped: 0,
        }
    }

    /// Append `data` after everything already in the window.
    ///
    /// Returns how many of the oldest samples were discarded to respect the
    /// retention cap (0 when unbounded).
    pub fn push(&mut self, data: &[i16]) -> usize {
        self.samples.extend(data.iter().copied());

        let Some(cap) = self.max_samples else {
            return 0;
        };
        let excess = self.samples.len().saturating_sub(cap);
        if excess > 0 {
            self.samples.drain(..excess);
            self.dropped += excess as u64;
        }
        excess
    }

    /// Take every sample in arrival order and leave the window empty.
    pub fn take(&mut self) -> Vec<i16> {
        self.samples.drain(..).collect()
    }

    /// Discard all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// `true` once the window holds strictly more than the threshold.
    pub fn is_ready(&self) -> bool {
        self.samples.len() > self.threshold
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn max_samples(&self) -> Option<usize> {
        self.max_samples
    }

    /// Total samples discarded by the retention cap.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Audio currently held, in seconds at the device sample rate.
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / WAV_SAMPLE_RATE as f32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Threshold ---------------------------------------------------------

    #[test]
    fn ready_only_strictly_above_threshold() {
        let mut window = AudioWindow::new(8_000, None);
        window.push(&vec![0; 8_000]);
        assert!(!window.is_ready());

        window.push(&[0]);
        assert!(window.is_ready());
        assert_eq!(window.len(), 8_001);
    }

    // ---- Take / clear ------------------------------------------------------

    #[test]
    fn take_preserves_order_and_empties() {
        let mut window = AudioWindow::new(1, None);
        window.push(&[1, 2]);
        window.push(&[3]);

        assert_eq!(window.take(), vec![1, 2, 3]);
        assert!(window.is_empty());
        assert!(window.take().is_empty());
    }

    #[test]
    fn clear_then_reuse() {
        let mut window = AudioWindow::new(1, None);
        window.push(&[1, 2, 3]);
        window.clear();
        assert_eq!(window.len(), 0);

        window.push(&[9]);
        assert_eq!(window.take(), vec![9]);
    }

    // ---- Retention cap -----------------------------------------------------

    #[test]
    fn unbounded_window_keeps_everything() {
        let mut window = AudioWindow::new(10, None);
        for _ in 0..100 {
            assert_eq!(window.push(&[7; 1_000]), 0);
        }
        assert_eq!(window.len(), 100_000);
        assert_eq!(window.dropped(), 0);
    }

    #[test]
    fn cap_drops_oldest_across_calls() {
        let mut window = AudioWindow::new(1, Some(3));
        assert_eq!(window.push(&[1, 2, 3]), 0);
        assert_eq!(window.push(&[4, 5]), 2);

        assert_eq!(window.dropped(), 2);
        assert_eq!(window.take(), vec![3, 4, 5]);
    }

    #[test]
    fn cap_below_threshold_is_raised() {
        let mut window = AudioWindow::new(8_000, Some(100));
        assert_eq!(window.max_samples(), Some(8_001));

        window.push(&[0; 9_000]);
        assert_eq!(window.len(), 8_001);
        assert!(window.is_ready());
    }

    #[test]
    fn cap_equal_to_threshold_is_raised() {
        let window = AudioWindow::new(50, Some(50));
        assert_eq!(window.max_samples(), Some(51));
    }

    #[test]
    fn zero_cap_means_unbounded() {
        let window = AudioWindow::new(1, Some(0));
        assert_eq!(window.max_samples(), None);
    }

    #[test]
    fn duration_at_device_rate() {
        let mut window = AudioWindow::new(1, None);
        window.push(&vec![0; 4_000]);
        assert!((window.duration_secs() - 0.5).abs() < 1e-6);
    }
}
