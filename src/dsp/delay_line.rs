//! # Delay Line (Ring Buffer)
//!
//! A delay line stores audio samples and lets you read them back after a
//! specified time delay. One instance exists per channel; the two never
//! share state.
//!
//! ## How the Ring Buffer Works
//!
//! A "write head" records incoming audio onto a circular tape loop, and a
//! "read head" plays it back from a position further behind. Each sample:
//!
//! 1. [`write()`](DelayLine::write) stores the new sample at `write_pos`
//!    and advances `write_pos` by one, wrapping at the end.
//! 2. [`read()`](DelayLine::read) looks `delay` samples behind the sample
//!    that was just written.
//!
//! Because the write happens first, a delay of `0.0` returns the sample
//! written in this very step.
//!
//! ## Linear Interpolation
//!
//! Fractional delays blend the two neighbouring stored samples:
//!
//! ```text
//! result = lerp(at(n), at(n + 1), frac)
//!        = at(n) * (1 - frac) + at(n + 1) * frac
//! ```
//!
//! where `at(k)` is the sample written `k` steps ago.

use nih_plug::nih_debug_assert;

/// Two extra slots so that reading at the maximum delay still has an
/// interpolation neighbour inside the buffer.
const INTERPOLATION_PADDING: usize = 2;

/// A ring buffer that functions as an audio delay line.
///
/// Storage is allocated in [`set_capacity()`](Self::set_capacity) when the
/// host prepares the plugin and never during audio processing.
#[derive(Debug, Clone, Default)]
pub struct DelayLine {
    /// The circular buffer storing audio samples.
    buffer: Vec<f32>,

    /// Where the *next* incoming sample will be stored.
    write_pos: usize,
}

impl DelayLine {
    /// Create a delay line able to delay by up to `max_delay_samples`.
    pub fn new(max_delay_samples: usize) -> Self {
        let mut delay_line = Self::default();
        delay_line.set_capacity(max_delay_samples);
        delay_line
    }

    /// Allocate (or resize) storage for delays of up to `max_delay_samples`
    /// and reset the buffer to silence.
    ///
    /// This allocates, so it must only be called from the host's prepare
    /// path, never from `process()`.
    pub fn set_capacity(&mut self, max_delay_samples: usize) {
        let len = max_delay_samples + INTERPOLATION_PADDING;
        self.buffer.clear();
        self.buffer.resize(len, 0.0);
        self.write_pos = 0;
    }

    /// Number of slots in the ring. Valid read delays are
    /// `[0, capacity() - 1)`.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The longest delay (in samples) that [`read()`](Self::read) accepts.
    pub fn max_delay(&self) -> f32 {
        self.capacity().saturating_sub(INTERPOLATION_PADDING) as f32
    }

    /// Clear the entire buffer to silence and reset the write position.
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Store `sample` at the write position, then advance it by one.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos == self.buffer.len() {
            self.write_pos = 0;
        }
    }

    /// Read the signal `delay_samples` behind the most recent write, with
    /// linear interpolation for the fractional part.
    ///
    /// # Precondition
    ///
    /// `0.0 <= delay_samples < capacity() - 1`. Callers clamp to
    /// [`max_delay()`](Self::max_delay); the ring arithmetic below keeps
    /// indices in bounds regardless, so a violation is audible garbage
    /// rather than a crash.
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        nih_debug_assert!(
            delay_samples >= 0.0 && delay_samples < (len - 1) as f32,
            "delay of {} samples is outside a ring of {} slots",
            delay_samples,
            len
        );

        let delay_int = delay_samples as usize;
        let delay_frac = delay_samples - delay_int as f32;

        // `write_pos - 1` is the newest sample. Adding `len` twice keeps the
        // subtraction from underflowing for any delay below `len`.
        let newest = self.write_pos + len - 1;
        let index_a = (newest + len - delay_int) % len;
        let index_b = (newest + len - delay_int - 1) % len;

        let sample_a = self.buffer[index_a];
        let sample_b = self.buffer[index_b];

        sample_a * (1.0 - delay_frac) + sample_b * delay_frac
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
