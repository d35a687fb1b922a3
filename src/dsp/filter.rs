//! # State-Variable Filter (TPT)
//!
//! The wet signal passes through a high-pass ("low cut") and a low-pass
//! ("high cut") in series. Both are the same two-pole (12 dB/octave)
//! state-variable filter built with the topology-preserving transform,
//! which stays stable while the cutoff moves every sample.
//!
//! ## The Filter Equations
//!
//! ```text
//! g  = tan(π * cutoff / sample_rate)
//! h  = 1 / (1 + R2 * g + g²)              R2 = √2 (Butterworth damping)
//!
//! hp = h * (x - s1 * (g + R2) - s2)
//! bp = g * hp + s1        s1 = g * hp + bp
//! lp = g * bp + s2        s2 = g * bp + lp
//! ```
//!
//! `s1` and `s2` are the two integrator states. The cutoff only enters
//! through `g` and `h`, so they are recomputed only when the cutoff
//! actually changes.

use std::f32::consts::{PI, SQRT_2};

/// Cutoff changes smaller than this (in Hz) don't recompute coefficients.
const CUTOFF_EPSILON: f32 = 1e-3;

/// Lowest accepted cutoff frequency.
const MIN_CUTOFF_HZ: f32 = 20.0;

/// Which response [`SvfFilter::process()`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    Lowpass,
    Highpass,
}

/// A two-pole state-variable filter for one channel.
#[derive(Debug, Clone)]
pub struct SvfFilter {
    filter_type: FilterType,
    sample_rate: f32,
    /// Cutoff the coefficients were computed for. Negative until the
    /// first [`set_cutoff()`](Self::set_cutoff).
    cutoff_hz: f32,

    g: f32,
    h: f32,

    s1: f32,
    s2: f32,
}

impl SvfFilter {
    /// Create a filter. Call [`prepare()`](Self::prepare) and
    /// [`set_cutoff()`](Self::set_cutoff) before processing audio.
    pub fn new(filter_type: FilterType) -> Self {
        Self {
            filter_type,
            sample_rate: 44100.0,
            cutoff_hz: -1.0,
            g: 0.0,
            h: 1.0,
            s1: 0.0,
            s2: 0.0,
        }
    }

    /// Adopt a new sample rate. Clears the state and forces the next
    /// [`set_cutoff()`](Self::set_cutoff) to recompute.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.cutoff_hz = -1.0;
        self.reset();
    }

    /// Move the cutoff. Clamped to `[20 Hz, 0.49 * sample_rate]`, where
    /// `tan` is still well behaved.
    #[inline]
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        if (cutoff_hz - self.cutoff_hz).abs() <= CUTOFF_EPSILON {
            return;
        }
        self.cutoff_hz = cutoff_hz;

        let safe_cutoff = cutoff_hz.clamp(MIN_CUTOFF_HZ, self.sample_rate * 0.49);
        self.g = (PI * safe_cutoff / self.sample_rate).tan();
        self.h = 1.0 / (1.0 + SQRT_2 * self.g + self.g * self.g);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let g = self.g;

        let hp = self.h * (input - self.s1 * (g + SQRT_2) - self.s2);

        let bp = g * hp + self.s1;
        self.s1 = g * hp + bp;

        let lp = g * bp + self.s2;
        self.s2 = g * bp + lp;

        match self.filter_type {
            FilterType::Lowpass => lp,
            FilterType::Highpass => hp,
        }
    }

    /// Zero the integrator states.
    pub fn reset(&mut self) {
        self.s1 = 0.0;
        self.s2 = 0.0;
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
