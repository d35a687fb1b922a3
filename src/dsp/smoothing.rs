//! # Parameter Smoothing
//!
//! Host parameters arrive once per block, but the audio needs a value
//! every sample. Jumping straight to a new value produces clicks and
//! "zipper noise", so every control is ramped towards its latest target.
//!
//! Two ramp laws are used:
//!
//! - **Linear** (gain, mix, feedback, flip-flop blend, cutoffs): nih-plug's
//!   [`Smoother`] with [`SmoothingStyle::Linear`], reaching the target in a
//!   fixed 20 ms.
//! - **One-pole exponential** (delay time): [`OnePoleSmoother`], stepping
//!   `current += (target - current) * coeff` with
//!   `coeff = 1 - e^(-1 / (time_constant * sample_rate))`. The same law
//!   drives the tempo-sync chase and the duck envelope in the transition
//!   engine.

use nih_plug::prelude::{Smoother, SmoothingStyle};
use nih_plug::util;

use super::snapshot::ParameterSnapshot;

/// Ramp time for the linearly smoothed controls.
const LINEAR_RAMP_MS: f32 = 20.0;

/// Time constant of the delay-time smoother, in seconds.
const DELAY_TIME_CONSTANT_SECS: f32 = 0.2;

/// Per-sample coefficient for a one-pole filter with the given time
/// constant: the fraction of the remaining distance covered each sample.
pub fn one_pole_coefficient(time_constant_secs: f32, sample_rate: f32) -> f32 {
    1.0 - (-1.0 / (time_constant_secs * sample_rate)).exp()
}

/// Exponential (one-pole lowpass) smoother.
///
/// Approaches its target asymptotically and never overshoots, since each
/// step covers a fixed fraction `coeff` in `(0, 1]` of the remaining gap.
#[derive(Debug, Clone, Copy)]
pub struct OnePoleSmoother {
    current: f32,
    target: f32,
    coeff: f32,
}

impl Default for OnePoleSmoother {
    fn default() -> Self {
        Self {
            current: 0.0,
            target: 0.0,
            coeff: 1.0,
        }
    }
}

impl OnePoleSmoother {
    pub fn new(time_constant_secs: f32, sample_rate: f32) -> Self {
        let mut smoother = Self::default();
        smoother.prepare(time_constant_secs, sample_rate);
        smoother
    }

    /// Recompute the coefficient for a new sample rate. State is kept.
    pub fn prepare(&mut self, time_constant_secs: f32, sample_rate: f32) {
        self.coeff = one_pole_coefficient(time_constant_secs, sample_rate);
    }

    /// Jump to `value` with no ramp.
    pub fn reset(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    /// Advance one sample and return the new current value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        self.current += (self.target - self.current) * self.coeff;
        self.current
    }
}

/// The per-sample control values produced by [`SmootherBank::step()`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedValues {
    /// Output gain as a linear amplitude.
    pub gain: f32,
    /// Manual delay time in milliseconds.
    pub delay_time_ms: f32,
    /// Dry/wet mix, `0..=1`.
    pub mix: f32,
    /// Feedback amount, `-1..=1`.
    pub feedback: f32,
    /// Left/right crossing blend, `0` = straight, `1` = swapped.
    pub invert_stereo: f32,
    pub low_cut_hz: f32,
    pub high_cut_hz: f32,
}

/// One smoother per continuous control.
///
/// [`prepare()`](Self::prepare) must run before anything else. Then, per
/// block, either [`reset()`](Self::reset) (first block after a prepare or
/// transport reset) or [`update()`](Self::update), followed by one
/// [`step()`](Self::step) per sample.
pub struct SmootherBank {
    sample_rate: f32,
    gain: Smoother<f32>,
    delay_time: OnePoleSmoother,
    mix: Smoother<f32>,
    feedback: Smoother<f32>,
    invert_stereo: Smoother<f32>,
    low_cut: Smoother<f32>,
    high_cut: Smoother<f32>,
}

impl Default for SmootherBank {
    fn default() -> Self {
        Self::new()
    }
}

impl SmootherBank {
    pub fn new() -> Self {
        let linear = || Smoother::new(SmoothingStyle::Linear(LINEAR_RAMP_MS));
        Self {
            sample_rate: 44100.0,
            gain: linear(),
            delay_time: OnePoleSmoother::default(),
            mix: linear(),
            feedback: linear(),
            invert_stereo: linear(),
            low_cut: linear(),
            high_cut: linear(),
        }
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.delay_time
            .prepare(DELAY_TIME_CONSTANT_SECS, sample_rate);
    }

    /// Snap every smoother straight to the snapshot's values.
    pub fn reset(&mut self, params: &ParameterSnapshot) {
        let targets = Targets::from(params);
        self.gain.reset(targets.gain);
        self.delay_time.reset(targets.delay_time_ms);
        self.mix.reset(targets.mix);
        self.feedback.reset(targets.feedback);
        self.invert_stereo.reset(targets.invert_stereo);
        self.low_cut.reset(targets.low_cut_hz);
        self.high_cut.reset(targets.high_cut_hz);
    }

    /// Set new targets from this block's snapshot.
    pub fn update(&mut self, params: &ParameterSnapshot) {
        let targets = Targets::from(params);
        let sr = self.sample_rate;
        self.gain.set_target(sr, targets.gain);
        self.mix.set_target(sr, targets.mix);
        self.feedback.set_target(sr, targets.feedback);
        self.invert_stereo.set_target(sr, targets.invert_stereo);
        self.low_cut.set_target(sr, targets.low_cut_hz);
        self.high_cut.set_target(sr, targets.high_cut_hz);

        // A zero delay time only exists before the first update.
        if self.delay_time.current() == 0.0 {
            self.delay_time.reset(targets.delay_time_ms);
        } else {
            self.delay_time.set_target(targets.delay_time_ms);
        }
    }

    /// Advance every smoother by one sample, in declaration order.
    #[inline]
    pub fn step(&mut self) -> SmoothedValues {
        SmoothedValues {
            gain: self.gain.next(),
            delay_time_ms: self.delay_time.next(),
            mix: self.mix.next(),
            feedback: self.feedback.next(),
            invert_stereo: self.invert_stereo.next(),
            low_cut_hz: self.low_cut.next(),
            high_cut_hz: self.high_cut.next(),
        }
    }
}

/// Snapshot values converted into the units the smoothers work in.
struct Targets {
    gain: f32,
    delay_time_ms: f32,
    mix: f32,
    feedback: f32,
    invert_stereo: f32,
    low_cut_hz: f32,
    high_cut_hz: f32,
}

impl From<&ParameterSnapshot> for Targets {
    fn from(params: &ParameterSnapshot) -> Self {
        Self {
            gain: util::db_to_gain(params.gain_db),
            delay_time_ms: params.delay_time_ms,
            mix: (params.mix_percent * 0.01).clamp(0.0, 1.0),
            feedback: (params.feedback_percent * 0.01).clamp(-1.0, 1.0),
            invert_stereo: if params.flip_flop { 1.0 } else { 0.0 },
            low_cut_hz: params.low_cut_hz,
            high_cut_hz: params.high_cut_hz,
        }
    }
}
