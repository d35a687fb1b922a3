//! # Delay-Time Transitions
//!
//! Changing a delay's length while audio is running is audible no matter
//! what. This module decides *how* it is audible. There are three shift
//! modes:
//!
//! - **Repitch**: the read head slides to the new position. Sliding makes
//!   the repeats bend in pitch like a tape machine changing speed. With
//!   tempo sync on, the head chases the synced length with a 0.2 s
//!   exponential. With tempo sync off it follows the requested length
//!   sample by sample.
//! - **Fade**: a second read head starts at the new length and the two are
//!   crossfaded over 50 ms, then the old head is dropped.
//! - **Duck**: the wet signal fades towards silence, the head jumps during
//!   the quiet part, and the wet signal fades back in.
//!
//! One mode governs lengthening ("decelerate") and another shortening
//! ("accelerate"). The mode is re-chosen every sample, so a mode change
//! applies immediately while an in-flight crossfade or duck keeps its own
//! counters.
//!
//! All three modes aim at the same requested length: the synced length,
//! or the manual delay time after its own 0.2 s smoothing. Because the
//! request glides, Fade chains short crossfades along the glide and Duck
//! keeps restarting its wait until the request stops moving.
//!
//! Each sample runs in two halves around the buffer read:
//!
//! ```text
//! advance()  ──►  delay_line.read(engine.delay())  ──►  finish()
//! (pick length)                                      (blend / duck)
//! ```

use super::smoothing::{one_pole_coefficient, OnePoleSmoother};

/// Crossfade length for [`ShiftMode::Fade`].
const CROSSFADE_SECS: f32 = 0.05;

/// How long [`ShiftMode::Duck`] waits before jumping.
const DUCK_WAIT_SECS: f32 = 0.05;

/// Time constant of the duck envelope.
const DUCK_ENVELOPE_SECS: f32 = 0.05;

/// Time constant of the tempo-synced Repitch chase.
const TEMPO_SYNC_SECS: f32 = 0.2;

/// Strategy for moving the effective delay length to a new target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftMode {
    #[default]
    Repitch,
    Fade,
    Duck,
}

impl ShiftMode {
    /// Map a selector index to a mode. Unknown indices clamp to the last
    /// mode.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Repitch,
            1 => Self::Fade,
            _ => Self::Duck,
        }
    }
}

/// Where the delay should be this sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayTarget {
    /// The requested length in samples: the tempo-synced length, or the
    /// smoothed manual delay time.
    pub samples: f32,
    /// Repitch chases synced lengths instead of following them directly.
    pub tempo_sync: bool,
}

/// Owns the live delay length and all mode-specific transition state.
#[derive(Debug, Clone)]
pub struct TransitionEngine {
    /// Effective delay length in samples. `0.0` means "never set".
    delay: f32,
    /// Pending target length in samples.
    target: f32,
    max_delay: f32,

    /// Crossfade position, `0` when idle.
    xfade: f32,
    xfade_inc: f32,

    /// Wet-signal gain used by [`ShiftMode::Duck`].
    duck_envelope: OnePoleSmoother,
    /// Wait counter, `0` when idle, jumps on reaching `1`.
    duck_wait: f32,
    duck_wait_inc: f32,

    tempo_sync_coeff: f32,
}

impl Default for TransitionEngine {
    fn default() -> Self {
        let mut engine = Self {
            delay: 0.0,
            target: 0.0,
            max_delay: 0.0,
            xfade: 0.0,
            xfade_inc: 0.0,
            duck_envelope: OnePoleSmoother::default(),
            duck_wait: 0.0,
            duck_wait_inc: 0.0,
            tempo_sync_coeff: 1.0,
        };
        engine.reset();
        engine
    }
}

impl TransitionEngine {
    pub fn new(sample_rate: f32, max_delay: f32) -> Self {
        let mut engine = Self::default();
        engine.prepare(sample_rate, max_delay);
        engine
    }

    /// Derive per-sample rates for `sample_rate` and reset all state.
    /// Delay lengths are clamped to `max_delay` samples.
    pub fn prepare(&mut self, sample_rate: f32, max_delay: f32) {
        self.max_delay = max_delay;
        self.xfade_inc = 1.0 / (CROSSFADE_SECS * sample_rate);
        self.duck_wait_inc = 1.0 / (DUCK_WAIT_SECS * sample_rate);
        self.duck_envelope
            .prepare(DUCK_ENVELOPE_SECS, sample_rate);
        self.tempo_sync_coeff = one_pole_coefficient(TEMPO_SYNC_SECS, sample_rate);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.delay = 0.0;
        self.target = 0.0;
        self.xfade = 0.0;
        self.duck_envelope.reset(1.0);
        self.duck_wait = 0.0;
    }

    /// The effective delay length in samples.
    pub fn delay(&self) -> f32 {
        self.delay
    }

    /// The length the engine is moving towards, in samples.
    #[cfg(test)]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Crossfade position in `[0, 1)`, `0` when no crossfade is running.
    #[cfg(test)]
    pub fn fade_position(&self) -> f32 {
        self.xfade
    }

    /// Current duck envelope gain.
    #[cfg(test)]
    pub fn duck_level(&self) -> f32 {
        self.duck_envelope.current()
    }

    /// Pick the mode for this sample: lengthening uses `decelerate`,
    /// everything else `accelerate`.
    #[inline]
    pub fn select_mode(&self, target_samples: f32, accelerate: ShiftMode, decelerate: ShiftMode) -> ShiftMode {
        if target_samples > self.delay {
            decelerate
        } else {
            accelerate
        }
    }

    /// First half of a sample: settle the effective delay length before the
    /// delay line is read.
    #[inline]
    pub fn advance(&mut self, mode: ShiftMode, request: &DelayTarget) {
        let requested = request.samples.clamp(0.0, self.max_delay);

        match mode {
            ShiftMode::Repitch => {
                if request.tempo_sync {
                    self.target = requested;
                    if self.delay == 0.0 {
                        self.delay = self.target;
                    } else {
                        self.delay += (self.target - self.delay) * self.tempo_sync_coeff;
                    }
                } else {
                    self.delay = requested;
                    self.target = requested;
                }
            }
            ShiftMode::Fade => {
                if self.xfade == 0.0 {
                    self.target = requested;
                    if self.delay == 0.0 {
                        self.delay = self.target;
                    } else if self.target != self.delay {
                        self.xfade = self.xfade_inc;
                    }
                }
            }
            ShiftMode::Duck => {
                // A target left pending by another mode also needs a duck.
                let stale = self.duck_wait == 0.0 && self.target != self.delay;
                if requested != self.target || stale {
                    self.target = requested;
                    if self.delay == 0.0 {
                        self.delay = self.target;
                    } else {
                        self.duck_wait = self.duck_wait_inc;
                        self.duck_envelope.set_target(0.0);
                    }
                }
            }
        }
    }

    /// Second half of a sample: post-process the `wet` frame read at
    /// [`delay()`](Self::delay). `read` fetches a stereo frame at another
    /// delay length (needed while crossfading).
    #[inline]
    pub fn finish<F>(&mut self, mode: ShiftMode, wet: [f32; 2], read: F) -> [f32; 2]
    where
        F: FnOnce(f32) -> [f32; 2],
    {
        match mode {
            ShiftMode::Repitch => wet,
            ShiftMode::Fade => {
                if self.xfade <= 0.0 {
                    return wet;
                }

                let fresh = read(self.target);
                let x = self.xfade;
                let blended = [
                    (1.0 - x) * wet[0] + x * fresh[0],
                    (1.0 - x) * wet[1] + x * fresh[1],
                ];

                self.xfade += self.xfade_inc;
                if self.xfade >= 1.0 {
                    self.delay = self.target;
                    self.xfade = 0.0;
                }

                blended
            }
            ShiftMode::Duck => {
                let level = self.duck_envelope.next();

                if self.duck_wait > 0.0 {
                    self.duck_wait += self.duck_wait_inc;
                    if self.duck_wait >= 1.0 {
                        self.delay = self.target;
                        self.duck_wait = 0.0;
                        self.duck_envelope.set_target(1.0);
                    }
                }

                [wet[0] * level, wet[1] * level]
            }
        }
    }
}
