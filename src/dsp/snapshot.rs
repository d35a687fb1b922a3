//! The plain control values the DSP core reads once per block.
//!
//! The host's parameter objects are translated into this struct at the
//! start of every block, so nothing in `dsp` knows about nih-plug's
//! parameter types or the threads that write them.

use super::transition::ShiftMode;

/// Shortest selectable delay time in milliseconds.
pub const MIN_DELAY_TIME_MS: f32 = 5.0;

/// Longest selectable (and tempo-synced) delay time in milliseconds.
pub const MAX_DELAY_TIME_MS: f32 = 5000.0;

/// Index of the quarter note in the note-length table.
pub const QUARTER_NOTE_INDEX: usize = 9;

/// User-facing controls, in the units the user sees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    /// Output gain in decibels, `[-60, 12]`.
    pub gain_db: f32,
    /// Manual delay time in milliseconds, `[5, 5000]`.
    pub delay_time_ms: f32,
    /// Dry/wet mix in percent, `[0, 100]`.
    pub mix_percent: f32,
    /// Feedback in percent, `[-100, 100]`. Negative values invert the
    /// polarity of every other repeat.
    pub feedback_percent: f32,
    /// Swap left and right on every pass through the delay.
    pub flip_flop: bool,
    /// High-pass cutoff applied to the wet signal, in Hz.
    pub low_cut_hz: f32,
    /// Low-pass cutoff applied to the wet signal, in Hz.
    pub high_cut_hz: f32,
    /// How the delay shortens when the delay time goes down.
    pub accelerate_mode: ShiftMode,
    /// How the delay lengthens when the delay time goes up.
    pub decelerate_mode: ShiftMode,
    /// Derive the delay time from the host tempo and `delay_note`.
    pub tempo_sync: bool,
    /// Note length index into the tempo table, `[0, 15]`.
    pub delay_note: usize,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self {
            gain_db: 0.0,
            delay_time_ms: 100.0,
            mix_percent: 100.0,
            feedback_percent: 0.0,
            flip_flop: false,
            low_cut_hz: 20.0,
            high_cut_hz: 20000.0,
            accelerate_mode: ShiftMode::Repitch,
            decelerate_mode: ShiftMode::Repitch,
            tempo_sync: false,
            delay_note: QUARTER_NOTE_INDEX,
        }
    }
}
