//! # Plugin Parameters
//!
//! The knobs and switches the host sees. Each parameter has:
//!
//! - A **unique string ID** (`#[id = "..."]`) the host uses to save and
//!   recall presets. Once published, never change these IDs or existing
//!   presets will break.
//! - A **human-readable name** shown in the DAW's UI.
//! - A **range** and a **default value**.
//!
//! None of these parameters use nih-plug's smoothers. The DSP core reads
//! them once per block through [`PluginParams::snapshot()`] and does its
//! own smoothing.

use std::sync::Arc;

use nih_plug::prelude::*;

use crate::dsp::snapshot::{ParameterSnapshot, MAX_DELAY_TIME_MS, MIN_DELAY_TIME_MS};
use crate::dsp::transition::ShiftMode;

/// Shift mode choices as shown to the user. "Jump" is the duck mode.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayModeChoice {
    #[name = "Repitch"]
    Repitch,
    #[name = "Fade"]
    Fade,
    #[name = "Jump"]
    Jump,
}

impl From<DelayModeChoice> for ShiftMode {
    fn from(choice: DelayModeChoice) -> Self {
        // The choices are listed in shift mode order.
        ShiftMode::from_index(choice.to_index())
    }
}

/// Tempo-synced note lengths, shortest first. The order matches the
/// tempo table in `dsp::tempo`.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteLength {
    #[name = "1/32"]
    ThirtySecond,
    #[name = "1/16 T"]
    SixteenthTriplet,
    #[name = "1/32 D"]
    ThirtySecondDotted,
    #[name = "1/16"]
    Sixteenth,
    #[name = "1/8 T"]
    EighthTriplet,
    #[name = "1/16 D"]
    SixteenthDotted,
    #[name = "1/8"]
    Eighth,
    #[name = "1/4 T"]
    QuarterTriplet,
    #[name = "1/8 D"]
    EighthDotted,
    #[name = "1/4"]
    Quarter,
    #[name = "1/2 T"]
    HalfTriplet,
    #[name = "1/4 D"]
    QuarterDotted,
    #[name = "1/2"]
    Half,
    #[name = "1/1 T"]
    WholeTriplet,
    #[name = "1/2 D"]
    HalfDotted,
    #[name = "1/1"]
    Whole,
}

/// All user-facing parameters for the Loveless Delay plugin.
#[derive(Params)]
pub struct PluginParams {
    /// **Output Gain** in dB, applied after the dry/wet mix.
    #[id = "gain"]
    pub gain: FloatParam,

    /// **Delay Time** in milliseconds, used while tempo sync is off.
    ///
    /// Skewed so that most of the knob travel covers the short times,
    /// where small changes are the most audible.
    #[id = "delayTime"]
    pub delay_time: FloatParam,

    /// **Mix** between the dry input and the delayed signal, in percent.
    #[id = "mix"]
    pub mix: FloatParam,

    /// **Feedback** in percent. Negative values flip the polarity of
    /// every other repeat.
    #[id = "feedback"]
    pub feedback: FloatParam,

    /// **Flip Flop** swaps left and right on each repeat (ping-pong).
    #[id = "flipFlop"]
    pub flip_flop: BoolParam,

    /// **Low Cut**: high-pass cutoff on the delayed signal.
    #[id = "lowCut"]
    pub low_cut: FloatParam,

    /// **High Cut**: low-pass cutoff on the delayed signal.
    #[id = "highCut"]
    pub high_cut: FloatParam,

    /// How the delay reacts when it gets *shorter*.
    #[id = "accelerateMode"]
    pub accelerate_mode: EnumParam<DelayModeChoice>,

    /// How the delay reacts when it gets *longer*.
    #[id = "decelerateMode"]
    pub decelerate_mode: EnumParam<DelayModeChoice>,

    /// **Tempo Sync** replaces the delay time with a note length at the
    /// host tempo.
    #[id = "tempoSync"]
    pub tempo_sync: BoolParam,

    /// Note length used while tempo sync is on.
    #[id = "delayNote"]
    pub delay_note: EnumParam<NoteLength>,

    /// Host bypass. When on, audio passes through untouched.
    #[id = "bypass"]
    pub bypass: BoolParam,
}

impl Default for PluginParams {
    fn default() -> Self {
        Self {
            gain: FloatParam::new(
                "Output Gain",
                0.0,
                FloatRange::Skewed {
                    min: -60.0,
                    max: 12.0,
                    // Puts 0 dB at the centre of the knob, with the
                    // quiet end squeezed into the lower half.
                    factor: 3.8,
                },
            )
            .with_unit(" dB")
            .with_step_size(0.01)
            .with_value_to_string(formatters::v2s_f32_rounded(1)),

            delay_time: FloatParam::new(
                "Delay Time",
                100.0,
                FloatRange::Skewed {
                    min: MIN_DELAY_TIME_MS,
                    max: MAX_DELAY_TIME_MS,
                    factor: 0.35,
                },
            )
            .with_step_size(0.01)
            .with_value_to_string(v2s_delay_time())
            .with_string_to_value(s2v_delay_time()),

            mix: FloatParam::new("Mix", 100.0, FloatRange::Linear { min: 0.0, max: 100.0 })
                .with_unit(" %")
                .with_step_size(1.0)
                .with_value_to_string(formatters::v2s_f32_rounded(0)),

            feedback: FloatParam::new(
                "Feedback",
                0.0,
                FloatRange::Linear {
                    min: -100.0,
                    max: 100.0,
                },
            )
            .with_unit(" %")
            .with_step_size(1.0)
            .with_value_to_string(formatters::v2s_f32_rounded(0)),

            flip_flop: BoolParam::new("Flip Flop", false),

            low_cut: FloatParam::new("Low Cut", 20.0, cutoff_range())
                .with_step_size(1.0)
                .with_value_to_string(formatters::v2s_f32_hz_then_khz(2))
                .with_string_to_value(formatters::s2v_f32_hz_then_khz()),

            high_cut: FloatParam::new("High Cut", 20000.0, cutoff_range())
                .with_step_size(1.0)
                .with_value_to_string(formatters::v2s_f32_hz_then_khz(2))
                .with_string_to_value(formatters::s2v_f32_hz_then_khz()),

            accelerate_mode: EnumParam::new("Accelerate Mode", DelayModeChoice::Repitch),
            decelerate_mode: EnumParam::new("Decelerate Mode", DelayModeChoice::Repitch),

            tempo_sync: BoolParam::new("Tempo Sync", false),
            delay_note: EnumParam::new("Delay Note", NoteLength::Quarter),

            bypass: BoolParam::new("Bypass", false).make_bypass(),
        }
    }
}

impl PluginParams {
    /// Read every parameter once, for one audio block.
    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            gain_db: self.gain.value(),
            delay_time_ms: self.delay_time.value(),
            mix_percent: self.mix.value(),
            feedback_percent: self.feedback.value(),
            flip_flop: self.flip_flop.value(),
            low_cut_hz: self.low_cut.value(),
            high_cut_hz: self.high_cut.value(),
            accelerate_mode: self.accelerate_mode.value().into(),
            decelerate_mode: self.decelerate_mode.value().into(),
            tempo_sync: self.tempo_sync.value(),
            delay_note: self.delay_note.value().to_index(),
        }
    }
}

/// 20 Hz to 20 kHz, skewed towards the low end like human pitch hearing.
fn cutoff_range() -> FloatRange {
    FloatRange::Skewed {
        min: 20.0,
        max: 20000.0,
        factor: 0.3,
    }
}

/// Milliseconds with precision that shrinks as the value grows, switching
/// to seconds from 1000 ms: `4.50ms`, `45.0ms`, `450ms`, `1.50s`.
pub fn v2s_delay_time() -> Arc<dyn Fn(f32) -> String + Send + Sync> {
    Arc::new(|value| {
        if value < 10.0 {
            format!("{value:.2}ms")
        } else if value < 100.0 {
            format!("{value:.1}ms")
        } else if value < 1000.0 {
            format!("{}ms", value as i32)
        } else {
            format!("{:.2}s", value * 0.001)
        }
    })
}

/// Parse a delay time. `ms` means milliseconds. An `s` suffix, or a bare
/// number below the minimum delay time, means seconds.
pub fn s2v_delay_time() -> Arc<dyn Fn(&str) -> Option<f32> + Send + Sync> {
    Arc::new(|text| {
        let text = text.trim().to_ascii_lowercase();

        if let Some(ms) = text.strip_suffix("ms") {
            return ms.trim().parse().ok();
        }

        let (number, in_seconds) = match text.strip_suffix('s') {
            Some(number) => (number, true),
            None => (text.as_str(), false),
        };
        let value: f32 = number.trim().parse().ok()?;

        if in_seconds || value < MIN_DELAY_TIME_MS {
            Some(value * 1000.0)
        } else {
            Some(value)
        }
    })
}
