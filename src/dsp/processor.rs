//! # The Delay Processor
//!
//! Ties the building blocks together into the per-sample signal path.
//! The host-facing plugin calls [`DelayProcessor::prepare()`] when the
//! sample rate is known, then [`DelayProcessor::process_block()`] with a
//! [`ParameterSnapshot`] once per audio block.
//!
//! ## Signal Flow (per channel)
//!
//! ```text
//! dry ──┬─────────────────────────────────────────────── × cos(mix·π/2) ──┐
//!       │                                                                 │
//!       └─► flip-flop ─►(+)─► [Delay Line] ─► crossfade ─► [Low Cut] ─►    │
//!            crossing    ▲                    / duck       [High Cut]     │
//!                        │                                    │           │
//!           flip-flop ◄──┴──── × feedback ◄──── (next sample) ┤           │
//!           crossing                                          │           │
//!                                           wet × sin(mix·π/2) × mix ───►(+)─► × gain ─► out
//! ```
//!
//! Flip-flop crossing only applies to what goes *into* the delay lines.
//! The dry signal in the final mix is always the untouched input.

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use nih_plug::nih_debug_assert;

use super::delay_line::DelayLine;
use super::filter::{FilterType, SvfFilter};
use super::meter::StereoPeakLevels;
use super::smoothing::{SmoothedValues, SmootherBank};
use super::snapshot::{ParameterSnapshot, MAX_DELAY_TIME_MS};
use super::tempo::Tempo;
use super::transition::{DelayTarget, TransitionEngine};

/// Convert a delay time in milliseconds to (fractional) samples.
fn calculate_delay_samples(delay_ms: f32, sample_rate: f32) -> f32 {
    delay_ms * sample_rate / 1000.0
}

/// The complete stereo delay: two delay lines, their filters, the
/// feedback network, and the control state driving them.
pub struct DelayProcessor {
    sample_rate: f32,
    max_block_size: usize,

    delay_lines: [DelayLine; 2],
    low_cut: [SvfFilter; 2],
    high_cut: [SvfFilter; 2],

    smoothers: SmootherBank,
    tempo: Tempo,
    transition: TransitionEngine,

    /// Filtered wet output times feedback from the previous sample, fed
    /// into the next sample's delay-line write.
    feedback: [f32; 2],
    /// Smoothed feedback amount of the last processed sample.
    last_feedback_amount: f32,

    levels: Arc<StereoPeakLevels>,

    /// The next block snaps the smoothers instead of ramping them.
    snap_smoothers: bool,

    /// Only the first channel carries input, even when two are passed.
    mono_input: bool,
}

impl Default for DelayProcessor {
    fn default() -> Self {
        Self {
            sample_rate: 0.0,
            max_block_size: 0,
            delay_lines: Default::default(),
            low_cut: [
                SvfFilter::new(FilterType::Highpass),
                SvfFilter::new(FilterType::Highpass),
            ],
            high_cut: [
                SvfFilter::new(FilterType::Lowpass),
                SvfFilter::new(FilterType::Lowpass),
            ],
            smoothers: SmootherBank::new(),
            tempo: Tempo::new(),
            transition: TransitionEngine::default(),
            feedback: [0.0; 2],
            last_feedback_amount: 0.0,
            levels: Arc::new(StereoPeakLevels::default()),
            snap_smoothers: true,
            mono_input: false,
        }
    }
}

impl DelayProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size every buffer for `sample_rate` and reset all state.
    ///
    /// Allocates. Call from the host's initialize path, never while
    /// processing. `sample_rate` must be positive.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;

        let max_delay_samples =
            calculate_delay_samples(MAX_DELAY_TIME_MS, sample_rate).ceil() as usize;
        for delay_line in &mut self.delay_lines {
            delay_line.set_capacity(max_delay_samples);
        }

        for filter in self.low_cut.iter_mut().chain(self.high_cut.iter_mut()) {
            filter.prepare(sample_rate);
        }

        self.smoothers.prepare(sample_rate);
        self.transition
            .prepare(sample_rate, self.delay_lines[0].max_delay());

        self.reset();
    }

    /// Return to silence: clear delay lines, filters, feedback and
    /// transitions. The next block starts from its parameters with no ramp.
    pub fn reset(&mut self) {
        for delay_line in &mut self.delay_lines {
            delay_line.reset();
        }
        for filter in self.low_cut.iter_mut().chain(self.high_cut.iter_mut()) {
            filter.reset();
        }
        self.transition.reset();
        self.tempo.reset();
        self.feedback = [0.0; 2];
        self.last_feedback_amount = 0.0;
        self.levels.reset();
        self.snap_smoothers = true;
    }

    /// Treat the first channel as the only input. Both delay lines are fed
    /// from it, while every passed channel still receives output. This is
    /// how a mono track drives a stereo output.
    pub fn set_mono_input(&mut self, mono_input: bool) {
        self.mono_input = mono_input;
    }

    /// Output peak registers, for a meter running on another thread.
    pub fn levels(&self) -> Arc<StereoPeakLevels> {
        Arc::clone(&self.levels)
    }

    /// The delay length currently being read, in samples.
    #[cfg(test)]
    pub fn effective_delay(&self) -> f32 {
        self.transition.delay()
    }

    /// The tempo used for the most recent block.
    #[cfg(test)]
    pub fn bpm(&self) -> f64 {
        self.tempo.bpm()
    }

    /// How long the echoes ring on after the input stops: the time for the
    /// feedback loop to fall by 60 dB, or a single delay period without
    /// feedback.
    pub fn tail_samples(&self) -> u32 {
        let delay_samples = self.transition.delay();
        let feedback = self.last_feedback_amount.abs();

        if feedback >= 1.0 {
            u32::MAX
        } else if feedback > 0.001 {
            let repeats = -3.0 / feedback.log10(); // log10(0.001) = -3
            (repeats * delay_samples) as u32
        } else {
            delay_samples as u32
        }
    }

    /// Process one block in place.
    ///
    /// `channels` holds one (mono) or two (stereo) equally long slices;
    /// extra channels are left untouched. With a mono input (see
    /// [`set_mono_input()`](Self::set_mono_input)) the second slice is
    /// output only. `host_bpm` is the host tempo if
    /// the transport reports one.
    pub fn process_block(
        &mut self,
        channels: &mut [&mut [f32]],
        params: &ParameterSnapshot,
        host_bpm: Option<f64>,
    ) {
        let num_channels = channels.len().min(2);
        if num_channels == 0 {
            return;
        }
        let num_frames = channels[0].len();
        nih_debug_assert!(
            channels[..num_channels].iter().all(|c| c.len() == num_frames),
            "channel slices must have equal lengths"
        );
        nih_debug_assert!(
            num_frames <= self.max_block_size,
            "block of {} frames exceeds the prepared maximum of {}",
            num_frames,
            self.max_block_size
        );

        if self.snap_smoothers {
            self.smoothers.reset(params);
            self.snap_smoothers = false;
        }
        self.smoothers.update(params);

        self.tempo.update(host_bpm);
        let synced_ms = (self.tempo.milliseconds_for_note(params.delay_note) as f32)
            .min(MAX_DELAY_TIME_MS);
        let synced_samples = calculate_delay_samples(synced_ms, self.sample_rate);
        let stereo_input = num_channels > 1 && !self.mono_input;

        let mut peak = [0.0_f32; 2];

        for frame in 0..num_frames {
            let dry_left = channels[0][frame];
            let dry_right = if stereo_input {
                channels[1][frame]
            } else {
                dry_left
            };

            // Every shift mode aims at the same length, so handing over
            // between modes never lands on a stale one.
            let values = self.smoothers.step();
            let request = DelayTarget {
                samples: if params.tempo_sync {
                    synced_samples
                } else {
                    calculate_delay_samples(values.delay_time_ms, self.sample_rate)
                },
                tempo_sync: params.tempo_sync,
            };

            let out = self.process_frame([dry_left, dry_right], &values, &request, params);

            channels[0][frame] = out[0];
            if num_channels > 1 {
                channels[1][frame] = out[1];
            }

            peak[0] = peak[0].max(out[0].abs());
            peak[1] = peak[1].max(out[1].abs());
            self.last_feedback_amount = values.feedback;
        }

        self.levels.left.update_if_greater(peak[0]);
        self.levels.right.update_if_greater(peak[1]);
    }

    #[inline]
    fn process_frame(
        &mut self,
        dry: [f32; 2],
        values: &SmoothedValues,
        request: &DelayTarget,
        params: &ParameterSnapshot,
    ) -> [f32; 2] {
        // Re-chosen every sample so selector changes apply immediately.
        let mode = self.transition.select_mode(
            request.samples,
            params.accelerate_mode,
            params.decelerate_mode,
        );
        self.transition.advance(mode, request);

        for channel in 0..2 {
            self.low_cut[channel].set_cutoff(values.low_cut_hz);
            self.high_cut[channel].set_cutoff(values.high_cut_hz);
        }

        let dry_gain = (values.mix * FRAC_PI_2).cos();
        let wet_gain = (values.mix * FRAC_PI_2).sin();

        // Step 1: CROSS the signals entering the delay lines.
        //
        // Flip-flop blends each channel's input with the other side's:
        // 0 keeps left and right apart, 1 swaps them. Applying it to the
        // feedback too means every repeat lands on the opposite side of
        // the one before it (ping-pong). The dry signal in the final mix
        // is never crossed.
        let cross = values.invert_stereo;
        let straight = 1.0 - cross;
        let feedback_in = [
            self.feedback[0] * straight + self.feedback[1] * cross,
            self.feedback[1] * straight + self.feedback[0] * cross,
        ];
        let dry_in = [
            dry[0] * straight + dry[1] * cross,
            dry[1] * straight + dry[0] * cross,
        ];

        // Step 2: WRITE the new input plus last sample's feedback, then
        // READ at the effective delay length. Writing first means a delay
        // of 0 would return this very sample.
        for channel in 0..2 {
            self.delay_lines[channel].write(dry_in[channel] + feedback_in[channel]);
        }

        // Step 3: let the shift mode shape the read. Fade blends in a second
        // read at the new length, Duck scales the wet signal by its envelope.
        let delay = self.transition.delay();
        let lines = &self.delay_lines;
        let wet = [lines[0].read(delay), lines[1].read(delay)];
        let mut wet = self
            .transition
            .finish(mode, wet, |d| [lines[0].read(d), lines[1].read(d)]);

        let mut out = [0.0; 2];
        for channel in 0..2 {
            // Step 4: FILTER the wet signal, low cut then high cut. Since
            // the feedback is taken after the filters, each repeat is
            // filtered again and gets progressively thinner.
            wet[channel] = self.low_cut[channel].process(wet[channel]);
            wet[channel] = self.high_cut[channel].process(wet[channel]);

            // Step 5: SCALE by the feedback amount for the next sample's
            // write. With 0.5 each repeat is half as loud as the last;
            // with -0.5 it also flips polarity.
            self.feedback[channel] = wet[channel] * values.feedback;

            // Step 6: MIX with equal-power gains, then apply output gain.
            //
            // The wet path is scaled by `mix` on top of the equal-power
            // gain, so it only reaches full level at 100 %.
            let mixed = dry[channel] * dry_gain + wet[channel] * wet_gain * values.mix;
            out[channel] = mixed * values.gain;
        }

        out
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::transition::ShiftMode;
    use nih_plug::util;
    use std::f32::consts::PI;

    const SAMPLE_RATE: f32 = 48000.0;
    const BLOCK_SIZE: usize = 512;

    fn prepared() -> DelayProcessor {
        let mut processor = DelayProcessor::new();
        processor.prepare(SAMPLE_RATE, BLOCK_SIZE);
        processor
    }

    /// 100 ms, fully wet, no feedback, unity gain, cuts wide open.
    fn echo_params() -> ParameterSnapshot {
        ParameterSnapshot {
            gain_db: 0.0,
            delay_time_ms: 100.0,
            mix_percent: 100.0,
            feedback_percent: 0.0,
            flip_flop: false,
            low_cut_hz: 20.0,
            high_cut_hz: 20000.0,
            ..ParameterSnapshot::default()
        }
    }

    fn impulse(len: usize, at: usize, value: f32) -> Vec<f32> {
        let mut signal = vec![0.0; len];
        signal[at] = value;
        signal
    }

    /// Run stereo audio through in host-sized blocks.
    fn run_stereo(
        processor: &mut DelayProcessor,
        left: &mut [f32],
        right: &mut [f32],
        params: &ParameterSnapshot,
        bpm: Option<f64>,
    ) {
        for (l, r) in left.chunks_mut(BLOCK_SIZE).zip(right.chunks_mut(BLOCK_SIZE)) {
            let mut channels = [l, r];
            processor.process_block(&mut channels, params, bpm);
        }
    }

    fn first_index_above(signal: &[f32], threshold: f32) -> Option<usize> {
        signal.iter().position(|s| s.abs() > threshold)
    }

    /// A left impulse comes back exactly 4800 frames (100 ms at 48 kHz)
    /// later on the left only, shaped only by the filters.
    #[test]
    fn test_impulse_returns_after_delay_time() {
        let mut processor = prepared();
        let len = 4800 + 200;
        let mut left = impulse(len, 0, 1.0);
        let mut right = vec![0.0; len];

        run_stereo(&mut processor, &mut left, &mut right, &echo_params(), None);

        for (frame, sample) in left[..4800].iter().enumerate() {
            assert!(sample.abs() < 1e-6, "unexpected output {sample} at frame {frame}");
        }
        assert!(
            left[4800] > 0.5 && left[4800] < 1.0,
            "echo at 4800 was {}",
            left[4800]
        );
        assert!(right.iter().all(|s| s.abs() < 1e-6), "right channel should stay silent");
        assert_eq!(processor.effective_delay(), 4800.0);
    }

    /// Mix 0 passes the input through bit for bit.
    #[test]
    fn test_mix_zero_is_dry_only() {
        let mut processor = prepared();
        let params = ParameterSnapshot {
            mix_percent: 0.0,
            feedback_percent: 50.0,
            ..echo_params()
        };
        let input: Vec<f32> = (0..12000).map(|i| ((i * 7919) % 200) as f32 / 100.0 - 1.0).collect();
        let mut left = input.clone();
        let mut right = input.clone();

        run_stereo(&mut processor, &mut left, &mut right, &params, None);

        assert_eq!(left, input);
        assert_eq!(right, input);
    }

    /// Mix 100 % is wet only: the dry impulse is gone and the echo is at
    /// full equal-power level.
    #[test]
    fn test_mix_full_is_wet_only() {
        let mut processor = prepared();
        let len = 5000;
        let mut left = impulse(len, 0, 1.0);
        let mut right = impulse(len, 0, 1.0);

        run_stereo(&mut processor, &mut left, &mut right, &echo_params(), None);

        assert!(left[0].abs() < 1e-6, "dry leaked: {}", left[0]);
        assert!(left[4800] > 0.5);
        assert!((left[4800] - right[4800]).abs() < 1e-7);
    }

    /// At 50 % the wet path gets `sin(π/4) * 0.5`, not just `sin(π/4)`.
    #[test]
    fn test_partial_mix_attenuates_wet_by_mix() {
        let full = {
            let mut processor = prepared();
            let mut left = impulse(5000, 0, 1.0);
            let mut right = vec![0.0; 5000];
            run_stereo(&mut processor, &mut left, &mut right, &echo_params(), None);
            left[4800]
        };

        let mut processor = prepared();
        let params = ParameterSnapshot {
            mix_percent: 50.0,
            ..echo_params()
        };
        let mut left = impulse(5000, 0, 1.0);
        let mut right = vec![0.0; 5000];
        run_stereo(&mut processor, &mut left, &mut right, &params, None);

        let dry_gain = (0.5 * FRAC_PI_2).cos();
        let wet_gain = (0.5 * FRAC_PI_2).sin();
        assert!((left[0] - dry_gain).abs() < 1e-6);
        assert!((left[4800] - full * wet_gain * 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_output_gain() {
        let mut processor = prepared();
        let params = ParameterSnapshot {
            gain_db: -6.0,
            mix_percent: 0.0,
            ..echo_params()
        };
        let mut left = vec![0.5; 256];
        let mut right = vec![-0.5; 256];

        run_stereo(&mut processor, &mut left, &mut right, &params, None);

        let expected = 0.5 * util::db_to_gain(-6.0);
        assert!((left[100] - expected).abs() < 1e-6);
        assert!((right[100] + expected).abs() < 1e-6);
    }

    /// With flip-flop on, a left-only impulse repeats on the right.
    #[test]
    fn test_flip_flop_moves_first_repeat_to_other_side() {
        let mut processor = prepared();
        let params = ParameterSnapshot {
            flip_flop: true,
            ..echo_params()
        };
        let len = 5000;
        let mut left = impulse(len, 0, 1.0);
        let mut right = vec![0.0; len];

        run_stereo(&mut processor, &mut left, &mut right, &params, None);

        assert!(right[4800] > 0.5, "right echo was {}", right[4800]);
        assert!(left.iter().all(|s| s.abs() < 1e-6), "left should hold no echo");
    }

    /// Flip-flop with feedback ping-pongs: left, right, left...
    #[test]
    fn test_flip_flop_alternates_repeats() {
        let mut processor = prepared();
        let params = ParameterSnapshot {
            flip_flop: true,
            feedback_percent: 80.0,
            ..echo_params()
        };
        let len = 9700;
        let mut left = impulse(len, 0, 1.0);
        let mut right = vec![0.0; len];

        run_stereo(&mut processor, &mut left, &mut right, &params, None);

        // Feedback re-enters one sample after the echo is read.
        assert!(right[4800] > 0.5);
        assert!(left[9601] > 0.1, "second repeat on left was {}", left[9601]);
        assert!(right[9601].abs() < 0.01);
    }

    /// Negative feedback flips the polarity of each repeat.
    #[test]
    fn test_negative_feedback_inverts_repeats() {
        let mut processor = prepared();
        let params = ParameterSnapshot {
            feedback_percent: -50.0,
            ..echo_params()
        };
        let len = 9700;
        let mut left = impulse(len, 0, 1.0);
        let mut right = vec![0.0; len];

        run_stereo(&mut processor, &mut left, &mut right, &params, None);

        assert!(left[4800] > 0.5);
        assert!(left[9600].abs() < 0.01, "feedback arrives one sample later");
        assert!(left[9601] < -0.1, "second repeat was {}", left[9601]);
    }

    /// Tempo sync derives the delay from the host tempo.
    #[test]
    fn test_tempo_sync_uses_host_tempo() {
        let mut processor = prepared();
        let params = ParameterSnapshot {
            tempo_sync: true,
            delay_note: 9, // quarter note
            ..echo_params()
        };
        let len = 12100;
        let mut left = impulse(len, 0, 1.0);
        let mut right = vec![0.0; len];

        // 240 BPM quarter = 250 ms = 12000 samples.
        run_stereo(&mut processor, &mut left, &mut right, &params, Some(240.0));

        assert_eq!(first_index_above(&left, 1e-3), Some(12000));
        assert_eq!(processor.bpm(), 240.0);
    }

    #[test]
    fn test_tempo_sync_defaults_to_120_bpm() {
        let mut processor = prepared();
        let params = ParameterSnapshot {
            tempo_sync: true,
            delay_note: 6, // eighth note = 250 ms at 120 BPM
            ..echo_params()
        };
        let mut left = impulse(256, 0, 1.0);
        let mut right = vec![0.0; 256];

        run_stereo(&mut processor, &mut left, &mut right, &params, None);

        assert_eq!(processor.effective_delay(), 12000.0);
    }

    /// Synced delays longer than the maximum are clamped to it.
    #[test]
    fn test_tempo_sync_clamps_to_max_delay() {
        let mut processor = prepared();
        let params = ParameterSnapshot {
            tempo_sync: true,
            delay_note: 15, // whole note = 12 s at 20 BPM
            ..echo_params()
        };
        let mut left = vec![0.0; 256];
        let mut right = vec![0.0; 256];

        run_stereo(&mut processor, &mut left, &mut right, &params, Some(20.0));

        assert_eq!(processor.effective_delay(), 240_000.0);
    }

    /// The longest manual delay still lands inside the buffer.
    #[test]
    fn test_max_delay_time_round_trip() {
        let mut processor = prepared();
        let params = ParameterSnapshot {
            delay_time_ms: MAX_DELAY_TIME_MS,
            ..echo_params()
        };
        let len = 240_000 + 100;
        let mut left = impulse(len, 0, 1.0);
        let mut right = vec![0.0; len];

        run_stereo(&mut processor, &mut left, &mut right, &params, None);

        assert_eq!(first_index_above(&left, 1e-3), Some(240_000));
    }

    /// Run silence through one frame at a time and record the effective
    /// delay after every frame.
    fn delay_trace(processor: &mut DelayProcessor, params: &ParameterSnapshot, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|_| {
                let mut left = [0.0_f32];
                let mut right = [0.0_f32];
                let mut channels = [&mut left[..], &mut right[..]];
                processor.process_block(&mut channels, params, None);
                processor.effective_delay()
            })
            .collect()
    }

    /// Gliding Repitch for shortening and Fade or Duck for lengthening:
    /// once the lengthening transition lands, Repitch must not drag the
    /// delay back to where the glide was. That backwards step would click.
    #[test]
    fn test_mixed_shift_modes_never_jump_backwards() {
        for lengthen in [ShiftMode::Fade, ShiftMode::Duck] {
            let mut processor = prepared();
            let mut params = ParameterSnapshot {
                accelerate_mode: ShiftMode::Repitch,
                decelerate_mode: lengthen,
                ..echo_params()
            };
            delay_trace(&mut processor, &params, 1);
            assert_eq!(processor.effective_delay(), 4800.0);

            params.delay_time_ms = 200.0;
            let delays = delay_trace(&mut processor, &params, 2 * SAMPLE_RATE as usize);

            for (frame, pair) in delays.windows(2).enumerate() {
                assert!(
                    pair[1] >= pair[0],
                    "{lengthen:?}: delay went from {} to {} at frame {}",
                    pair[0],
                    pair[1],
                    frame + 1
                );
            }
            let last = delays[delays.len() - 1];
            assert!((last - 9600.0).abs() < 5.0, "{lengthen:?} settled at {last}");
        }
    }

    /// The duck only ever touches the wet path: while it holds, the output
    /// is exactly the dry input times the equal-power dry gain.
    #[test]
    fn test_duck_leaves_dry_path_untouched() {
        let mut processor = prepared();
        let mut params = ParameterSnapshot {
            delay_time_ms: 1000.0,
            mix_percent: 50.0,
            accelerate_mode: ShiftMode::Duck,
            decelerate_mode: ShiftMode::Duck,
            ..echo_params()
        };
        let mut left = vec![0.0; BLOCK_SIZE];
        let mut right = vec![0.0; BLOCK_SIZE];
        run_stereo(&mut processor, &mut left, &mut right, &params, None);
        assert_eq!(processor.effective_delay(), 48000.0);

        // The delay lines only hold silence from before the tone, so the
        // whole wet path is exactly zero here.
        params.delay_time_ms = 2000.0;
        let tone = |i: usize| (2.0 * PI * 1000.0 * i as f32 / SAMPLE_RATE).sin();
        let dry: Vec<f32> = (0..40_000).map(tone).collect();
        let mut left = dry.clone();
        let mut right = dry.iter().map(|s| -s).collect::<Vec<_>>();
        run_stereo(&mut processor, &mut left, &mut right, &params, None);

        assert!(processor.transition.duck_level() < 0.01, "duck never started");
        assert_eq!(processor.effective_delay(), 48000.0, "jumped too early");

        let dry_gain = (0.5_f32 * FRAC_PI_2).cos();
        for (frame, input) in dry.iter().enumerate() {
            assert_eq!(left[frame], input * dry_gain, "left dry changed at {frame}");
            assert_eq!(right[frame], -input * dry_gain, "right dry changed at {frame}");
        }
    }

    /// Duck holds the wet signal down while the delay time glides, jumps
    /// once it settles, and then lets the wet signal back in.
    #[test]
    fn test_duck_jumps_once_delay_time_settles() {
        let mut processor = prepared();
        let mut params = ParameterSnapshot {
            delay_time_ms: 10.0,
            mix_percent: 50.0,
            accelerate_mode: ShiftMode::Duck,
            decelerate_mode: ShiftMode::Duck,
            ..echo_params()
        };

        let tone = |i: usize| (2.0 * PI * 1000.0 * i as f32 / SAMPLE_RATE).sin();
        let settle = 9600;
        let mut left: Vec<f32> = (0..settle).map(tone).collect();
        let mut right = left.clone();
        run_stereo(&mut processor, &mut left, &mut right, &params, None);
        assert_eq!(processor.effective_delay(), 480.0);

        params.delay_time_ms = 20.0;
        let len = (2.5 * SAMPLE_RATE) as usize;
        let dry: Vec<f32> = (settle..settle + len).map(tone).collect();
        let mut left = dry.clone();
        let mut right = dry.clone();
        run_stereo(&mut processor, &mut left, &mut right, &params, None);

        let dry_gain = (0.5 * FRAC_PI_2).cos();
        let wet_part = |frame: usize| (left[frame] - dry[frame] * dry_gain).abs();

        for frame in 24_000..60_000 {
            assert!(wet_part(frame) < 1e-3, "wet audible while ducked at {frame}");
        }

        let settled = processor.effective_delay();
        assert!((settled - 960.0).abs() < 1.0, "settled at {settled}");

        let returned = (len - 480..len).map(wet_part).fold(0.0_f32, f32::max);
        assert!(returned > 0.2, "wet did not come back: {returned}");
    }

    /// Fade chains crossfades along the glide and ends on the new length.
    #[test]
    fn test_fade_reaches_new_length() {
        let mut processor = prepared();
        let mut params = ParameterSnapshot {
            accelerate_mode: ShiftMode::Fade,
            decelerate_mode: ShiftMode::Fade,
            ..echo_params()
        };
        let mut left = vec![0.0; 512];
        let mut right = vec![0.0; 512];
        run_stereo(&mut processor, &mut left, &mut right, &params, None);

        params.delay_time_ms = 50.0;
        let len = (3.0 * SAMPLE_RATE) as usize;
        let mut left = vec![0.0; len];
        let mut right = vec![0.0; len];
        run_stereo(&mut processor, &mut left, &mut right, &params, None);

        let settled = processor.effective_delay();
        assert!((settled - 2400.0).abs() < 1.5, "settled at {settled}");
        assert_eq!(processor.transition.fade_position(), 0.0);
    }

    #[test]
    fn test_peak_levels_track_block_maximum() {
        let mut processor = prepared();
        let params = ParameterSnapshot {
            mix_percent: 0.0,
            ..echo_params()
        };
        let levels = processor.levels();
        let mut left = impulse(256, 10, 0.8);
        let mut right = impulse(256, 20, -0.9);

        run_stereo(&mut processor, &mut left, &mut right, &params, None);

        assert!((levels.left.read_and_reset() - 0.8).abs() < 1e-6);
        assert!((levels.right.read_and_reset() - 0.9).abs() < 1e-6);
        assert_eq!(levels.left.read_and_reset(), 0.0);
    }

    /// Mono processing duplicates the input into both delay lines.
    #[test]
    fn test_mono_block() {
        let mut processor = prepared();
        let mut mono = impulse(5000, 0, 1.0);
        for block in mono.chunks_mut(BLOCK_SIZE) {
            let mut channels = [block];
            processor.process_block(&mut channels, &echo_params(), None);
        }
        assert_eq!(first_index_above(&mono, 1e-3), Some(4800));
    }

    /// A mono input driving a stereo output: both outputs echo the first
    /// channel, and whatever the second slice held is ignored.
    #[test]
    fn test_mono_input_feeds_stereo_output() {
        let mut processor = prepared();
        processor.set_mono_input(true);

        let len = 5000;
        let mut left = impulse(len, 0, 1.0);
        let mut right = vec![0.7; len];
        run_stereo(&mut processor, &mut left, &mut right, &echo_params(), None);

        assert_eq!(first_index_above(&left, 1e-3), Some(4800));
        assert_eq!(first_index_above(&right, 1e-3), Some(4800));
        assert_eq!(left[4800], right[4800]);
    }

    /// Reset discards everything still travelling through the delay.
    #[test]
    fn test_reset_silences_pending_echoes() {
        let mut processor = prepared();
        let params = echo_params();
        let mut left = impulse(2400, 0, 1.0);
        let mut right = impulse(2400, 0, 1.0);
        run_stereo(&mut processor, &mut left, &mut right, &params, None);

        processor.reset();
        assert_eq!(processor.effective_delay(), 0.0);

        let mut left = vec![0.0; 5000];
        let mut right = vec![0.0; 5000];
        run_stereo(&mut processor, &mut left, &mut right, &params, None);
        assert!(left.iter().chain(right.iter()).all(|s| *s == 0.0));
    }

    #[test]
    fn test_tail_length_follows_feedback() {
        let mut processor = prepared();
        let mut left = vec![0.0; 256];
        let mut right = vec![0.0; 256];
        run_stereo(&mut processor, &mut left, &mut right, &echo_params(), None);
        assert_eq!(processor.tail_samples(), 4800);

        let params = ParameterSnapshot {
            feedback_percent: -10.0,
            ..echo_params()
        };
        let mut processor = prepared();
        run_stereo(&mut processor, &mut left, &mut right, &params, None);
        // 0.1^3 = -60 dB, so three repeats.
        let tail = processor.tail_samples();
        assert!((14399..=14401).contains(&tail), "tail was {tail}");
    }

    #[test]
    fn test_empty_channel_list_is_ignored() {
        let mut processor = prepared();
        let mut channels: [&mut [f32]; 0] = [];
        processor.process_block(&mut channels, &echo_params(), None);
        assert_eq!(processor.effective_delay(), 0.0);
    }
}
