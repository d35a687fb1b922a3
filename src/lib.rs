//! # Loveless Delay II: An AU/VST3/CLAP Delay Plugin
//!
//! A stereo delay built with [nih-plug](https://github.com/robbert-vdh/nih-plug)
//! that outputs Audio Unit (AUv2), VST3, and CLAP formats from a single
//! codebase. Beyond the basic echo it has ping-pong ("flip flop"),
//! tempo sync, filtered repeats, and three ways of reacting when the
//! delay time changes:
//!
//! - **Repitch**: the read head glides, like tape speeding up or slowing
//!   down.
//! - **Fade**: the old and new delay lengths crossfade over 50 ms.
//! - **Jump** (duck): the wet signal dips out, the length jumps, and the
//!   wet signal comes back.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──┬─────────────────────────────────────────── × dry gain ───┐
//!         │                                                          │
//!         │    ┌──────────────────────────────────────────────┐      │
//!         │    │         FEEDBACK LOOP (per channel)          │      │
//!         │    │                                              │      │
//!         └──►(+)──► [Delay Line] ──► [Low Cut] ──► [High Cut]┤      │
//!              ▲      (length moved                           │      │
//!              │       by the shift mode)                     │      │
//!              │                                              ▼      │
//!       flip-flop crossing ◄──────────────────────── × feedback      │
//!                                                             │      │
//!                                     × wet gain × mix ◄──────┘      │
//!                                             │                      │
//!                                             └────────────────────►(+)──► × gain ──► Output
//! ```
//!
//! All of the signal processing lives in [`dsp`], which does not depend
//! on the host. This file only adapts it to nih-plug.

pub mod dsp;
mod params;

use std::num::NonZeroU32;
use std::sync::Arc;

use dsp::processor::DelayProcessor;
use nih_plug::prelude::*;
use params::PluginParams;

/// The main plugin struct.
///
/// Parameters (`PluginParams`) are shared with the host via `Arc` and can
/// be read from any thread. The processor, with its delay lines, filters
/// and smoothers, is owned by the audio thread and only touched in
/// `initialize()`, `reset()` and `process()`.
struct LovelessDelay {
    params: Arc<PluginParams>,
    processor: DelayProcessor,
}

impl Default for LovelessDelay {
    fn default() -> Self {
        Self {
            params: Arc::new(PluginParams::default()),
            // Buffers are empty until initialize() knows the sample rate.
            processor: DelayProcessor::new(),
        }
    }
}

impl Plugin for LovelessDelay {
    const NAME: &'static str = "Loveless Delay II";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // The host picks the first layout that matches the track.
    //
    // A mono input still gets both delay lines internally; the right one
    // is fed a copy of the left input. Mono in → stereo out keeps both
    // outputs, mono → mono keeps only the left one.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        // Stereo layout
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        // Mono source on a stereo bus
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        // Mono fallback
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Parameters are read once per block and smoothed inside the DSP core,
    // so there is nothing to gain from splitting blocks at automation
    // points.
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Called when the plugin is first loaded, or when the sample rate or
    /// maximum block size changes. This is where the delay buffers are
    /// allocated: 5 seconds of audio per channel at the new sample rate.
    ///
    /// Returning `false` tells the host this configuration can't be used.
    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let sample_rate = buffer_config.sample_rate;
        if !(sample_rate > 0.0) {
            nih_error!("Refusing to initialize with a sample rate of {sample_rate} Hz");
            return false;
        }

        let max_block_size = buffer_config.max_buffer_size as usize;
        self.processor.prepare(sample_rate, max_block_size);

        // With one input the host still hands us two buffers for a stereo
        // output; the second one must not be read as a right input.
        let mono_input = audio_io_layout.main_input_channels.map(NonZeroU32::get) == Some(1);
        self.processor.set_mono_input(mono_input);

        nih_log!(
            "Initialized at {sample_rate} Hz, up to {max_block_size} samples per block"
        );
        true
    }

    /// Called when playback stops or the plugin is re-activated. Clears
    /// every buffer so no stale echoes leak into the next playback.
    fn reset(&mut self) {
        self.processor.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        // Bypassed: leave the buffer exactly as the host gave it to us.
        if self.params.bypass.value() {
            return ProcessStatus::Normal;
        }

        let snapshot = self.params.snapshot();
        let host_bpm = context.transport().tempo;

        self.processor
            .process_block(buffer.as_slice(), &snapshot, host_bpm);

        // Keep the host calling process() while the echoes die away.
        ProcessStatus::Tail(self.processor.tail_samples())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Plugin format trait implementations
// ─────────────────────────────────────────────────────────────────────

impl ClapPlugin for LovelessDelay {
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-delay-v2";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A stereo delay with ping-pong, tempo sync and filtered repeats");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for LovelessDelay {
    // Must stay unique across every VST3 plugin; bumped from v001 so both
    // versions can be installed side by side.
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssDelay__v002";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay];
}

// ─────────────────────────────────────────────────────────────────────
// Export macros
// ─────────────────────────────────────────────────────────────────────
//
// nih_export_clap! exports the `clap_entry` symbol for CLAP hosts.
// nih_export_vst3! exports `GetPluginFactory` for VST3 hosts.
// clap_wrapper re-exports the CLAP entry point as AUv2 so Logic Pro
// (Audio Units only) can load it.

nih_export_clap!(LovelessDelay);
nih_export_vst3!(LovelessDelay);
clap_wrapper::export_auv2!();
