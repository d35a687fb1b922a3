//! # DSP (Digital Signal Processing) Core
//!
//! Everything that runs on the audio thread. Nothing in here knows about
//! the plugin host. Controls arrive as a [`snapshot::ParameterSnapshot`]
//! once per block.
//!
//! - **`delay_line`**: per-channel ring buffer with fractional reads.
//! - **`smoothing`**: ramps from per-block targets to per-sample values.
//! - **`tempo`**: host tempo + note length → milliseconds.
//! - **`transition`**: how the delay length moves (Repitch, Fade, Duck).
//! - **`filter`**: state-variable low cut / high cut on the wet signal.
//! - **`meter`**: lock-free peak registers for level meters.
//! - **`processor`**: the complete per-sample signal path.

pub mod delay_line;
pub mod filter;
pub mod meter;
pub mod processor;
pub mod smoothing;
pub mod snapshot;
pub mod tempo;
pub mod transition;
