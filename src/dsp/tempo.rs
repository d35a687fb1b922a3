//! # Tempo Sync
//!
//! Converts the host tempo and a note-length selection into a delay time:
//!
//! ```text
//! ms = 60000 * beats / bpm
//! ```
//!
//! where `beats` is the note length measured in quarter notes. A quarter
//! note at 120 BPM is exactly 500 ms.

/// Tempo used when the host reports no transport or no tempo.
pub const DEFAULT_BPM: f64 = 120.0;

/// Note lengths in quarter-note beats, shortest first.
pub const NOTE_LENGTH_BEATS: [f64; 16] = [
    0.125,       // 1/32
    0.5 / 3.0,   // 1/16 triplet
    0.1875,      // 1/32 dotted
    0.25,        // 1/16
    1.0 / 3.0,   // 1/8 triplet
    0.375,       // 1/16 dotted
    0.5,         // 1/8
    2.0 / 3.0,   // 1/4 triplet
    0.75,        // 1/8 dotted
    1.0,         // 1/4
    4.0 / 3.0,   // 1/2 triplet
    1.5,         // 1/4 dotted
    2.0,         // 1/2
    8.0 / 3.0,   // 1/1 triplet
    3.0,         // 1/2 dotted
    4.0,         // 1/1
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: DEFAULT_BPM }
    }
}

impl Tempo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fall back to the default tempo.
    pub fn reset(&mut self) {
        self.bpm = DEFAULT_BPM;
    }

    /// Adopt the host tempo for this block. `None`, or a tempo that isn't a
    /// positive finite number, means 120 BPM.
    pub fn update(&mut self, host_bpm: Option<f64>) {
        self.bpm = match host_bpm {
            Some(bpm) if bpm.is_finite() && bpm > 0.0 => bpm,
            _ => DEFAULT_BPM,
        };
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Length of note `index` in milliseconds at the current tempo.
    /// Indices past the end of the table use the longest note.
    pub fn milliseconds_for_note(&self, index: usize) -> f64 {
        let beats = NOTE_LENGTH_BEATS[index.min(NOTE_LENGTH_BEATS.len() - 1)];
        60000.0 * beats / self.bpm
    }
}
