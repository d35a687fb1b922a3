//! Peak-level telemetry shared between the audio thread and a UI.
//!
//! The audio thread publishes each block's peak with
//! [`PeakLevel::update_if_greater()`], and an observer polls at its own
//! rate with [`PeakLevel::read_and_reset()`]. Both sides are lock-free:
//! an `f32` is stored as its bit pattern in an [`AtomicU32`].

use std::sync::atomic::{AtomicU32, Ordering};

/// A "maximum since last read" register for one channel.
#[derive(Debug, Default)]
pub struct PeakLevel {
    bits: AtomicU32,
}

impl PeakLevel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the stored level to `value` if it is greater. Never blocks;
    /// retries only when another writer raced it.
    pub fn update_if_greater(&self, value: f32) {
        let mut current = self.bits.load(Ordering::Relaxed);
        while value > f32::from_bits(current) {
            match self.bits.compare_exchange_weak(
                current,
                value.to_bits(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Return the highest level since the previous read and start over
    /// from zero.
    pub fn read_and_reset(&self) -> f32 {
        f32::from_bits(self.bits.swap(0.0_f32.to_bits(), Ordering::AcqRel))
    }

    pub fn reset(&self) {
        self.bits.store(0.0_f32.to_bits(), Ordering::Release);
    }
}

/// Left and right output peaks.
#[derive(Debug, Default)]
pub struct StereoPeakLevels {
    pub left: PeakLevel,
    pub right: PeakLevel,
}

impl StereoPeakLevels {
    pub fn reset(&self) {
        self.left.reset();
        self.right.reset();
    }
}
