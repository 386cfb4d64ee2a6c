//! One-pole lowpass filter.
//!
//! The simplest lowpass: 6 dB/octave, one multiply per sample, with
//! `coeff = exp(-2π·freq / sample_rate)` and difference equation
//! `y[n] = x[n] + coeff * (y[n-1] - x[n])`. Used for feedback damping,
//! tone shaping, and in-place IR damping.

use crate::flush_denormal;
use libm::expf;

/// One-pole (6 dB/oct) lowpass.
#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32,
    coeff: f32,
    sample_rate: f32,
    freq: f32,
}

impl OnePole {
    /// Create a lowpass at `freq_hz` for the given sample rate.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut f = Self {
            state: 0.0,
            coeff: 0.0,
            sample_rate,
            freq: freq_hz,
        };
        f.recalculate_coeff();
        f
    }

    /// Compute the one-pole coefficient for an arbitrary cutoff/rate pair.
    ///
    /// Exposed so IR post-processing can run the same damping recurrence
    /// over a buffer without owning a filter instance.
    #[inline]
    pub fn coeff_for(freq_hz: f32, sample_rate: f32) -> f32 {
        expf(-core::f32::consts::TAU * freq_hz / sample_rate.max(1.0))
    }

    /// Set the cutoff frequency.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.freq = freq_hz;
        self.recalculate_coeff();
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(input + self.coeff * (self.state - input));
        self.state
    }

    /// Clear filter state.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }

    /// Retune for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    fn recalculate_coeff(&mut self) {
        self.coeff = Self::coeff_for(self.freq, self.sample_rate);
    }
}
