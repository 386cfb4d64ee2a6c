//! Envelope follower.
//!
//! Peak rectifier with separate attack and release one-pole ballistics.
//! Dynamics engines (compressor, gate, limiter) and the spectral gate's
//! per-bin envelopes all run this recurrence.

use libm::expf;

use crate::flush_denormal;

/// Attack/release envelope follower.
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    attack_ms: f32,
    release_ms: f32,
    sample_rate: f32,
}

impl EnvelopeFollower {
    /// Create a follower with the given ballistics in milliseconds.
    pub fn new(sample_rate: f32, attack_ms: f32, release_ms: f32) -> Self {
        let mut env = Self {
            envelope: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            attack_ms,
            release_ms,
            sample_rate,
        };
        env.update_coefficients();
        env
    }

    /// Set attack time in milliseconds (0 = instant).
    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        self.attack_ms = attack_ms.max(0.0);
        self.update_coefficients();
    }

    /// Set release time in milliseconds (0 = instant).
    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.release_ms = release_ms.max(0.0);
        self.update_coefficients();
    }

    /// Retune ballistics for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }

    /// Track the rectified input; returns the current envelope.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let level = input.abs();
        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = flush_denormal(level + coeff * (self.envelope - level));
        self.envelope
    }

    /// Current envelope value without advancing.
    pub fn value(&self) -> f32 {
        self.envelope
    }

    /// Drop the envelope to silence.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    fn update_coefficients(&mut self) {
        self.attack_coeff = Self::coeff_for(self.attack_ms, self.sample_rate);
        self.release_coeff = Self::coeff_for(self.release_ms, self.sample_rate);
    }

    fn coeff_for(time_ms: f32, sample_rate: f32) -> f32 {
        if time_ms <= 0.0 {
            0.0
        } else {
            expf(-1.0 / (time_ms * 1e-3 * sample_rate.max(1.0)))
        }
    }
}
