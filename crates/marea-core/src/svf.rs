//! State variable filter (TPT topology).
//!
//! Zero-delay-feedback state variable filter after Vadim Zavalishin's
//! topology-preserving transform. Stable under fast cutoff modulation,
//! which is why the filter and wah engines build on it rather than on a
//! biquad.

use core::f32::consts::PI;
use libm::tanf;

use crate::flush_denormal;

/// Filter response selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SvfMode {
    /// 12 dB/oct lowpass.
    #[default]
    Lowpass,
    /// Constant-peak bandpass.
    Bandpass,
    /// 12 dB/oct highpass.
    Highpass,
    /// Notch (lowpass + highpass).
    Notch,
}

/// TPT state variable filter.
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    g: f32,
    k: f32,
    ic1: f32,
    ic2: f32,
    sample_rate: f32,
    cutoff: f32,
    resonance: f32,
    mode: SvfMode,
}

impl StateVariableFilter {
    /// Create a filter at the given sample rate (1 kHz lowpass, Q = 0.707).
    pub fn new(sample_rate: f32) -> Self {
        let mut svf = Self {
            g: 0.0,
            k: 0.0,
            ic1: 0.0,
            ic2: 0.0,
            sample_rate,
            cutoff: 1_000.0,
            resonance: 0.707,
            mode: SvfMode::Lowpass,
        };
        svf.update_coefficients();
        svf
    }

    /// Set the cutoff frequency in Hz (clamped below Nyquist).
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff = cutoff_hz.clamp(10.0, self.sample_rate * 0.49);
        self.update_coefficients();
    }

    /// Set resonance as a Q value (0.5 to ~20).
    pub fn set_resonance(&mut self, q: f32) {
        self.resonance = q.clamp(0.5, 20.0);
        self.update_coefficients();
    }

    /// Select the filter response.
    pub fn set_mode(&mut self, mode: SvfMode) {
        self.mode = mode;
    }

    /// Retune for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.set_cutoff(self.cutoff);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let a1 = 1.0 / (1.0 + self.g * (self.g + self.k));
        let v1 = a1 * (self.ic1 + self.g * (input - self.ic2));
        let v2 = self.ic2 + self.g * v1;
        self.ic1 = flush_denormal(2.0 * v1 - self.ic1);
        self.ic2 = flush_denormal(2.0 * v2 - self.ic2);

        match self.mode {
            SvfMode::Lowpass => v2,
            SvfMode::Bandpass => v1,
            SvfMode::Highpass => input - self.k * v1 - v2,
            SvfMode::Notch => input - self.k * v1,
        }
    }

    /// Clear the integrator states.
    pub fn reset(&mut self) {
        self.ic1 = 0.0;
        self.ic2 = 0.0;
    }

    fn update_coefficients(&mut self) {
        self.g = tanf(PI * self.cutoff / self.sample_rate);
        self.k = 1.0 / self.resonance;
    }
}
