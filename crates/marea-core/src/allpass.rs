//! Allpass filters for phase manipulation.
//!
//! Two flavors live here:
//!
//! - [`FirstOrderAllpass`] — unity magnitude, frequency-dependent phase
//!   shift (90° at the break frequency). Chained sections make phase
//!   rotators and phaser cores.
//! - [`ThiranAllpass`] — first-order Thiran fractional delay. Flat
//!   magnitude where linear interpolation would lowpass, so it is the
//!   right tool for sub-sample time alignment.

use core::f32::consts::PI;
use libm::tanf;

use crate::flush_denormal;

/// First-order allpass section.
///
/// ```text
/// y[n] = c * x[n] + x[n-1] - c * y[n-1],   c = (tan(π f/fs) - 1) / (tan(π f/fs) + 1)
/// ```
#[derive(Debug, Clone)]
pub struct FirstOrderAllpass {
    coeff: f32,
    x_prev: f32,
    y_prev: f32,
    sample_rate: f32,
}

impl FirstOrderAllpass {
    /// Create an allpass with its 90° point at `freq_hz`.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut ap = Self {
            coeff: 0.0,
            x_prev: 0.0,
            y_prev: 0.0,
            sample_rate,
        };
        ap.set_frequency(freq_hz);
        ap
    }

    /// Move the 90° phase-shift frequency.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        let limit = self.sample_rate * 0.49;
        let t = tanf(PI * freq_hz.clamp(1.0, limit) / self.sample_rate);
        self.coeff = (t - 1.0) / (t + 1.0);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.coeff * input + self.x_prev - self.coeff * self.y_prev;
        self.x_prev = input;
        self.y_prev = flush_denormal(output);
        self.y_prev
    }

    /// Clear filter history.
    pub fn reset(&mut self) {
        self.x_prev = 0.0;
        self.y_prev = 0.0;
    }
}

/// First-order Thiran allpass fractional delay.
///
/// Delays by `1 + frac` samples (the integer part belongs in a plain delay
/// line). The Thiran coefficient `a = (1 - d) / (1 + d)` gives maximally
/// flat group delay around DC.
#[derive(Debug, Clone)]
pub struct ThiranAllpass {
    coeff: f32,
    x_prev: f32,
    y_prev: f32,
}

impl ThiranAllpass {
    /// Create a Thiran section delaying by `1 + frac` samples, `frac` in
    /// \[0, 1).
    pub fn new(frac: f32) -> Self {
        let mut ap = Self {
            coeff: 0.0,
            x_prev: 0.0,
            y_prev: 0.0,
        };
        ap.set_fraction(frac);
        ap
    }

    /// Update the fractional part of the delay.
    pub fn set_fraction(&mut self, frac: f32) {
        let d = 1.0 + frac.clamp(0.0, 0.999);
        self.coeff = (1.0 - d) / (1.0 + d);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.coeff * input + self.x_prev - self.coeff * self.y_prev;
        self.x_prev = input;
        self.y_prev = flush_denormal(output);
        self.y_prev
    }

    /// Clear filter history.
    pub fn reset(&mut self) {
        self.x_prev = 0.0;
        self.y_prev = 0.0;
    }
}
