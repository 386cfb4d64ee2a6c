//! DC blocking filter.
//!
//! First-order highpass with a pole just inside the unit circle:
//!
//! ```text
//! H(z) = (1 - z^-1) / (1 - R * z^-1)
//! ```
//!
//! At 48 kHz, R = 0.995 puts the -3 dB point near 8 Hz — inaudible, but it
//! keeps rectifying nonlinearities and mono-sum stages from accumulating
//! offset.
//!
//! Reference: Julius O. Smith, "Introduction to Digital Filters".

use core::f32::consts::TAU;

/// First-order DC blocker.
#[derive(Debug, Clone)]
pub struct DcBlocker {
    coeff: f32,
    x_prev: f32,
    y_prev: f32,
}

impl DcBlocker {
    const CUTOFF_HZ: f32 = 8.0;

    /// Create a DC blocker tuned for the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            coeff: Self::coeff_for(sample_rate),
            x_prev: 0.0,
            y_prev: 0.0,
        }
    }

    /// `y[n] = x[n] - x[n-1] + R * y[n-1]`
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = input - self.x_prev + self.coeff * self.y_prev;
        self.x_prev = input;
        self.y_prev = output;
        output
    }

    /// Clear filter history.
    pub fn reset(&mut self) {
        self.x_prev = 0.0;
        self.y_prev = 0.0;
    }

    /// Retune the pole for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.coeff = Self::coeff_for(sample_rate);
    }

    fn coeff_for(sample_rate: f32) -> f32 {
        (1.0 - TAU * Self::CUTOFF_HZ / sample_rate.max(1.0)).clamp(0.9, 0.9999)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_dc_offset() {
        let mut blocker = DcBlocker::new(48_000.0);
        let mut out = 0.0;
        for _ in 0..48_000 {
            out = blocker.process(1.0);
        }
        assert!(out.abs() < 0.01, "DC should decay away, got {out}");
    }

    #[test]
    fn passes_audio_band() {
        let mut blocker = DcBlocker::new(48_000.0);
        // 1 kHz sine, measure output RMS vs input RMS
        let mut in_sq = 0.0f64;
        let mut out_sq = 0.0f64;
        for n in 0..48_000 {
            let x = libm::sinf(TAU * 1_000.0 * n as f32 / 48_000.0);
            let y = blocker.process(x);
            in_sq += f64::from(x * x);
            out_sq += f64::from(y * y);
        }
        let ratio = (out_sq / in_sq).sqrt();
        assert!((ratio - 1.0).abs() < 0.01, "1 kHz should pass, ratio {ratio}");
    }

    #[test]
    fn reset_clears_state() {
        let mut blocker = DcBlocker::new(48_000.0);
        for _ in 0..100 {
            blocker.process(0.7);
        }
        blocker.reset();
        assert_eq!(blocker.process(0.0), 0.0);
    }
}
