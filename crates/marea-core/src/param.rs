//! Normalized parameter smoothing.
//!
//! Engines receive parameter changes between blocks as normalized \[0, 1\]
//! targets and smooth toward them once per sample, so control-thread writes
//! never produce zipper noise on the audio thread. A torn f32 write is
//! harmless here: the next sample simply smooths toward whatever value
//! landed.
//!
//! ```rust
//! use marea_core::SmoothedParam;
//!
//! let mut mix = SmoothedParam::with_config(0.0, 48_000.0, 20.0);
//! mix.set_target(1.0);
//! for _ in 0..960 {
//!     let _m = mix.advance(); // climbs toward 1.0 over ~20 ms
//! }
//! ```

use libm::expf;

/// One-pole exponential parameter smoother.
///
/// Per-sample update: `current = target + (current - target) * coeff` with
/// `coeff = exp(-1 / (time_ms * 1e-3 * sample_rate))`. A smoothing time of
/// zero degenerates to instant tracking.
///
/// `target` is written from the control thread; `current` advances only on
/// the audio thread.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    sample_rate: f32,
    smoothing_ms: f32,
}

impl SmoothedParam {
    /// Create an unsmoothed parameter at `initial` (coeff 0 = instant).
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 0.0,
            sample_rate: 48_000.0,
            smoothing_ms: 0.0,
        }
    }

    /// Create a parameter with sample rate and smoothing time configured.
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_ms: f32) -> Self {
        let mut p = Self::new(initial);
        p.sample_rate = sample_rate;
        p.smoothing_ms = smoothing_ms;
        p.recalculate_coeff();
        p
    }

    /// Set the value to smooth toward.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set both target and current, bypassing smoothing.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current = self.target + (self.current - self.target) * self.coeff;
        self.current
    }

    /// Current smoothed value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// The value being smoothed toward.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Jump the smoothed value straight to the target.
    ///
    /// Called from `reset()` so a cleared engine does not glide in from a
    /// stale value.
    #[inline]
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    /// Update the sample rate and recompute the coefficient.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    /// Set the smoothing time constant in milliseconds.
    ///
    /// 5–10 ms suits gain-like parameters, 20–50 ms filter cutoffs.
    pub fn set_smoothing_time_ms(&mut self, time_ms: f32) {
        self.smoothing_ms = time_ms;
        self.recalculate_coeff();
    }

    /// `coeff = exp(-1 / (tau_samples))`, tau in samples. After one time
    /// constant the parameter covers 63.2% of the remaining distance.
    fn recalculate_coeff(&mut self) {
        if self.smoothing_ms <= 0.0 || self.sample_rate <= 0.0 {
            self.coeff = 0.0;
        } else {
            let tau_samples = self.smoothing_ms * 1e-3 * self.sample_rate;
            self.coeff = expf(-1.0 / tau_samples);
        }
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_when_unsmoothed() {
        let mut p = SmoothedParam::new(0.0);
        p.set_target(0.75);
        assert!((p.advance() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn converges_to_target() {
        let mut p = SmoothedParam::with_config(0.0, 48_000.0, 10.0);
        p.set_target(1.0);
        for _ in 0..48_000 / 10 {
            p.advance(); // 100 ms = 10 time constants
        }
        assert!((p.get() - 1.0).abs() < 1e-3, "got {}", p.get());
    }

    #[test]
    fn one_time_constant_reaches_63_percent() {
        let sr = 48_000.0;
        let tau_ms = 10.0;
        let mut p = SmoothedParam::with_config(0.0, sr, tau_ms);
        p.set_target(1.0);

        let n = (tau_ms * 1e-3 * sr) as usize;
        for _ in 0..n {
            p.advance();
        }

        let expected = 1.0 - expf(-1.0);
        assert!(
            (p.get() - expected).abs() < 0.05 * expected + 0.01,
            "after one tau expected ~{expected}, got {}",
            p.get()
        );
    }

    #[test]
    fn monotone_rise() {
        let mut p = SmoothedParam::with_config(0.0, 48_000.0, 5.0);
        p.set_target(1.0);
        let mut prev = 0.0;
        for _ in 0..2000 {
            let v = p.advance();
            assert!(v >= prev, "smoothing must be monotone: {v} < {prev}");
            prev = v;
        }
    }

    #[test]
    fn set_immediate_bypasses_smoothing() {
        let mut p = SmoothedParam::with_config(0.0, 48_000.0, 100.0);
        p.set_immediate(0.5);
        assert_eq!(p.get(), 0.5);
        assert_eq!(p.target(), 0.5);
    }

    #[test]
    fn snap_jumps_to_target() {
        let mut p = SmoothedParam::with_config(0.0, 48_000.0, 100.0);
        p.set_target(1.0);
        p.advance();
        p.snap_to_target();
        assert_eq!(p.get(), 1.0);
    }
}
