//! Damped feedback comb filter.
//!
//! The reverb building block: a delay line with feedback, a one-pole
//! lowpass in the loop so high frequencies decay faster than lows, and a
//! denormal flush on the recirculating sample.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use crate::flush_denormal;

/// Feedback comb with in-loop damping.
#[derive(Debug, Clone)]
pub struct CombFilter {
    buffer: Vec<f32>,
    pos: usize,
    feedback: f32,
    damping: f32,
    filter_state: f32,
}

impl CombFilter {
    /// Create a comb with the given loop length in samples.
    ///
    /// # Panics
    ///
    /// Panics if `delay_samples` is 0.
    pub fn new(delay_samples: usize) -> Self {
        assert!(delay_samples > 0, "comb delay must be > 0");
        Self {
            buffer: vec![0.0; delay_samples],
            pos: 0,
            feedback: 0.5,
            damping: 0.2,
            filter_state: 0.0,
        }
    }

    /// Set feedback gain (clamped below unity for stability).
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.98);
    }

    /// Set damping amount in \[0, 1\]; higher damps more treble per pass.
    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping.clamp(0.0, 1.0);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.pos];
        self.filter_state =
            flush_denormal(output + self.damping * (self.filter_state - output));
        self.buffer[self.pos] = flush_denormal(input + self.filter_state * self.feedback);
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }

    /// Zero the loop.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.pos = 0;
    }

    /// Loop length in samples.
    pub fn delay_samples(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_recirculates_at_loop_length() {
        let mut comb = CombFilter::new(10);
        comb.set_feedback(0.5);
        comb.set_damping(0.0);
        let mut outputs = [0.0f32; 25];
        for (n, out) in outputs.iter_mut().enumerate() {
            *out = comb.process(if n == 0 { 1.0 } else { 0.0 });
        }
        assert_eq!(outputs[10], 1.0);
        assert!((outputs[20] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn feedback_clamped_below_unity() {
        let mut comb = CombFilter::new(4);
        comb.set_feedback(1.5);
        comb.set_damping(0.0);
        let mut peak = 0.0f32;
        for n in 0..4_000 {
            let out = comb.process(if n == 0 { 1.0 } else { 0.0 });
            peak = peak.max(out.abs());
        }
        assert!(peak <= 1.0, "clamped feedback must not blow up, peak {peak}");
    }

    #[test]
    fn damping_shortens_decay() {
        let energy_after = |damping: f32| {
            let mut comb = CombFilter::new(10);
            comb.set_feedback(0.9);
            comb.set_damping(damping);
            let mut energy = 0.0f64;
            for n in 0..2_000 {
                let out = comb.process(if n == 0 { 1.0 } else { 0.0 });
                if n > 500 {
                    energy += f64::from(out * out);
                }
            }
            energy
        };
        assert!(energy_after(0.8) < energy_after(0.0));
    }

    #[test]
    fn clear_silences_loop() {
        let mut comb = CombFilter::new(8);
        for _ in 0..16 {
            comb.process(1.0);
        }
        comb.clear();
        assert_eq!(comb.process(0.0), 0.0);
    }
}
