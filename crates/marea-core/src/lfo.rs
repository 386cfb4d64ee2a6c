//! Low-frequency oscillator.
//!
//! Phase-accumulator LFO with a bipolar output in \[-1, 1\]. A phase
//! offset parameter lets stereo engines run quadrature or inverted pairs
//! from one frequency setting.

use core::f32::consts::TAU;
use libm::sinf;

/// LFO waveform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    /// Sine, the default for wow and chorus.
    #[default]
    Sine,
    /// Triangle, linear sweep for flanging.
    Triangle,
}

/// Phase-accumulator low-frequency oscillator.
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f32,
    phase_offset: f32,
    increment: f32,
    frequency: f32,
    sample_rate: f32,
    waveform: LfoWaveform,
}

impl Lfo {
    /// Create an LFO at `frequency` Hz.
    pub fn new(sample_rate: f32, frequency: f32) -> Self {
        let mut lfo = Self {
            phase: 0.0,
            phase_offset: 0.0,
            increment: 0.0,
            frequency,
            sample_rate,
            waveform: LfoWaveform::Sine,
        };
        lfo.update_increment();
        lfo
    }

    /// Set oscillation frequency in Hz.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency.max(0.0);
        self.update_increment();
    }

    /// Select the waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Fixed phase offset in \[0, 1\) of a cycle (0.25 = quadrature,
    /// 0.5 = inverted).
    pub fn set_phase_offset(&mut self, offset: f32) {
        self.phase_offset = offset.rem_euclid(1.0);
    }

    /// Retune for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_increment();
    }

    /// Produce the next bipolar sample and advance the phase.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let phase = (self.phase + self.phase_offset).rem_euclid(1.0);
        let out = match self.waveform {
            LfoWaveform::Sine => sinf(TAU * phase),
            LfoWaveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
        };
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        out
    }

    /// Next sample mapped to unipolar \[0, 1\].
    #[inline]
    pub fn next_unipolar(&mut self) -> f32 {
        0.5 * (self.next() + 1.0)
    }

    /// Restart the cycle at phase zero.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    fn update_increment(&mut self) {
        self.increment = self.frequency / self.sample_rate.max(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_starts_at_zero_rising() {
        let mut lfo = Lfo::new(48_000.0, 1.0);
        let first = lfo.next();
        let second = lfo.next();
        assert!(first.abs() < 1e-6);
        assert!(second > first);
    }

    #[test]
    fn completes_one_cycle() {
        let mut lfo = Lfo::new(1_000.0, 10.0);
        // 100 samples per cycle; after exactly one cycle we are back near 0.
        let mut last = 0.0;
        for _ in 0..100 {
            last = lfo.next();
        }
        let next = lfo.next();
        assert!(next.abs() < 0.1, "cycle should wrap, got {next} after {last}");
    }

    #[test]
    fn triangle_stays_in_range() {
        let mut lfo = Lfo::new(48_000.0, 3.0);
        lfo.set_waveform(LfoWaveform::Triangle);
        for _ in 0..48_000 {
            let v = lfo.next();
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn half_cycle_offset_inverts() {
        let mut a = Lfo::new(48_000.0, 2.0);
        let mut b = Lfo::new(48_000.0, 2.0);
        b.set_phase_offset(0.5);
        for _ in 0..1_000 {
            let va = a.next();
            let vb = b.next();
            assert!((va + vb).abs() < 1e-4);
        }
    }

    #[test]
    fn unipolar_range() {
        let mut lfo = Lfo::new(48_000.0, 5.0);
        for _ in 0..10_000 {
            let v = lfo.next_unipolar();
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
