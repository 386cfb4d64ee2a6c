//! Ring modulator.
//!
//! Multiplies the signal by a sine carrier, replacing the input's
//! spectrum with sum and difference frequencies. A tracking blend
//! slides the carrier between a fixed oscillator and one whose
//! amplitude follows the input envelope, which keeps the effect quiet
//! when the source is quiet instead of emitting a bare carrier bleed.
//!
//! # Parameters
//!
//! | Index | Name      | Mapping                         |
//! |-------|-----------|---------------------------------|
//! | 0     | Frequency | carrier 20 Hz – 5 kHz, log      |
//! | 1     | Fine      | ±50 cents around the carrier    |
//! | 2     | Tracking  | envelope-gated carrier amount   |
//! | 3     | Mix       | dry/wet                         |

use core::f32::consts::TAU;
use libm::{powf, sinf};
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, EnvelopeFollower, SmoothedParam, StereoBlock,
    wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 4;
const MIX_PARAM: usize = 3;

/// Carrier multiplier (see module docs for the parameter map).
pub struct RingMod {
    sample_rate: f32,
    frequency: SmoothedParam,
    fine: SmoothedParam,
    tracking: SmoothedParam,
    mix: SmoothedParam,
    phase: f32,
    envelope: EnvelopeFollower,
}

impl RingMod {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            sample_rate,
            frequency: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            fine: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            tracking: SmoothedParam::with_config(0.0, sample_rate, 20.0),
            mix: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            phase: 0.0,
            envelope: EnvelopeFollower::new(sample_rate, 1.0, 80.0),
        }
    }

    fn carrier_hz(freq_norm: f32, fine_norm: f32) -> f32 {
        let base = 20.0 * powf(250.0, freq_norm);
        let cents = (fine_norm - 0.5) * 100.0;
        base * powf(2.0, cents / 1_200.0)
    }
}

impl Default for RingMod {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for RingMod {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        self.envelope.set_sample_rate(sr);
        for p in [&mut self.frequency, &mut self.fine, &mut self.tracking, &mut self.mix] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        for (l, r) in block.frames_mut() {
            let freq_norm = self.frequency.advance();
            let fine_norm = self.fine.advance();
            let tracking = self.tracking.advance();
            let mix = self.mix.advance();

            let hz = Self::carrier_hz(freq_norm, fine_norm);
            self.phase = (self.phase + hz / self.sample_rate).rem_euclid(1.0);
            let carrier = sinf(TAU * self.phase);

            // Envelope scaling pulls the carrier down with the program.
            let env = self.envelope.process(l.abs().max(r.abs()));
            let amount = 1.0 - tracking + tracking * (env * 3.0).min(1.0);
            let mod_gain = carrier * amount;

            *l = wet_dry_mix(*l, *l * mod_gain, mix);
            *r = wet_dry_mix(*r, *r * mod_gain, mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.phase = 0.0;
        self.envelope.reset();
        for p in [&mut self.frequency, &mut self.fine, &mut self.tracking, &mut self.mix] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.frequency.set_target(value),
            1 => self.fine.set_target(value),
            2 => self.tracking.set_target(value),
            3 => self.mix.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::RING_MOD,
            name: "Ring Mod",
            category: EngineCategory::Experimental,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(ring: &mut RingMod, input: &[f32]) -> Vec<f32> {
        let mut l = input.to_vec();
        let mut r = input.to_vec();
        for start in (0..input.len()).step_by(256) {
            let end = (start + 256).min(input.len());
            let (lh, rh) = (&mut l[start..end], &mut r[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            ring.process(&mut block);
        }
        l
    }

    #[test]
    fn dry_mix_is_transparent() {
        let mut ring = RingMod::new();
        ring.set_param(3, 0.0);
        ring.prepare(48_000.0, 256);
        let input = vec![0.4f32; 1_024];
        let out = run(&mut ring, &input);
        assert!((out[1_000] - 0.4).abs() < 1e-4);
    }

    #[test]
    fn dc_input_becomes_the_carrier() {
        // Ring modulating DC yields the carrier itself: a zero-mean tone.
        let mut ring = RingMod::new();
        ring.set_param(0, 0.5);
        ring.set_param(3, 1.0);
        ring.prepare(48_000.0, 256);
        let input = vec![0.5f32; 24_000];
        let out = run(&mut ring, &input);
        let mean: f32 = out[4_096..].iter().sum::<f32>() / (out.len() - 4_096) as f32;
        let rms = (out[4_096..].iter().map(|s| s * s).sum::<f32>()
            / (out.len() - 4_096) as f32)
            .sqrt();
        assert!(mean.abs() < 0.02, "output should be zero-mean, got {mean}");
        assert!(rms > 0.2, "carrier should be audible, rms {rms}");
    }

    #[test]
    fn tracking_silences_the_output_on_silence() {
        let mut ring = RingMod::new();
        ring.set_param(2, 1.0);
        ring.set_param(3, 1.0);
        ring.prepare(48_000.0, 256);
        let input = vec![0.0f32; 8_192];
        let out = run(&mut ring, &input);
        assert!(out.iter().all(|s| s.abs() < 1e-6));
    }
}
