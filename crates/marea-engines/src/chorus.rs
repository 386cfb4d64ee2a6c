//! Chorus.
//!
//! Dual-voice modulated delay. Each channel carries two taps off its
//! own delay line, swept by sine LFOs in quadrature; the right channel's
//! LFOs run phase-inverted so the image breathes instead of pumping.
//! Base delay sits around 15 ms, far enough out that the effect reads as
//! ensemble rather than flanging.
//!
//! # Parameters
//!
//! | Index | Name   | Mapping                        |
//! |-------|--------|--------------------------------|
//! | 0     | Rate   | 0.1 Hz – 5 Hz, log             |
//! | 1     | Depth  | sweep 0 – 6 ms                 |
//! | 2     | Spread | stereo offset between channels |
//! | 3     | Mix    | dry/wet                        |

use libm::powf;
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, FractionalDelay, Interpolation, Lfo,
    SmoothedParam, StereoBlock, wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 4;
const MIX_PARAM: usize = 3;

const BASE_DELAY_MS: f32 = 15.0;
const MAX_SWEEP_MS: f32 = 6.0;

/// One channel: a delay line and two quadrature voices reading it.
struct ChorusChannel {
    line: FractionalDelay,
    lfo_a: Lfo,
    lfo_b: Lfo,
}

impl ChorusChannel {
    fn new(sample_rate: f32, inverted: bool) -> Self {
        let max_samples =
            ((BASE_DELAY_MS + MAX_SWEEP_MS) * 1e-3 * sample_rate) as usize + 4;
        let mut lfo_a = Lfo::new(sample_rate, 0.8);
        let mut lfo_b = Lfo::new(sample_rate, 0.8);
        lfo_b.set_phase_offset(0.25);
        if inverted {
            lfo_a.set_phase_offset(0.5);
            lfo_b.set_phase_offset(0.75);
        }
        let mut line = FractionalDelay::new(max_samples);
        line.set_interpolation(Interpolation::Cubic);
        Self { line, lfo_a, lfo_b }
    }

    fn process(&mut self, input: f32, sample_rate: f32, depth_ms: f32, spread: f32) -> f32 {
        let base = BASE_DELAY_MS * 1e-3 * sample_rate;
        let sweep = depth_ms * 1e-3 * sample_rate;
        // Unipolar sweep keeps both voices behind the base tap.
        let d_a = base + self.lfo_a.next_unipolar() * sweep;
        let d_b = base * (1.0 + spread * 0.3) + self.lfo_b.next_unipolar() * sweep;
        let tap_a = self.line.read(d_a);
        let tap_b = self.line.read(d_b);
        self.line.write(input);
        (tap_a + tap_b) * 0.5
    }
}

/// Dual-voice ensemble (see module docs for the parameter map).
pub struct Chorus {
    sample_rate: f32,
    rate: SmoothedParam,
    depth: SmoothedParam,
    spread: SmoothedParam,
    mix: SmoothedParam,
    left: ChorusChannel,
    right: ChorusChannel,
    applied_rate: f32,
}

impl Chorus {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            sample_rate,
            rate: SmoothedParam::with_config(0.4, sample_rate, 20.0),
            depth: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            spread: SmoothedParam::with_config(0.6, sample_rate, 20.0),
            mix: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            left: ChorusChannel::new(sample_rate, false),
            right: ChorusChannel::new(sample_rate, true),
            applied_rate: -1.0,
        }
    }

    fn rate_hz(norm: f32) -> f32 {
        0.1 * powf(50.0, norm)
    }
}

impl Default for Chorus {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Chorus {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        self.left = ChorusChannel::new(sr, false);
        self.right = ChorusChannel::new(sr, true);
        self.left.lfo_a.set_sample_rate(sr);
        self.left.lfo_b.set_sample_rate(sr);
        self.right.lfo_a.set_sample_rate(sr);
        self.right.lfo_b.set_sample_rate(sr);
        for p in [&mut self.rate, &mut self.depth, &mut self.spread, &mut self.mix] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.applied_rate = -1.0;
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        for (l, r) in block.frames_mut() {
            let rate_norm = self.rate.advance();
            let depth_ms = self.depth.advance() * MAX_SWEEP_MS;
            let spread = self.spread.advance();
            let mix = self.mix.advance();

            if (rate_norm - self.applied_rate).abs() > 1e-3 {
                let hz = Self::rate_hz(rate_norm);
                self.left.lfo_a.set_frequency(hz);
                self.left.lfo_b.set_frequency(hz * 1.07);
                self.right.lfo_a.set_frequency(hz);
                self.right.lfo_b.set_frequency(hz * 1.07);
                self.applied_rate = rate_norm;
            }

            let wet_l = self.left.process(*l, self.sample_rate, depth_ms, spread);
            let wet_r = self.right.process(*r, self.sample_rate, depth_ms, spread);

            *l = wet_dry_mix(*l, wet_l, mix);
            *r = wet_dry_mix(*r, wet_r, mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.left.line.clear();
        self.right.line.clear();
        self.left.lfo_a.reset();
        self.left.lfo_b.reset();
        self.right.lfo_a.reset();
        self.right.lfo_b.reset();
        for p in [&mut self.rate, &mut self.depth, &mut self.spread, &mut self.mix] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.rate.set_target(value),
            1 => self.depth.set_target(value),
            2 => self.spread.set_target(value),
            3 => self.mix.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::CHORUS,
            name: "Chorus",
            category: EngineCategory::Modulation,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    fn run(chorus: &mut Chorus, input: &[f32]) -> (Vec<f32>, Vec<f32>) {
        let mut l = input.to_vec();
        let mut r = input.to_vec();
        for start in (0..input.len()).step_by(256) {
            let end = (start + 256).min(input.len());
            let (lh, rh) = (&mut l[start..end], &mut r[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            chorus.process(&mut block);
        }
        (l, r)
    }

    #[test]
    fn dry_mix_is_transparent() {
        let mut chorus = Chorus::new();
        chorus.set_param(3, 0.0);
        chorus.prepare(48_000.0, 256);
        let input: Vec<f32> = (0..2_048)
            .map(|n| 0.5 * libm::sinf(TAU * 330.0 * n as f32 / 48_000.0))
            .collect();
        let (l, _) = run(&mut chorus, &input);
        for (out, inp) in l[512..].iter().zip(&input[512..]) {
            assert!((out - inp).abs() < 1e-4);
        }
    }

    #[test]
    fn wet_output_decorrelates_channels() {
        let mut chorus = Chorus::new();
        chorus.set_param(1, 1.0);
        chorus.set_param(3, 1.0);
        chorus.prepare(48_000.0, 256);
        let input: Vec<f32> = (0..24_000)
            .map(|n| 0.5 * libm::sinf(TAU * 440.0 * n as f32 / 48_000.0))
            .collect();
        let (l, r) = run(&mut chorus, &input);
        // Inverted LFOs mean the channels differ audibly.
        let diff: f32 = l[4_096..]
            .iter()
            .zip(&r[4_096..])
            .map(|(a, b)| (a - b).abs())
            .sum::<f32>()
            / (l.len() - 4_096) as f32;
        assert!(diff > 1e-3, "mean channel difference {diff}");
    }

    #[test]
    fn output_is_bounded() {
        let mut chorus = Chorus::new();
        chorus.set_param(0, 1.0);
        chorus.set_param(1, 1.0);
        chorus.prepare(48_000.0, 256);
        let input: Vec<f32> = (0..16_384)
            .map(|n| 0.9 * libm::sinf(TAU * 220.0 * n as f32 / 48_000.0))
            .collect();
        let (l, _) = run(&mut chorus, &input);
        assert!(l.iter().all(|s| s.is_finite() && s.abs() <= 2.0));
    }
}
