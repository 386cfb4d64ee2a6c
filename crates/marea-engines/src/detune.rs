//! Detune.
//!
//! Micro pitch shifter built on a dual-tap delay line: two read heads
//! sweep the line at a constant rate offset from the write head, which
//! plays the buffer back slightly fast or slow. Each head is windowed
//! by a half-sine crossfade and they run half a cycle apart, so as one
//! head jumps back the other carries the signal. The shift range is
//! ±50 cents, thickening rather than transposing.
//!
//! # Parameters
//!
//! | Index | Name   | Mapping                            |
//! |-------|--------|------------------------------------|
//! | 0     | Detune | ±50 cents, center is no shift      |
//! | 1     | Spread | 0: both channels same sign, 1: mirrored |
//! | 2     | Mix    | dry/wet                            |

use core::f32::consts::PI;
use libm::{powf, sinf};
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, FractionalDelay, Interpolation,
    SmoothedParam, StereoBlock, wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 3;
const MIX_PARAM: usize = 2;

const WINDOW_MS: f32 = 50.0;
const MAX_CENTS: f32 = 50.0;

struct DetuneChannel {
    line: FractionalDelay,
    phase: f32,
}

impl DetuneChannel {
    fn new(sample_rate: f32) -> Self {
        let capacity = (WINDOW_MS * 1e-3 * sample_rate) as usize + 8;
        let mut line = FractionalDelay::new(capacity);
        line.set_interpolation(Interpolation::Cubic);
        Self { line, phase: 0.0 }
    }

    /// One sample through both crossfaded heads. `ratio` is the playback
    /// speed, 1.0 meaning no shift.
    fn process(&mut self, input: f32, window_samples: f32, ratio: f32) -> f32 {
        self.line.write(input);
        // The heads drift along the buffer at (1 - ratio) per sample;
        // upward shifts read toward the write head, downward away from it.
        self.phase = (self.phase + (1.0 - ratio) / window_samples).rem_euclid(1.0);

        let mut out = 0.0;
        for head in 0..2 {
            let phase = (self.phase + 0.5 * head as f32).rem_euclid(1.0);
            let delay = (phase * window_samples).max(1.0);
            out += self.line.read(delay) * sinf(PI * phase);
        }
        out
    }

    fn clear(&mut self) {
        self.line.clear();
        self.phase = 0.0;
    }
}

/// Dual-head micro shifter (see module docs for the parameter map).
pub struct Detune {
    sample_rate: f32,
    detune: SmoothedParam,
    spread: SmoothedParam,
    mix: SmoothedParam,
    left: DetuneChannel,
    right: DetuneChannel,
}

impl Detune {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            sample_rate,
            detune: SmoothedParam::with_config(0.6, sample_rate, 20.0),
            spread: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            mix: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            left: DetuneChannel::new(sample_rate),
            right: DetuneChannel::new(sample_rate),
        }
    }
}

impl Default for Detune {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Detune {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        self.left = DetuneChannel::new(sr);
        self.right = DetuneChannel::new(sr);
        for p in [&mut self.detune, &mut self.spread, &mut self.mix] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        let window = WINDOW_MS * 1e-3 * self.sample_rate;
        for (l, r) in block.frames_mut() {
            let cents = (self.detune.advance() - 0.5) * 2.0 * MAX_CENTS;
            let spread = self.spread.advance();
            let mix = self.mix.advance();

            let cents_r = cents * (1.0 - 2.0 * spread);
            let ratio_l = powf(2.0, cents / 1_200.0);
            let ratio_r = powf(2.0, cents_r / 1_200.0);

            let wet_l = self.left.process(*l, window, ratio_l);
            let wet_r = self.right.process(*r, window, ratio_r);

            *l = wet_dry_mix(*l, wet_l, mix);
            *r = wet_dry_mix(*r, wet_r, mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        for p in [&mut self.detune, &mut self.spread, &mut self.mix] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.detune.set_target(value),
            1 => self.spread.set_target(value),
            2 => self.mix.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::DETUNE,
            name: "Detune",
            category: EngineCategory::Pitch,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    fn run(detune: &mut Detune, input: &[f32]) -> (Vec<f32>, Vec<f32>) {
        let mut l = input.to_vec();
        let mut r = input.to_vec();
        for start in (0..input.len()).step_by(256) {
            let end = (start + 256).min(input.len());
            let (lh, rh) = (&mut l[start..end], &mut r[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            detune.process(&mut block);
        }
        (l, r)
    }

    #[test]
    fn dry_mix_is_transparent() {
        let mut detune = Detune::new();
        detune.set_param(2, 0.0);
        detune.prepare(48_000.0, 256);
        let input: Vec<f32> = (0..2_048)
            .map(|n| 0.5 * libm::sinf(TAU * 440.0 * n as f32 / 48_000.0))
            .collect();
        let (l, _) = run(&mut detune, &input);
        for (o, i) in l[512..].iter().zip(&input[512..]) {
            assert!((o - i).abs() < 1e-4);
        }
    }

    #[test]
    fn wet_level_is_comparable_to_dry() {
        // The half-sine crossfade pair should hold the wet level within a
        // few dB of the input.
        let mut detune = Detune::new();
        detune.set_param(0, 0.8);
        detune.set_param(2, 1.0);
        detune.prepare(48_000.0, 256);
        let input: Vec<f32> = (0..48_000)
            .map(|n| 0.5 * libm::sinf(TAU * 440.0 * n as f32 / 48_000.0))
            .collect();
        let (l, _) = run(&mut detune, &input);
        let rms = |sig: &[f32]| (sig.iter().map(|s| s * s).sum::<f32>() / sig.len() as f32).sqrt();
        let out_rms = rms(&l[8_192..]);
        let in_rms = rms(&input[8_192..]);
        assert!(
            out_rms > in_rms * 0.4 && out_rms < in_rms * 2.0,
            "wet level drifted: in {in_rms}, out {out_rms}"
        );
    }

    #[test]
    fn mirrored_spread_decorrelates_channels() {
        let mut detune = Detune::new();
        detune.set_param(0, 0.9);
        detune.set_param(1, 1.0);
        detune.set_param(2, 1.0);
        detune.prepare(48_000.0, 256);
        let input: Vec<f32> = (0..48_000)
            .map(|n| 0.5 * libm::sinf(TAU * 440.0 * n as f32 / 48_000.0))
            .collect();
        let (l, r) = run(&mut detune, &input);
        let mut dot = 0.0f64;
        let mut norm_l = 0.0f64;
        let mut norm_r = 0.0f64;
        for (a, b) in l[8_192..].iter().zip(&r[8_192..]) {
            dot += f64::from(a * b);
            norm_l += f64::from(a * a);
            norm_r += f64::from(b * b);
        }
        let corr = dot / (norm_l.sqrt() * norm_r.sqrt()).max(1e-12);
        assert!(corr < 0.9, "opposed shifts should decorrelate, corr {corr}");
    }
}
