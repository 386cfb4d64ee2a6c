//! Flanger.
//!
//! Swept short delay with feedback. The delay runs 1 – 9 ms, close
//! enough to the dry signal that the comb notches march through the
//! audible band; feedback sharpens the combs into resonant peaks.
//! The right channel's LFO runs inverted for stereo movement.
//!
//! # Parameters
//!
//! | Index | Name     | Mapping            |
//! |-------|----------|--------------------|
//! | 0     | Rate     | 0.05 Hz – 2 Hz, log|
//! | 1     | Depth    | sweep 0 – 4 ms     |
//! | 2     | Feedback | 0 – ±0.9, bipolar  |
//! | 3     | Mix      | dry/wet            |

use libm::powf;
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, FractionalDelay, Interpolation, Lfo,
    SmoothedParam, StereoBlock, flush_denormal, wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 4;
const MIX_PARAM: usize = 3;

const BASE_DELAY_MS: f32 = 1.0;
const MAX_SWEEP_MS: f32 = 4.0;

struct FlangerChannel {
    line: FractionalDelay,
    lfo: Lfo,
    feedback_state: f32,
}

impl FlangerChannel {
    fn new(sample_rate: f32, inverted: bool) -> Self {
        let max_samples =
            ((BASE_DELAY_MS + MAX_SWEEP_MS) * 1e-3 * sample_rate) as usize + 4;
        let mut line = FractionalDelay::new(max_samples);
        line.set_interpolation(Interpolation::Cubic);
        let mut lfo = Lfo::new(sample_rate, 0.25);
        if inverted {
            lfo.set_phase_offset(0.5);
        }
        Self {
            line,
            lfo,
            feedback_state: 0.0,
        }
    }

    fn process(&mut self, input: f32, sample_rate: f32, depth_ms: f32, feedback: f32) -> f32 {
        let base = BASE_DELAY_MS * 1e-3 * sample_rate;
        let sweep = depth_ms * 1e-3 * sample_rate;
        let delay = base + self.lfo.next_unipolar() * sweep;
        let tap = self.line.read(delay);
        self.line.write(input + self.feedback_state * feedback);
        self.feedback_state = flush_denormal(tap);
        tap
    }

    fn clear(&mut self) {
        self.line.clear();
        self.lfo.reset();
        self.feedback_state = 0.0;
    }
}

/// Swept comb (see module docs for the parameter map).
pub struct Flanger {
    sample_rate: f32,
    rate: SmoothedParam,
    depth: SmoothedParam,
    feedback: SmoothedParam,
    mix: SmoothedParam,
    left: FlangerChannel,
    right: FlangerChannel,
    applied_rate: f32,
}

impl Flanger {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            sample_rate,
            rate: SmoothedParam::with_config(0.4, sample_rate, 20.0),
            depth: SmoothedParam::with_config(0.6, sample_rate, 20.0),
            feedback: SmoothedParam::with_config(0.3, sample_rate, 20.0),
            mix: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            left: FlangerChannel::new(sample_rate, false),
            right: FlangerChannel::new(sample_rate, true),
            applied_rate: -1.0,
        }
    }

    fn rate_hz(norm: f32) -> f32 {
        0.05 * powf(40.0, norm)
    }
}

impl Default for Flanger {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Flanger {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        self.left = FlangerChannel::new(sr, false);
        self.right = FlangerChannel::new(sr, true);
        for p in [&mut self.rate, &mut self.depth, &mut self.feedback, &mut self.mix] {
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
            // norm 0.5 is zero feedback; either side is ±0.9 max.
            let feedback = (self.feedback.advance() - 0.5) * 1.8;
            let mix = self.mix.advance();

            if (rate_norm - self.applied_rate).abs() > 1e-3 {
                let hz = Self::rate_hz(rate_norm);
                self.left.lfo.set_frequency(hz);
                self.right.lfo.set_frequency(hz);
                self.applied_rate = rate_norm;
            }

            let wet_l = self.left.process(*l, self.sample_rate, depth_ms, feedback);
            let wet_r = self.right.process(*r, self.sample_rate, depth_ms, feedback);

            *l = wet_dry_mix(*l, wet_l, mix);
            *r = wet_dry_mix(*r, wet_r, mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        for p in [&mut self.rate, &mut self.depth, &mut self.feedback, &mut self.mix] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.rate.set_target(value),
            1 => self.depth.set_target(value),
            2 => self.feedback.set_target(value),
            3 => self.mix.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::FLANGER,
            name: "Flanger",
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

    fn run(flanger: &mut Flanger, input: &[f32]) -> Vec<f32> {
        let mut l = input.to_vec();
        let mut r = input.to_vec();
        for start in (0..input.len()).step_by(256) {
            let end = (start + 256).min(input.len());
            let (lh, rh) = (&mut l[start..end], &mut r[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            flanger.process(&mut block);
        }
        l
    }

    #[test]
    fn dry_mix_is_transparent() {
        let mut flanger = Flanger::new();
        flanger.set_param(3, 0.0);
        flanger.prepare(48_000.0, 256);
        let input: Vec<f32> = (0..2_048)
            .map(|n| 0.5 * libm::sinf(TAU * 330.0 * n as f32 / 48_000.0))
            .collect();
        let out = run(&mut flanger, &input);
        for (o, i) in out[512..].iter().zip(&input[512..]) {
            assert!((o - i).abs() < 1e-4);
        }
    }

    #[test]
    fn stable_at_maximum_feedback() {
        let mut flanger = Flanger::new();
        flanger.set_param(1, 1.0);
        flanger.set_param(2, 1.0);
        flanger.set_param(3, 1.0);
        flanger.prepare(48_000.0, 256);
        let input: Vec<f32> = (0..48_000)
            .map(|n| 0.5 * libm::sinf(TAU * 220.0 * n as f32 / 48_000.0))
            .collect();
        let out = run(&mut flanger, &input);
        assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 4.0));
    }

    #[test]
    fn comb_response_varies_over_time() {
        // As the notch sweeps across a fixed tone, the short-window level
        // at that tone changes.
        let mut flanger = Flanger::new();
        flanger.set_param(0, 0.8);
        flanger.set_param(1, 1.0);
        flanger.set_param(3, 0.5);
        flanger.prepare(48_000.0, 256);
        let input: Vec<f32> = (0..96_000)
            .map(|n| 0.5 * libm::sinf(TAU * 1_000.0 * n as f32 / 48_000.0))
            .collect();
        let out = run(&mut flanger, &input);
        let window_rms = |sig: &[f32]| {
            (sig.iter().map(|s| s * s).sum::<f32>() / sig.len() as f32).max(1e-12)
        };
        let mut min = f32::MAX;
        let mut max = 0.0f32;
        for chunk in out[8_192..].chunks_exact(2_048) {
            let level = window_rms(chunk);
            min = min.min(level);
            max = max.max(level);
        }
        assert!(max > min * 1.2, "sweep should modulate level: {min} .. {max}");
    }
}
