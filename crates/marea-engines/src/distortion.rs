//! Distortion.
//!
//! Oversampled waveshaper with four transfer curves. The nonlinearity
//! runs inside a 2× oversampling wrapper so the harmonics it generates
//! land above the audible band instead of folding back as aliases; the
//! dry path is delayed by the wrapper's group delay so the mix control
//! stays comb-free.
//!
//! # Parameters
//!
//! | Index | Name   | Mapping                             |
//! |-------|--------|-------------------------------------|
//! | 0     | Drive  | 0 dB – 36 dB pre-gain               |
//! | 1     | Shape  | soft / hard / fuzz / fold quartiles |
//! | 2     | Output | ±12 dB trim                         |
//! | 3     | Mix    | dry/wet                             |

use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DcBlocker, DenormalGuard, Engine, EngineCategory, EngineInfo, Oversampler2x, SmoothedParam,
    StereoBlock, db_to_linear, foldback, hard_clip, soft_clip, wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 4;
const MIX_PARAM: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Soft,
    Hard,
    Fuzz,
    Fold,
}

impl Shape {
    fn from_norm(norm: f32) -> Self {
        match (norm.clamp(0.0, 1.0) * 4.0).min(3.999_9) as u32 {
            0 => Self::Soft,
            1 => Self::Hard,
            2 => Self::Fuzz,
            _ => Self::Fold,
        }
    }

    #[inline]
    fn apply(self, x: f32) -> f32 {
        match self {
            Self::Soft => soft_clip(x),
            Self::Hard => hard_clip(x, 0.7),
            // Heavy tanh stage approaching a square; the 0.8 keeps its
            // ceiling under the hard clip's.
            Self::Fuzz => soft_clip(x * 4.0) * 0.8,
            Self::Fold => foldback(x, 0.6),
        }
    }
}

/// Oversampled waveshaper (see module docs for the parameter map).
pub struct Distortion {
    drive: SmoothedParam,
    shape: f32,
    output: SmoothedParam,
    mix: SmoothedParam,
    os_l: Oversampler2x,
    os_r: Oversampler2x,
    dc_l: DcBlocker,
    dc_r: DcBlocker,
    // Dry path delayed to match the oversampler's group delay.
    dry_ring_l: [f32; 15],
    dry_ring_r: [f32; 15],
    dry_pos: usize,
    dry_l: Vec<f32>,
    dry_r: Vec<f32>,
}

impl Distortion {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        let max_block = 512;
        Self {
            drive: SmoothedParam::with_config(0.4, sample_rate, 20.0),
            shape: 0.0,
            output: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            mix: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            os_l: Oversampler2x::new(max_block),
            os_r: Oversampler2x::new(max_block),
            dc_l: DcBlocker::new(sample_rate),
            dc_r: DcBlocker::new(sample_rate),
            dry_ring_l: [0.0; 15],
            dry_ring_r: [0.0; 15],
            dry_pos: 0,
            dry_l: vec![0.0; max_block],
            dry_r: vec![0.0; max_block],
        }
    }
}

impl Default for Distortion {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Distortion {
    fn prepare(&mut self, sample_rate: f32, max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        let max_block = max_block.max(1);
        self.os_l = Oversampler2x::new(max_block);
        self.os_r = Oversampler2x::new(max_block);
        self.dry_l = vec![0.0; max_block];
        self.dry_r = vec![0.0; max_block];
        self.dc_l.set_sample_rate(sr);
        self.dc_r.set_sample_rate(sr);
        for p in [&mut self.drive, &mut self.output, &mut self.mix] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        let len = block.len();
        if len == 0 {
            return;
        }
        debug_assert!(len <= self.dry_l.len());

        // Pre-gain in place, capture the latency-matched dry path.
        for n in 0..len {
            let gain = db_to_linear(self.drive.advance() * 36.0);
            self.dry_l[n] = self.dry_ring_l[self.dry_pos];
            self.dry_r[n] = self.dry_ring_r[self.dry_pos];
            self.dry_ring_l[self.dry_pos] = block.left[n];
            self.dry_ring_r[self.dry_pos] = block.right[n];
            self.dry_pos = (self.dry_pos + 1) % 15;
            block.left[n] *= gain;
            block.right[n] *= gain;
        }

        // Shape latches at block boundaries; mid-block edits land next call.
        let shape = Shape::from_norm(self.shape);
        self.os_l.process_block(&mut block.left[..len], |x| shape.apply(x));
        self.os_r.process_block(&mut block.right[..len], |x| shape.apply(x));

        for n in 0..len {
            let trim = db_to_linear((self.output.advance() - 0.5) * 24.0);
            let mix = self.mix.advance();
            let wet_l = self.dc_l.process(block.left[n]) * trim;
            let wet_r = self.dc_r.process(block.right[n]) * trim;
            block.left[n] = wet_dry_mix(self.dry_l[n], wet_l, mix);
            block.right[n] = wet_dry_mix(self.dry_r[n], wet_r, mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.os_l.reset();
        self.os_r.reset();
        self.dc_l.reset();
        self.dc_r.reset();
        self.dry_ring_l = [0.0; 15];
        self.dry_ring_r = [0.0; 15];
        self.dry_pos = 0;
        for p in [&mut self.drive, &mut self.output, &mut self.mix] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.drive.set_target(value),
            1 => self.shape = value,
            2 => self.output.set_target(value),
            3 => self.mix.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::DISTORTION,
            name: "Distortion",
            category: EngineCategory::Distortion,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }

    fn latency_samples(&self) -> usize {
        self.os_l.latency_samples()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    fn run(engine: &mut Distortion, input: &[f32]) -> Vec<f32> {
        let mut l = input.to_vec();
        let mut r = input.to_vec();
        for start in (0..input.len()).step_by(256) {
            let end = (start + 256).min(input.len());
            let (lh, rh) = (&mut l[start..end], &mut r[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            engine.process(&mut block);
        }
        l
    }

    fn sine(len: usize, freq: f32, amp: f32) -> Vec<f32> {
        (0..len)
            .map(|n| amp * libm::sinf(TAU * freq * n as f32 / 48_000.0))
            .collect()
    }

    #[test]
    fn drive_limits_peaks() {
        let mut dist = Distortion::new();
        dist.set_param(0, 1.0);
        dist.prepare(48_000.0, 256);
        let out = run(&mut dist, &sine(8_192, 220.0, 1.0));
        let peak = out[4_096..].iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak < 1.3, "shaped peak should be bounded, got {peak}");
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn dry_mix_passes_with_latency() {
        let mut dist = Distortion::new();
        dist.set_param(3, 0.0);
        dist.prepare(48_000.0, 256);
        let input = sine(2_048, 440.0, 0.5);
        let out = run(&mut dist, &input);
        let lat = dist.latency_samples();
        for n in lat + 64..2_048 {
            assert!(
                (out[n] - input[n - lat]).abs() < 1e-4,
                "dry path should be a pure delay at sample {n}"
            );
        }
    }

    #[test]
    fn shapes_differ() {
        let measure = |shape_norm: f32| {
            let mut dist = Distortion::new();
            dist.set_param(0, 0.9);
            dist.set_param(1, shape_norm);
            dist.prepare(48_000.0, 256);
            let out = run(&mut dist, &sine(8_192, 330.0, 0.8));
            out[4_096..].iter().map(|s| s * s).sum::<f32>()
        };
        let soft = measure(0.1);
        let fold = measure(0.9);
        assert!(
            (soft - fold).abs() > soft * 0.02,
            "transfer curves should be distinguishable: {soft} vs {fold}"
        );
    }

    #[test]
    fn reports_oversampler_latency() {
        let dist = Distortion::new();
        assert_eq!(dist.latency_samples(), 15);
    }
}
