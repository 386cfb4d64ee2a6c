//! Wavefolder.
//!
//! West-coast style folding: the signal is driven into a reflecting
//! threshold so peaks fold back on themselves instead of flattening.
//! A symmetry control biases the signal before the fold, turning the
//! odd-harmonic series into an odd-plus-even blend; the resulting DC is
//! blocked on the way out.
//!
//! # Parameters
//!
//! | Index | Name     | Mapping                      |
//! |-------|----------|------------------------------|
//! | 0     | Fold     | drive into the fold, 1× – 9× |
//! | 1     | Symmetry | pre-fold bias, ±0.4          |
//! | 2     | Output   | ±12 dB trim                  |
//! | 3     | Mix      | dry/wet                      |

use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DcBlocker, DenormalGuard, Engine, EngineCategory, EngineInfo, SmoothedParam, StereoBlock,
    db_to_linear, foldback, wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 4;
const MIX_PARAM: usize = 3;

const FOLD_THRESHOLD: f32 = 0.7;

/// Reflecting folder (see module docs for the parameter map).
pub struct Wavefolder {
    fold: SmoothedParam,
    symmetry: SmoothedParam,
    output: SmoothedParam,
    mix: SmoothedParam,
    dc_l: DcBlocker,
    dc_r: DcBlocker,
}

impl Wavefolder {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            fold: SmoothedParam::with_config(0.3, sample_rate, 20.0),
            symmetry: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            output: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            mix: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            dc_l: DcBlocker::new(sample_rate),
            dc_r: DcBlocker::new(sample_rate),
        }
    }
}

impl Default for Wavefolder {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Wavefolder {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.dc_l.set_sample_rate(sr);
        self.dc_r.set_sample_rate(sr);
        for p in [&mut self.fold, &mut self.symmetry, &mut self.output, &mut self.mix] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        for (l, r) in block.frames_mut() {
            let gain = 1.0 + self.fold.advance() * 8.0;
            let bias = (self.symmetry.advance() - 0.5) * 0.8;
            let trim = db_to_linear((self.output.advance() - 0.5) * 24.0);
            let mix = self.mix.advance();

            let wet_l =
                self.dc_l.process(foldback(*l * gain + bias, FOLD_THRESHOLD)) * trim;
            let wet_r =
                self.dc_r.process(foldback(*r * gain + bias, FOLD_THRESHOLD)) * trim;

            *l = wet_dry_mix(*l, wet_l, mix);
            *r = wet_dry_mix(*r, wet_r, mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.dc_l.reset();
        self.dc_r.reset();
        for p in [&mut self.fold, &mut self.symmetry, &mut self.output, &mut self.mix] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.fold.set_target(value),
            1 => self.symmetry.set_target(value),
            2 => self.output.set_target(value),
            3 => self.mix.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::WAVEFOLDER,
            name: "Wavefolder",
            category: EngineCategory::Distortion,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    fn run(folder: &mut Wavefolder, input: &[f32]) -> Vec<f32> {
        let mut l = input.to_vec();
        let mut r = input.to_vec();
        for start in (0..input.len()).step_by(256) {
            let end = (start + 256).min(input.len());
            let (lh, rh) = (&mut l[start..end], &mut r[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            folder.process(&mut block);
        }
        l
    }

    #[test]
    fn output_stays_within_threshold() {
        let mut folder = Wavefolder::new();
        folder.set_param(0, 1.0);
        folder.set_param(2, 0.5);
        folder.prepare(48_000.0, 256);
        let input: Vec<f32> = (0..8_192)
            .map(|n| libm::sinf(TAU * 220.0 * n as f32 / 48_000.0))
            .collect();
        let out = run(&mut folder, &input);
        // Folding reflects at the threshold; DC blocker adds a little sway.
        assert!(out.iter().all(|s| s.abs() < FOLD_THRESHOLD * 1.5));
    }

    #[test]
    fn folding_adds_harmonics() {
        // A heavily folded sine has far more zero crossings than the input.
        let mut folder = Wavefolder::new();
        folder.set_param(0, 1.0);
        folder.prepare(48_000.0, 256);
        let input: Vec<f32> = (0..8_192)
            .map(|n| 0.9 * libm::sinf(TAU * 110.0 * n as f32 / 48_000.0))
            .collect();
        let out = run(&mut folder, &input);
        let crossings = |sig: &[f32]| sig.windows(2).filter(|w| w[0] * w[1] < 0.0).count();
        assert!(crossings(&out[1_024..]) > crossings(&input[1_024..]) * 2);
    }

    #[test]
    fn dry_mix_is_transparent() {
        let mut folder = Wavefolder::new();
        folder.set_param(3, 0.0);
        folder.prepare(48_000.0, 256);
        let input = vec![0.3f32; 512];
        let out = run(&mut folder, &input);
        assert!((out[500] - 0.3).abs() < 1e-5);
    }
}
