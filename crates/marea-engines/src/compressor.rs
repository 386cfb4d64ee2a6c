//! Compressor.
//!
//! Feed-forward peak compressor with a soft knee and stereo-linked
//! detection (the louder channel drives gain reduction for both, keeping
//! the image stable).
//!
//! # Parameters
//!
//! | Index | Name      | Mapping                  |
//! |-------|-----------|--------------------------|
//! | 0     | Threshold | -60 dB – 0 dB            |
//! | 1     | Ratio     | 1:1 – 20:1               |
//! | 2     | Attack    | 0.1 ms – 100 ms          |
//! | 3     | Release   | 10 ms – 1000 ms          |
//! | 4     | Makeup    | 0 dB – 24 dB             |
//! | 5     | Mix       | dry/wet (parallel comp)  |

use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, EnvelopeFollower, SmoothedParam, StereoBlock,
    db_to_linear, linear_to_db, wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 6;
const MIX_PARAM: usize = 5;
const KNEE_DB: f32 = 6.0;

/// Soft-knee stereo compressor (see module docs for the parameter map).
pub struct Compressor {
    threshold: SmoothedParam,
    ratio: SmoothedParam,
    attack: SmoothedParam,
    release: SmoothedParam,
    makeup: SmoothedParam,
    mix: SmoothedParam,
    envelope: EnvelopeFollower,
    applied_attack: f32,
    applied_release: f32,
}

impl Compressor {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            threshold: SmoothedParam::with_config(0.7, sample_rate, 20.0),
            ratio: SmoothedParam::with_config(0.15, sample_rate, 20.0),
            attack: SmoothedParam::with_config(0.3, sample_rate, 20.0),
            release: SmoothedParam::with_config(0.2, sample_rate, 20.0),
            makeup: SmoothedParam::with_config(0.0, sample_rate, 20.0),
            mix: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            envelope: EnvelopeFollower::new(sample_rate, 5.0, 100.0),
            applied_attack: -1.0,
            applied_release: -1.0,
        }
    }

    /// Soft-knee gain computer: input level in, target gain in dB out.
    fn gain_db(level_db: f32, threshold_db: f32, ratio: f32) -> f32 {
        let over = level_db - threshold_db;
        if over <= -KNEE_DB / 2.0 {
            0.0
        } else if over < KNEE_DB / 2.0 {
            // Quadratic interpolation through the knee.
            let x = over + KNEE_DB / 2.0;
            (1.0 / ratio - 1.0) * x * x / (2.0 * KNEE_DB)
        } else {
            (1.0 / ratio - 1.0) * over
        }
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Compressor {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        for p in [
            &mut self.threshold,
            &mut self.ratio,
            &mut self.attack,
            &mut self.release,
            &mut self.makeup,
            &mut self.mix,
        ] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.envelope.set_sample_rate(sr);
        self.applied_attack = -1.0;
        self.applied_release = -1.0;
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        for (l, r) in block.frames_mut() {
            let threshold_db = -60.0 + self.threshold.advance() * 60.0;
            let ratio = 1.0 + self.ratio.advance() * 19.0;
            let attack_norm = self.attack.advance();
            let release_norm = self.release.advance();
            let makeup = db_to_linear(self.makeup.advance() * 24.0);
            let mix = self.mix.advance();

            if (attack_norm - self.applied_attack).abs() > 1e-3 {
                self.envelope.set_attack_ms(0.1 + attack_norm * 99.9);
                self.applied_attack = attack_norm;
            }
            if (release_norm - self.applied_release).abs() > 1e-3 {
                self.envelope.set_release_ms(10.0 + release_norm * 990.0);
                self.applied_release = release_norm;
            }

            // Stereo-linked detection on the louder channel.
            let level = self.envelope.process(l.abs().max(r.abs()));
            let level_db = linear_to_db(level.max(1e-6));
            let gain = db_to_linear(Self::gain_db(level_db, threshold_db, ratio)) * makeup;

            *l = wet_dry_mix(*l, *l * gain, mix);
            *r = wet_dry_mix(*r, *r * gain, mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.envelope.reset();
        for p in [
            &mut self.threshold,
            &mut self.ratio,
            &mut self.attack,
            &mut self.release,
            &mut self.makeup,
            &mut self.mix,
        ] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.threshold.set_target(value),
            1 => self.ratio.set_target(value),
            2 => self.attack.set_target(value),
            3 => self.release.set_target(value),
            4 => self.makeup.set_target(value),
            5 => self.mix.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::COMPRESSOR,
            name: "Compressor",
            category: EngineCategory::Dynamics,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }
}
