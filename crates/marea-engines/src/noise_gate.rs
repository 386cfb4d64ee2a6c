//! Noise gate.
//!
//! Downward expander with hysteresis: the gate opens at the threshold but
//! closes a few dB lower, so material hovering around the threshold does
//! not chatter. Detection is stereo-linked.
//!
//! # Parameters
//!
//! | Index | Name      | Mapping              |
//! |-------|-----------|----------------------|
//! | 0     | Threshold | -80 dB – 0 dB        |
//! | 1     | Range     | max attenuation, 0 – 80 dB |
//! | 2     | Attack    | 0.1 ms – 50 ms       |
//! | 3     | Release   | 10 ms – 2000 ms      |

use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, EnvelopeFollower, SmoothedParam, StereoBlock,
    db_to_linear, linear_to_db,
};

use crate::ids;

const PARAM_COUNT: usize = 4;
const HYSTERESIS_DB: f32 = 4.0;

/// Stereo-linked downward gate (see module docs for the parameter map).
pub struct NoiseGate {
    threshold: SmoothedParam,
    range: SmoothedParam,
    attack: SmoothedParam,
    release: SmoothedParam,
    detector: EnvelopeFollower,
    gain: EnvelopeFollower,
    open: bool,
    applied_attack: f32,
    applied_release: f32,
}

impl NoiseGate {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            threshold: SmoothedParam::with_config(0.4, sample_rate, 20.0),
            range: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            attack: SmoothedParam::with_config(0.1, sample_rate, 20.0),
            release: SmoothedParam::with_config(0.2, sample_rate, 20.0),
            detector: EnvelopeFollower::new(sample_rate, 0.5, 30.0),
            gain: EnvelopeFollower::new(sample_rate, 1.0, 100.0),
            open: false,
            applied_attack: -1.0,
            applied_release: -1.0,
        }
    }
}

impl Default for NoiseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for NoiseGate {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        for p in [
            &mut self.threshold,
            &mut self.range,
            &mut self.attack,
            &mut self.release,
        ] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.detector.set_sample_rate(sr);
        self.gain.set_sample_rate(sr);
        self.applied_attack = -1.0;
        self.applied_release = -1.0;
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        for (l, r) in block.frames_mut() {
            let threshold_db = -80.0 + self.threshold.advance() * 80.0;
            let range_db = self.range.advance() * 80.0;
            let attack_norm = self.attack.advance();
            let release_norm = self.release.advance();

            if (attack_norm - self.applied_attack).abs() > 1e-3 {
                self.gain.set_attack_ms(0.1 + attack_norm * 49.9);
                self.applied_attack = attack_norm;
            }
            if (release_norm - self.applied_release).abs() > 1e-3 {
                self.gain.set_release_ms(10.0 + release_norm * 1_990.0);
                self.applied_release = release_norm;
            }

            let level_db = linear_to_db(self.detector.process(l.abs().max(r.abs())).max(1e-6));
            // Hysteresis: open at threshold, close HYSTERESIS_DB below it.
            if self.open {
                if level_db < threshold_db - HYSTERESIS_DB {
                    self.open = false;
                }
            } else if level_db > threshold_db {
                self.open = true;
            }

            let target = if self.open { 1.0 } else { db_to_linear(-range_db) };
            // The gain follower's ballistics become attack/release of the
            // gate itself.
            let gain = self.gain.process(target);

            *l *= gain;
            *r *= gain;
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.detector.reset();
        self.gain.reset();
        self.open = false;
        for p in [
            &mut self.threshold,
            &mut self.range,
            &mut self.attack,
            &mut self.release,
        ] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.threshold.set_target(value),
            1 => self.range.set_target(value),
            2 => self.attack.set_target(value),
            3 => self.release.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::NOISE_GATE,
            name: "Noise Gate",
            category: EngineCategory::Dynamics,
            param_count: PARAM_COUNT,
            mix_param: None,
        }
    }
}
