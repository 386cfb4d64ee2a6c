//! Limiter.
//!
//! Brickwall peak limiter with a short fixed lookahead: the gain
//! computer sees the signal a millisecond early, so attacks are caught
//! before they pass the ceiling instead of clipped after the fact.
//! Stereo-linked, with a hard safety clip at the ceiling for anything
//! the envelope math lets through.
//!
//! # Parameters
//!
//! | Index | Name    | Mapping            |
//! |-------|---------|--------------------|
//! | 0     | Ceiling | -24 dB – 0 dB      |
//! | 1     | Release | 10 ms – 1000 ms    |
//! | 2     | Input   | 0 dB – 24 dB drive |

use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, EnvelopeFollower, FractionalDelay,
    SmoothedParam, StereoBlock, db_to_linear,
};

use crate::ids;

const PARAM_COUNT: usize = 3;
const LOOKAHEAD_MS: f32 = 1.0;

/// Lookahead brickwall limiter (see module docs for the parameter map).
pub struct Limiter {
    sample_rate: f32,
    ceiling: SmoothedParam,
    release: SmoothedParam,
    input: SmoothedParam,
    envelope: EnvelopeFollower,
    look_l: FractionalDelay,
    look_r: FractionalDelay,
    lookahead_samples: f32,
    applied_release: f32,
}

impl Limiter {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        let lookahead = LOOKAHEAD_MS * 1e-3 * sample_rate;
        Self {
            sample_rate,
            ceiling: SmoothedParam::with_config(0.95, sample_rate, 20.0),
            release: SmoothedParam::with_config(0.1, sample_rate, 20.0),
            input: SmoothedParam::with_config(0.0, sample_rate, 20.0),
            envelope: EnvelopeFollower::new(sample_rate, 0.0, 100.0),
            look_l: FractionalDelay::new(lookahead as usize + 2),
            look_r: FractionalDelay::new(lookahead as usize + 2),
            lookahead_samples: lookahead,
            applied_release: -1.0,
        }
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Limiter {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        self.lookahead_samples = LOOKAHEAD_MS * 1e-3 * sr;
        self.look_l = FractionalDelay::new(self.lookahead_samples as usize + 2);
        self.look_r = FractionalDelay::new(self.lookahead_samples as usize + 2);
        for p in [&mut self.ceiling, &mut self.release, &mut self.input] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.envelope.set_sample_rate(sr);
        self.applied_release = -1.0;
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        for (l, r) in block.frames_mut() {
            let ceiling = db_to_linear(-24.0 + self.ceiling.advance() * 24.0);
            let release_norm = self.release.advance();
            let drive = db_to_linear(self.input.advance() * 24.0);

            if (release_norm - self.applied_release).abs() > 1e-3 {
                self.envelope.set_release_ms(10.0 + release_norm * 990.0);
                self.applied_release = release_norm;
            }

            let in_l = *l * drive;
            let in_r = *r * drive;

            // Envelope runs on the un-delayed signal: instant attack plus
            // lookahead means the gain is already down when the peak
            // reaches the output.
            let peak = self.envelope.process(in_l.abs().max(in_r.abs()));
            let gain = if peak > ceiling { ceiling / peak } else { 1.0 };

            let delayed_l = self.look_l.read_write(in_l, self.lookahead_samples);
            let delayed_r = self.look_r.read_write(in_r, self.lookahead_samples);

            *l = (delayed_l * gain).clamp(-ceiling, ceiling);
            *r = (delayed_r * gain).clamp(-ceiling, ceiling);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.envelope.reset();
        self.look_l.clear();
        self.look_r.clear();
        for p in [&mut self.ceiling, &mut self.release, &mut self.input] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.ceiling.set_target(value),
            1 => self.release.set_target(value),
            2 => self.input.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::LIMITER,
            name: "Limiter",
            category: EngineCategory::Dynamics,
            param_count: PARAM_COUNT,
            mix_param: None,
        }
    }

    fn latency_samples(&self) -> usize {
        self.lookahead_samples as usize
    }
}
