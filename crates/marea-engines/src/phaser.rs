//! Phaser.
//!
//! Four cascaded first-order allpass sections per channel with the
//! shifted signal summed back against the dry path, producing moving
//! notches. The LFO sweeps the sections' break frequency around a
//! center point, a feedback path regenerates through the cascade, and
//! the right channel's LFO runs in quadrature.
//!
//! # Parameters
//!
//! | Index | Name     | Mapping                 |
//! |-------|----------|-------------------------|
//! | 0     | Rate     | 0.05 Hz – 4 Hz, log     |
//! | 1     | Depth    | sweep ±2 octaves        |
//! | 2     | Center   | 100 Hz – 2 kHz, log     |
//! | 3     | Feedback | 0 – 0.85 regeneration   |
//! | 4     | Mix      | dry/wet                 |

use libm::powf;
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, FirstOrderAllpass, Lfo, SmoothedParam,
    StereoBlock, flush_denormal, wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 5;
const MIX_PARAM: usize = 4;

const STAGES: usize = 4;
/// Sweep recompute cadence in samples: 4 tan() calls per channel per
/// update.
const SWEEP_INTERVAL: u32 = 8;

struct PhaserChannel {
    stages: [FirstOrderAllpass; STAGES],
    lfo: Lfo,
    feedback_state: f32,
}

impl PhaserChannel {
    fn new(sample_rate: f32, quadrature: bool) -> Self {
        let mut lfo = Lfo::new(sample_rate, 0.3);
        if quadrature {
            lfo.set_phase_offset(0.25);
        }
        Self {
            stages: core::array::from_fn(|_| FirstOrderAllpass::new(sample_rate, 500.0)),
            lfo,
            feedback_state: 0.0,
        }
    }

    fn set_break_frequency(&mut self, hz: f32) {
        for stage in &mut self.stages {
            stage.set_frequency(hz);
        }
    }

    fn process(&mut self, input: f32, feedback: f32) -> f32 {
        let mut x = input + self.feedback_state * feedback;
        for stage in &mut self.stages {
            x = stage.process(x);
        }
        self.feedback_state = flush_denormal(x);
        x
    }

    fn clear(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        self.lfo.reset();
        self.feedback_state = 0.0;
    }
}

/// Four-stage allpass phaser (see module docs for the parameter map).
pub struct Phaser {
    sample_rate: f32,
    rate: SmoothedParam,
    depth: SmoothedParam,
    center: SmoothedParam,
    feedback: SmoothedParam,
    mix: SmoothedParam,
    left: PhaserChannel,
    right: PhaserChannel,
    applied_rate: f32,
    sweep_counter: u32,
}

impl Phaser {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            sample_rate,
            rate: SmoothedParam::with_config(0.4, sample_rate, 20.0),
            depth: SmoothedParam::with_config(0.6, sample_rate, 20.0),
            center: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            feedback: SmoothedParam::with_config(0.3, sample_rate, 20.0),
            mix: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            left: PhaserChannel::new(sample_rate, false),
            right: PhaserChannel::new(sample_rate, true),
            applied_rate: -1.0,
            sweep_counter: 0,
        }
    }

    fn rate_hz(norm: f32) -> f32 {
        0.05 * powf(80.0, norm)
    }

    fn center_hz(norm: f32) -> f32 {
        100.0 * powf(20.0, norm)
    }
}

impl Default for Phaser {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Phaser {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        self.left = PhaserChannel::new(sr, false);
        self.right = PhaserChannel::new(sr, true);
        for p in [
            &mut self.rate,
            &mut self.depth,
            &mut self.center,
            &mut self.feedback,
            &mut self.mix,
        ] {
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
            let depth = self.depth.advance();
            let center_norm = self.center.advance();
            let feedback = self.feedback.advance() * 0.85;
            let mix = self.mix.advance();

            if (rate_norm - self.applied_rate).abs() > 1e-3 {
                let hz = Self::rate_hz(rate_norm);
                self.left.lfo.set_frequency(hz);
                self.right.lfo.set_frequency(hz);
                self.applied_rate = rate_norm;
            }

            // LFOs tick every sample so the sweep phase stays continuous;
            // the tan() updates land on a coarser grid.
            let sweep_l = self.left.lfo.next();
            let sweep_r = self.right.lfo.next();
            if self.sweep_counter == 0 {
                let center = Self::center_hz(center_norm);
                let max_hz = self.sample_rate * 0.45;
                self.left
                    .set_break_frequency((center * powf(4.0, sweep_l * depth)).min(max_hz));
                self.right
                    .set_break_frequency((center * powf(4.0, sweep_r * depth)).min(max_hz));
            }
            self.sweep_counter = (self.sweep_counter + 1) % SWEEP_INTERVAL;

            let shifted_l = self.left.process(*l, feedback);
            let shifted_r = self.right.process(*r, feedback);

            // Classic phaser sum: dry plus shifted at equal weight.
            *l = wet_dry_mix(*l, (*l + shifted_l) * 0.5, mix);
            *r = wet_dry_mix(*r, (*r + shifted_r) * 0.5, mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        self.sweep_counter = 0;
        for p in [
            &mut self.rate,
            &mut self.depth,
            &mut self.center,
            &mut self.feedback,
            &mut self.mix,
        ] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.rate.set_target(value),
            1 => self.depth.set_target(value),
            2 => self.center.set_target(value),
            3 => self.feedback.set_target(value),
            4 => self.mix.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::PHASER,
            name: "Phaser",
            category: EngineCategory::Modulation,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }
}
