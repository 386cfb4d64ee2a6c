//! Tremolo.
//!
//! Amplitude modulation from a shared-frequency LFO pair. The spread
//! control slides the right channel's phase from locked to fully
//! inverted, taking the effect from classic amp tremolo to an
//! auto-panner. Gain never modulates below `1 - depth`, so depth under
//! 1.0 always leaves signal through.
//!
//! # Parameters
//!
//! | Index | Name   | Mapping                          |
//! |-------|--------|----------------------------------|
//! | 0     | Rate   | 0.5 Hz – 15 Hz, log              |
//! | 1     | Depth  | modulation amount                |
//! | 2     | Shape  | sine below 0.5, triangle above   |
//! | 3     | Spread | right-channel phase, 0 – half cycle |

use libm::powf;
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, Lfo, LfoWaveform, SmoothedParam, StereoBlock,
};

use crate::ids;

const PARAM_COUNT: usize = 4;

/// LFO amplitude modulator (see module docs for the parameter map).
pub struct Tremolo {
    rate: SmoothedParam,
    depth: SmoothedParam,
    shape: f32,
    spread: SmoothedParam,
    lfo_l: Lfo,
    lfo_r: Lfo,
    applied_rate: f32,
    applied_spread: f32,
}

impl Tremolo {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            rate: SmoothedParam::with_config(0.4, sample_rate, 20.0),
            depth: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            shape: 0.0,
            spread: SmoothedParam::with_config(0.0, sample_rate, 20.0),
            lfo_l: Lfo::new(sample_rate, 4.0),
            lfo_r: Lfo::new(sample_rate, 4.0),
            applied_rate: -1.0,
            applied_spread: -1.0,
        }
    }

    fn rate_hz(norm: f32) -> f32 {
        0.5 * powf(30.0, norm)
    }
}

impl Default for Tremolo {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Tremolo {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.lfo_l.set_sample_rate(sr);
        self.lfo_r.set_sample_rate(sr);
        for p in [&mut self.rate, &mut self.depth, &mut self.spread] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.applied_rate = -1.0;
        self.applied_spread = -1.0;
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        let waveform = if self.shape < 0.5 {
            LfoWaveform::Sine
        } else {
            LfoWaveform::Triangle
        };
        self.lfo_l.set_waveform(waveform);
        self.lfo_r.set_waveform(waveform);

        for (l, r) in block.frames_mut() {
            let rate_norm = self.rate.advance();
            let depth = self.depth.advance();
            let spread = self.spread.advance();

            if (rate_norm - self.applied_rate).abs() > 1e-3 {
                let hz = Self::rate_hz(rate_norm);
                self.lfo_l.set_frequency(hz);
                self.lfo_r.set_frequency(hz);
                self.applied_rate = rate_norm;
            }
            if (spread - self.applied_spread).abs() > 1e-3 {
                self.lfo_r.set_phase_offset(spread * 0.5);
                self.applied_spread = spread;
            }

            let gain_l = 1.0 - depth * self.lfo_l.next_unipolar();
            let gain_r = 1.0 - depth * self.lfo_r.next_unipolar();

            *l *= gain_l;
            *r *= gain_r;
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.lfo_l.reset();
        self.lfo_r.reset();
        for p in [&mut self.rate, &mut self.depth, &mut self.spread] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.rate.set_target(value),
            1 => self.depth.set_target(value),
            2 => self.shape = value,
            3 => self.spread.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::TREMOLO,
            name: "Tremolo",
            category: EngineCategory::Modulation,
            param_count: PARAM_COUNT,
            mix_param: None,
        }
    }
}
