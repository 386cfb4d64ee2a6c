//! Tape saturation.
//!
//! The tape echo's loop saturator promoted to a standalone color box:
//! asymmetric tanh transfer with a second-harmonic term, a gentle
//! high-frequency rolloff standing in for head-gap loss, and a DC
//! blocker because asymmetric shaping rectifies.
//!
//! # Parameters
//!
//! | Index | Name   | Mapping                          |
//! |-------|--------|----------------------------------|
//! | 0     | Drive  | saturation amount                |
//! | 1     | Tone   | HF rolloff 2 kHz – 20 kHz        |
//! | 2     | Output | ±12 dB trim                      |
//! | 3     | Mix    | dry/wet                          |

use libm::powf;
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DcBlocker, DenormalGuard, Engine, EngineCategory, EngineInfo, OnePole, SmoothedParam,
    StereoBlock, db_to_linear, tape_saturate, wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 4;
const MIX_PARAM: usize = 3;

/// Asymmetric tape color (see module docs for the parameter map).
pub struct TapeSaturation {
    drive: SmoothedParam,
    tone: SmoothedParam,
    output: SmoothedParam,
    mix: SmoothedParam,
    rolloff_l: OnePole,
    rolloff_r: OnePole,
    dc_l: DcBlocker,
    dc_r: DcBlocker,
    applied_tone: f32,
}

impl TapeSaturation {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            drive: SmoothedParam::with_config(0.4, sample_rate, 20.0),
            tone: SmoothedParam::with_config(0.7, sample_rate, 20.0),
            output: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            mix: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            rolloff_l: OnePole::new(sample_rate, 12_000.0),
            rolloff_r: OnePole::new(sample_rate, 12_000.0),
            dc_l: DcBlocker::new(sample_rate),
            dc_r: DcBlocker::new(sample_rate),
            applied_tone: -1.0,
        }
    }

    fn tone_hz(norm: f32) -> f32 {
        2_000.0 * powf(10.0, norm)
    }
}

impl Default for TapeSaturation {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for TapeSaturation {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.rolloff_l.set_sample_rate(sr);
        self.rolloff_r.set_sample_rate(sr);
        self.dc_l.set_sample_rate(sr);
        self.dc_r.set_sample_rate(sr);
        for p in [&mut self.drive, &mut self.tone, &mut self.output, &mut self.mix] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.applied_tone = -1.0;
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        for (l, r) in block.frames_mut() {
            let drive = self.drive.advance();
            let tone = self.tone.advance();
            let trim = db_to_linear((self.output.advance() - 0.5) * 24.0);
            let mix = self.mix.advance();

            if (tone - self.applied_tone).abs() > 1e-3 {
                let hz = Self::tone_hz(tone);
                self.rolloff_l.set_frequency(hz);
                self.rolloff_r.set_frequency(hz);
                self.applied_tone = tone;
            }

            let wet_l =
                self.dc_l.process(self.rolloff_l.process(tape_saturate(*l, drive))) * trim;
            let wet_r =
                self.dc_r.process(self.rolloff_r.process(tape_saturate(*r, drive))) * trim;

            *l = wet_dry_mix(*l, wet_l, mix);
            *r = wet_dry_mix(*r, wet_r, mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.rolloff_l.reset();
        self.rolloff_r.reset();
        self.dc_l.reset();
        self.dc_r.reset();
        for p in [&mut self.drive, &mut self.tone, &mut self.output, &mut self.mix] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.drive.set_target(value),
            1 => self.tone.set_target(value),
            2 => self.output.set_target(value),
            3 => self.mix.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::TAPE_SATURATION,
            name: "Tape Saturation",
            category: EngineCategory::Saturation,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    #[test]
    fn drive_compresses_peaks() {
        let mut sat = TapeSaturation::new();
        sat.set_param(0, 1.0);
        sat.prepare(48_000.0, 256);
        let len = 8_192;
        let mut l: Vec<f32> = (0..len)
            .map(|n| 2.0 * libm::sinf(TAU * 440.0 * n as f32 / 48_000.0))
            .collect();
        let mut r = l.clone();
        for start in (0..len).step_by(256) {
            let end = (start + 256).min(len);
            let (lh, rh) = (&mut l[start..end], &mut r[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            sat.process(&mut block);
        }
        let peak = l[4_096..].iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak < 1.5, "saturation should tame a 2.0 peak, got {peak}");
        assert!(l.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn no_dc_accumulates() {
        let mut sat = TapeSaturation::new();
        sat.set_param(0, 0.9);
        sat.prepare(48_000.0, 256);
        let len = 48_000;
        let mut l: Vec<f32> = (0..len)
            .map(|n| 0.8 * libm::sinf(TAU * 100.0 * n as f32 / 48_000.0))
            .collect();
        let mut r = l.clone();
        for start in (0..len).step_by(256) {
            let end = (start + 256).min(len);
            let (lh, rh) = (&mut l[start..end], &mut r[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            sat.process(&mut block);
        }
        let mean: f32 = l[24_000..].iter().sum::<f32>() / 24_000.0;
        assert!(mean.abs() < 0.01, "asymmetric shaping must not leave DC, mean {mean}");
    }
}
