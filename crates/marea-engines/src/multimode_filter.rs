//! Multimode filter.
//!
//! A TPT state variable filter per channel with morphing between
//! lowpass, bandpass, highpass, and notch responses. Being a TPT design
//! it stays stable under fast cutoff sweeps, so automation and the
//! resonance control can both be pushed hard.
//!
//! # Parameters
//!
//! | Index | Name      | Mapping                        |
//! |-------|-----------|--------------------------------|
//! | 0     | Cutoff    | 20 Hz – 20 kHz, log            |
//! | 1     | Resonance | Q 0.5 – 20, log                |
//! | 2     | Mode      | LP / BP / HP / notch quartiles |
//! | 3     | Mix       | dry/wet                        |

use libm::powf;
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, SmoothedParam, StateVariableFilter,
    StereoBlock, SvfMode, wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 4;
const MIX_PARAM: usize = 3;

fn mode_from_norm(norm: f32) -> SvfMode {
    match (norm.clamp(0.0, 1.0) * 4.0).min(3.999_9) as u32 {
        0 => SvfMode::Lowpass,
        1 => SvfMode::Bandpass,
        2 => SvfMode::Highpass,
        _ => SvfMode::Notch,
    }
}

/// Multimode SVF (see module docs for the parameter map).
pub struct MultimodeFilter {
    sample_rate: f32,
    cutoff: SmoothedParam,
    resonance: SmoothedParam,
    mode: f32,
    mix: SmoothedParam,
    svf_l: StateVariableFilter,
    svf_r: StateVariableFilter,
    applied_cutoff: f32,
    applied_resonance: f32,
}

impl MultimodeFilter {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            sample_rate,
            cutoff: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            resonance: SmoothedParam::with_config(0.1, sample_rate, 20.0),
            mode: 0.0,
            mix: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            svf_l: StateVariableFilter::new(sample_rate),
            svf_r: StateVariableFilter::new(sample_rate),
            applied_cutoff: -1.0,
            applied_resonance: -1.0,
        }
    }

    fn cutoff_hz(&self, norm: f32) -> f32 {
        (20.0 * powf(1_000.0, norm)).min(self.sample_rate * 0.49)
    }
}

impl Default for MultimodeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MultimodeFilter {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        self.svf_l.set_sample_rate(sr);
        self.svf_r.set_sample_rate(sr);
        for p in [&mut self.cutoff, &mut self.resonance, &mut self.mix] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.applied_cutoff = -1.0;
        self.applied_resonance = -1.0;
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        let mode = mode_from_norm(self.mode);
        self.svf_l.set_mode(mode);
        self.svf_r.set_mode(mode);

        for (l, r) in block.frames_mut() {
            let cutoff_norm = self.cutoff.advance();
            let res_norm = self.resonance.advance();
            let mix = self.mix.advance();

            // tan() per coefficient change, not per sample.
            if (cutoff_norm - self.applied_cutoff).abs() > 1e-4 {
                let hz = self.cutoff_hz(cutoff_norm);
                self.svf_l.set_cutoff(hz);
                self.svf_r.set_cutoff(hz);
                self.applied_cutoff = cutoff_norm;
            }
            if (res_norm - self.applied_resonance).abs() > 1e-4 {
                let q = 0.5 * powf(40.0, res_norm);
                self.svf_l.set_resonance(q);
                self.svf_r.set_resonance(q);
                self.applied_resonance = res_norm;
            }

            *l = wet_dry_mix(*l, self.svf_l.process(*l), mix);
            *r = wet_dry_mix(*r, self.svf_r.process(*r), mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.svf_l.reset();
        self.svf_r.reset();
        for p in [&mut self.cutoff, &mut self.resonance, &mut self.mix] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.cutoff.set_target(value),
            1 => self.resonance.set_target(value),
            2 => self.mode = value,
            3 => self.mix.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::MULTIMODE_FILTER,
            name: "Filter",
            category: EngineCategory::Filter,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    fn gain_at(filter: &mut MultimodeFilter, freq: f32) -> f32 {
        let len = 24_000;
        let mut l: Vec<f32> = (0..len)
            .map(|n| 0.3 * libm::sinf(TAU * freq * n as f32 / 48_000.0))
            .collect();
        let mut r = l.clone();
        let input = l.clone();
        for start in (0..len).step_by(256) {
            let end = (start + 256).min(len);
            let (lh, rh) = (&mut l[start..end], &mut r[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            filter.process(&mut block);
        }
        let out: f64 = l[12_000..].iter().map(|&s| f64::from(s * s)).sum();
        let inp: f64 = input[12_000..].iter().map(|&s| f64::from(s * s)).sum();
        ((out / inp).sqrt()) as f32
    }

    #[test]
    fn lowpass_mode_rolls_off_highs() {
        let mut f = MultimodeFilter::new();
        f.set_param(0, 0.5); // ~632 Hz
        f.set_param(2, 0.0);
        f.prepare(48_000.0, 256);
        assert!(gain_at(&mut f, 100.0) > 0.9);
        let mut f2 = MultimodeFilter::new();
        f2.set_param(0, 0.5);
        f2.set_param(2, 0.0);
        f2.prepare(48_000.0, 256);
        assert!(gain_at(&mut f2, 8_000.0) < 0.05);
    }

    #[test]
    fn highpass_mode_rolls_off_lows() {
        let mut f = MultimodeFilter::new();
        f.set_param(0, 0.5);
        f.set_param(2, 0.6); // highpass quartile
        f.prepare(48_000.0, 256);
        assert!(gain_at(&mut f, 100.0) < 0.1);
    }

    #[test]
    fn dry_mix_is_transparent() {
        let mut f = MultimodeFilter::new();
        f.set_param(3, 0.0);
        f.prepare(48_000.0, 256);
        let gain = gain_at(&mut f, 8_000.0);
        assert!((gain - 1.0).abs() < 0.01);
    }
}
