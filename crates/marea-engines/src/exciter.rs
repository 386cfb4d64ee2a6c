//! Harmonic exciter.
//!
//! Aphex-style psychoacoustic brightener: highpass the source, generate
//! harmonics from the isolated top end with a rectifying waveshaper, and
//! blend the result back under the untouched signal. Because only the
//! generated-harmonics path is shaped, the effect adds air without the
//! full-band crunch of a saturator.
//!
//! # Parameters
//!
//! | Index | Name      | Mapping                        |
//! |-------|-----------|--------------------------------|
//! | 0     | Frequency | harmonics source HPF, 1 – 10 kHz |
//! | 1     | Drive     | harmonic generation amount     |
//! | 2     | Blend     | harmonics level under the dry  |

use libm::{powf, tanhf};
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    Biquad, DcBlocker, DenormalGuard, Engine, EngineCategory, EngineInfo, SmoothedParam,
    StereoBlock, highpass,
};

use crate::ids;

const PARAM_COUNT: usize = 3;

/// Psychoacoustic brightener (see module docs for the parameter map).
pub struct Exciter {
    sample_rate: f32,
    frequency: SmoothedParam,
    drive: SmoothedParam,
    blend: SmoothedParam,
    hpf_l: Biquad,
    hpf_r: Biquad,
    dc_l: DcBlocker,
    dc_r: DcBlocker,
    applied_freq: f32,
}

impl Exciter {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            sample_rate,
            frequency: SmoothedParam::with_config(0.4, sample_rate, 20.0),
            drive: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            blend: SmoothedParam::with_config(0.3, sample_rate, 20.0),
            hpf_l: Biquad::new(),
            hpf_r: Biquad::new(),
            dc_l: DcBlocker::new(sample_rate),
            dc_r: DcBlocker::new(sample_rate),
            applied_freq: -1.0,
        }
    }

    fn freq_hz(norm: f32) -> f32 {
        1_000.0 * powf(10.0, norm)
    }

    /// Even-harmonic generator: half-wave rectification blended with tanh.
    fn harmonics(x: f32, drive: f32) -> f32 {
        let boosted = x * (1.0 + drive * 6.0);
        let shaped = tanhf(boosted);
        let rectified = boosted.max(0.0);
        shaped * 0.7 + rectified.min(1.0) * 0.3
    }
}

impl Default for Exciter {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Exciter {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        self.dc_l.set_sample_rate(sr);
        self.dc_r.set_sample_rate(sr);
        for p in [&mut self.frequency, &mut self.drive, &mut self.blend] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.applied_freq = -1.0;
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        for (l, r) in block.frames_mut() {
            let freq_norm = self.frequency.advance();
            let drive = self.drive.advance();
            let blend = self.blend.advance();

            if (freq_norm - self.applied_freq).abs() > 1e-3 {
                let hz = Self::freq_hz(freq_norm).min(self.sample_rate * 0.45);
                let coeffs = highpass(hz, 0.707, self.sample_rate);
                self.hpf_l.set_coefficients(coeffs);
                self.hpf_r.set_coefficients(coeffs);
                self.applied_freq = freq_norm;
            }

            let air_l = self.dc_l.process(Self::harmonics(self.hpf_l.process(*l), drive));
            let air_r = self.dc_r.process(Self::harmonics(self.hpf_r.process(*r), drive));

            // Additive: the dry path is never shaped.
            *l += air_l * blend;
            *r += air_r * blend;
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.hpf_l.clear();
        self.hpf_r.clear();
        self.dc_l.reset();
        self.dc_r.reset();
        for p in [&mut self.frequency, &mut self.drive, &mut self.blend] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.frequency.set_target(value),
            1 => self.drive.set_target(value),
            2 => self.blend.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::EXCITER,
            name: "Exciter",
            category: EngineCategory::Saturation,
            param_count: PARAM_COUNT,
            mix_param: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    #[test]
    fn zero_blend_is_transparent() {
        let mut exciter = Exciter::new();
        exciter.set_param(2, 0.0);
        exciter.prepare(48_000.0, 256);
        let mut l: Vec<f32> = (0..1_024)
            .map(|n| 0.5 * libm::sinf(TAU * 440.0 * n as f32 / 48_000.0))
            .collect();
        let mut r = l.clone();
        let input = l.clone();
        let mut block = StereoBlock::new(&mut l, &mut r);
        exciter.process(&mut block);
        for (out, inp) in l.iter().zip(&input) {
            assert!((out - inp).abs() < 1e-5);
        }
    }

    #[test]
    fn blend_adds_high_frequency_energy() {
        let run = |blend: f32| {
            let mut exciter = Exciter::new();
            exciter.set_param(1, 0.8);
            exciter.set_param(2, blend);
            exciter.prepare(48_000.0, 256);
            let len = 16_384;
            // 6 kHz tone sits above the default HPF, feeding the generator.
            let mut l: Vec<f32> = (0..len)
                .map(|n| 0.4 * libm::sinf(TAU * 6_000.0 * n as f32 / 48_000.0))
                .collect();
            let mut r = l.clone();
            for start in (0..len).step_by(256) {
                let end = (start + 256).min(len);
                let (lh, rh) = (&mut l[start..end], &mut r[start..end]);
                let mut block = StereoBlock::new(lh, rh);
                exciter.process(&mut block);
            }
            l[8_192..].iter().map(|s| s * s).sum::<f32>()
        };
        assert!(run(0.8) > run(0.0) * 1.05, "blend should add energy");
    }
}
