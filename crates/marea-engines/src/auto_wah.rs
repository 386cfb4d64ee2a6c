//! Auto-wah.
//!
//! Envelope-driven bandpass sweep: the input's own dynamics push the
//! filter up the frequency axis, the classic funk-box behavior. The
//! sweep range and sensitivity are both normalized so the effect tracks
//! at any input level within reason.
//!
//! # Parameters
//!
//! | Index | Name        | Mapping                         |
//! |-------|-------------|---------------------------------|
//! | 0     | Sensitivity | envelope drive into the sweep   |
//! | 1     | Range       | base 200 Hz, sweep up to 4 kHz  |
//! | 2     | Resonance   | Q 2 – 15                        |
//! | 3     | Speed       | envelope release 20 ms – 400 ms |
//! | 4     | Mix         | dry/wet                         |

use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, EnvelopeFollower, SmoothedParam,
    StateVariableFilter, StereoBlock, SvfMode, wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 5;
const MIX_PARAM: usize = 4;

const BASE_HZ: f32 = 200.0;
const SWEEP_HZ: f32 = 3_800.0;
/// Cutoff recompute threshold in Hz; the sweep moves constantly, so the
/// gate is coarse.
const CUTOFF_EPSILON: f32 = 10.0;

/// Envelope-following wah (see module docs for the parameter map).
pub struct AutoWah {
    sensitivity: SmoothedParam,
    range: SmoothedParam,
    resonance: SmoothedParam,
    speed: SmoothedParam,
    mix: SmoothedParam,
    envelope: EnvelopeFollower,
    svf_l: StateVariableFilter,
    svf_r: StateVariableFilter,
    applied_hz: f32,
    applied_q: f32,
    applied_speed: f32,
}

impl AutoWah {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        let mut svf_l = StateVariableFilter::new(sample_rate);
        let mut svf_r = StateVariableFilter::new(sample_rate);
        svf_l.set_mode(SvfMode::Bandpass);
        svf_r.set_mode(SvfMode::Bandpass);
        Self {
            sensitivity: SmoothedParam::with_config(0.6, sample_rate, 20.0),
            range: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            resonance: SmoothedParam::with_config(0.4, sample_rate, 20.0),
            speed: SmoothedParam::with_config(0.3, sample_rate, 20.0),
            mix: SmoothedParam::with_config(0.7, sample_rate, 20.0),
            envelope: EnvelopeFollower::new(sample_rate, 2.0, 100.0),
            svf_l,
            svf_r,
            applied_hz: -1.0,
            applied_q: -1.0,
            applied_speed: -1.0,
        }
    }
}

impl Default for AutoWah {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for AutoWah {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.svf_l.set_sample_rate(sr);
        self.svf_r.set_sample_rate(sr);
        self.envelope.set_sample_rate(sr);
        for p in [
            &mut self.sensitivity,
            &mut self.range,
            &mut self.resonance,
            &mut self.speed,
            &mut self.mix,
        ] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.applied_hz = -1.0;
        self.applied_q = -1.0;
        self.applied_speed = -1.0;
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        for (l, r) in block.frames_mut() {
            let sensitivity = self.sensitivity.advance() * 4.0;
            let range = self.range.advance();
            let res_norm = self.resonance.advance();
            let speed_norm = self.speed.advance();
            let mix = self.mix.advance();

            if (speed_norm - self.applied_speed).abs() > 1e-3 {
                self.envelope.set_release_ms(20.0 + speed_norm * 380.0);
                self.applied_speed = speed_norm;
            }

            let env = self.envelope.process(l.abs().max(r.abs()));
            let sweep = (env * sensitivity).min(1.0);
            let hz = BASE_HZ + sweep * SWEEP_HZ * range;
            if (hz - self.applied_hz).abs() > CUTOFF_EPSILON {
                self.svf_l.set_cutoff(hz);
                self.svf_r.set_cutoff(hz);
                self.applied_hz = hz;
            }
            let q = 2.0 + res_norm * 13.0;
            if (q - self.applied_q).abs() > 0.05 {
                self.svf_l.set_resonance(q);
                self.svf_r.set_resonance(q);
                self.applied_q = q;
            }

            *l = wet_dry_mix(*l, self.svf_l.process(*l), mix);
            *r = wet_dry_mix(*r, self.svf_r.process(*r), mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.envelope.reset();
        self.svf_l.reset();
        self.svf_r.reset();
        for p in [
            &mut self.sensitivity,
            &mut self.range,
            &mut self.resonance,
            &mut self.speed,
            &mut self.mix,
        ] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.sensitivity.set_target(value),
            1 => self.range.set_target(value),
            2 => self.resonance.set_target(value),
            3 => self.speed.set_target(value),
            4 => self.mix.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::AUTO_WAH,
            name: "Auto Wah",
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

    #[test]
    fn output_is_finite_under_hot_input() {
        let mut wah = AutoWah::new();
        wah.set_param(0, 1.0);
        wah.set_param(2, 1.0);
        wah.prepare(48_000.0, 256);
        let len = 8_192;
        let mut l: Vec<f32> = (0..len)
            .map(|n| libm::sinf(TAU * 110.0 * n as f32 / 48_000.0))
            .collect();
        let mut r = l.clone();
        for start in (0..len).step_by(256) {
            let end = (start + 256).min(len);
            let (lh, rh) = (&mut l[start..end], &mut r[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            wah.process(&mut block);
        }
        assert!(l.iter().all(|s| s.is_finite() && s.abs() <= 4.0));
    }

    #[test]
    fn louder_input_sweeps_higher() {
        // Measure the filter's resting frequency after a quiet passage vs
        // after a loud one, via the applied cutoff.
        let mut wah = AutoWah::new();
        wah.set_param(4, 1.0);
        wah.prepare(48_000.0, 256);

        let mut feed = |wah: &mut AutoWah, amp: f32| {
            let mut l: Vec<f32> = (0..4_096)
                .map(|n| amp * libm::sinf(TAU * 220.0 * n as f32 / 48_000.0))
                .collect();
            let mut r = l.clone();
            let mut block = StereoBlock::new(&mut l, &mut r);
            wah.process(&mut block);
            wah.applied_hz
        };
        let quiet_hz = feed(&mut wah, 0.05);
        wah.reset();
        let loud_hz = feed(&mut wah, 0.8);
        assert!(loud_hz > quiet_hz + 100.0, "sweep should track level: {quiet_hz} -> {loud_hz}");
    }

    #[test]
    fn dry_mix_is_transparent() {
        let mut wah = AutoWah::new();
        wah.set_param(4, 0.0);
        wah.prepare(48_000.0, 256);
        let mut l = vec![0.5f32; 512];
        let mut r = vec![0.5f32; 512];
        let mut block = StereoBlock::new(&mut l, &mut r);
        wah.process(&mut block);
        assert!((l[500] - 0.5).abs() < 1e-4);
    }
}
