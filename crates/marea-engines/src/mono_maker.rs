//! Mono-maker.
//!
//! Folds everything below a crossover frequency to mono, the mastering
//! move that keeps bass centered for vinyl and club systems. The split is
//! a Linkwitz-Riley 4th-order crossover (two cascaded Butterworth
//! biquads per band), which sums flat, so the only audible change is the
//! collapsed low-band image. Minimum phase, zero latency.
//!
//! # Parameters
//!
//! | Index | Name      | Mapping                                   |
//! |-------|-----------|-------------------------------------------|
//! | 0     | Crossover | 20 Hz – 1 kHz, log                        |
//! | 1     | Amount    | low-band side reduction, 1 = fully mono   |

use libm::powf;
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    Biquad, DcBlocker, DenormalGuard, Engine, EngineCategory, EngineInfo, SmoothedParam,
    StereoBlock, highpass, lowpass, ms_decode, ms_encode,
};

use crate::ids;

const PARAM_COUNT: usize = 2;
const BUTTERWORTH_Q: f32 = core::f32::consts::FRAC_1_SQRT_2;

struct CrossoverChannel {
    lp: [Biquad; 2],
    hp: [Biquad; 2],
}

impl CrossoverChannel {
    fn new() -> Self {
        Self {
            lp: [Biquad::new(), Biquad::new()],
            hp: [Biquad::new(), Biquad::new()],
        }
    }

    fn split(&mut self, x: f32) -> (f32, f32) {
        let low_stage = self.lp[0].process(x);
        let low = self.lp[1].process(low_stage);
        let high_stage = self.hp[0].process(x);
        let high = self.hp[1].process(high_stage);
        (low, high)
    }

    fn clear(&mut self) {
        for f in self.lp.iter_mut().chain(self.hp.iter_mut()) {
            f.clear();
        }
    }
}

/// Low-band mono fold-down (see module docs for the parameter map).
pub struct MonoMaker {
    sample_rate: f32,
    crossover: SmoothedParam,
    amount: SmoothedParam,
    applied_crossover: f32,
    left: CrossoverChannel,
    right: CrossoverChannel,
    dc_l: DcBlocker,
    dc_r: DcBlocker,
}

impl MonoMaker {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            sample_rate,
            crossover: SmoothedParam::with_config(0.5, sample_rate, 50.0),
            amount: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            applied_crossover: -1.0,
            left: CrossoverChannel::new(),
            right: CrossoverChannel::new(),
            dc_l: DcBlocker::new(sample_rate),
            dc_r: DcBlocker::new(sample_rate),
        }
    }

    fn crossover_hz(norm: f32) -> f32 {
        20.0 * powf(50.0, norm)
    }

    fn update_crossover(&mut self, norm: f32) {
        if (norm - self.applied_crossover).abs() < 1e-3 {
            return;
        }
        self.applied_crossover = norm;
        let hz = Self::crossover_hz(norm);
        let lp = lowpass(hz, BUTTERWORTH_Q, self.sample_rate);
        let hp = highpass(hz, BUTTERWORTH_Q, self.sample_rate);
        for ch in [&mut self.left, &mut self.right] {
            for f in &mut ch.lp {
                f.set_coefficients(lp);
            }
            for f in &mut ch.hp {
                f.set_coefficients(hp);
            }
        }
    }
}

impl Default for MonoMaker {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MonoMaker {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        self.crossover.set_sample_rate(sr);
        self.amount.set_sample_rate(sr);
        self.dc_l.set_sample_rate(sr);
        self.dc_r.set_sample_rate(sr);
        self.applied_crossover = -1.0;
        self.reset();
        self.update_crossover(self.crossover.get());
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        let norm = self.crossover.get();
        self.update_crossover(norm);

        for (l, r) in block.frames_mut() {
            self.crossover.advance();
            let amount = self.amount.advance();

            let (low_l, high_l) = self.left.split(*l);
            let (low_r, high_r) = self.right.split(*r);

            // Attenuate the low band's side component by `amount`.
            let (low_mid, low_side) = ms_encode(low_l, low_r);
            let (mono_l, mono_r) = ms_decode(low_mid, low_side * (1.0 - amount));

            *l = self.dc_l.process(mono_l + high_l);
            *r = self.dc_r.process(mono_r + high_r);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        self.dc_l.reset();
        self.dc_r.reset();
        self.crossover.snap_to_target();
        self.amount.snap_to_target();
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.crossover.set_target(value),
            1 => self.amount.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::MONO_MAKER,
            name: "Mono Maker",
            category: EngineCategory::Spatial,
            param_count: PARAM_COUNT,
            mix_param: None,
        }
    }
}
