//! Bitcrusher.
//!
//! Bit-depth quantization plus sample-and-hold rate reduction. Aliasing
//! is the point here, so unlike the distortion engine nothing is
//! oversampled; the quantizer and the hold circuit both fold energy
//! back into the band deliberately.
//!
//! # Parameters
//!
//! | Index | Name       | Mapping                     |
//! |-------|------------|-----------------------------|
//! | 0     | Bits       | 16 bits down to 2 bits      |
//! | 1     | Downsample | hold factor 1× – 50×        |
//! | 2     | Mix        | dry/wet                     |

use libm::{floorf, powf};
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, SmoothedParam, StereoBlock, wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 3;
const MIX_PARAM: usize = 2;

/// Lo-fi quantizer (see module docs for the parameter map).
pub struct Bitcrusher {
    bits: SmoothedParam,
    downsample: SmoothedParam,
    mix: SmoothedParam,
    hold_l: f32,
    hold_r: f32,
    hold_counter: f32,
}

impl Bitcrusher {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            bits: SmoothedParam::with_config(0.3, sample_rate, 20.0),
            downsample: SmoothedParam::with_config(0.2, sample_rate, 20.0),
            mix: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            hold_l: 0.0,
            hold_r: 0.0,
            hold_counter: 0.0,
        }
    }

    /// Quantize to `levels` steps per unit; mid-tread so silence stays
    /// silent.
    #[inline]
    fn quantize(x: f32, levels: f32) -> f32 {
        floorf(x * levels + 0.5) / levels
    }
}

impl Default for Bitcrusher {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Bitcrusher {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        for p in [&mut self.bits, &mut self.downsample, &mut self.mix] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        for (l, r) in block.frames_mut() {
            let bits_norm = self.bits.advance();
            let down = self.downsample.advance();
            let mix = self.mix.advance();

            // norm 0 → 16 bits, norm 1 → 2 bits.
            let bit_depth = 16.0 - bits_norm * 14.0;
            let levels = powf(2.0, bit_depth - 1.0);
            let factor = 1.0 + down * 49.0;

            self.hold_counter += 1.0;
            if self.hold_counter >= factor {
                self.hold_counter %= factor;
                self.hold_l = Self::quantize(*l, levels);
                self.hold_r = Self::quantize(*r, levels);
            }

            *l = wet_dry_mix(*l, self.hold_l, mix);
            *r = wet_dry_mix(*r, self.hold_r, mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.hold_l = 0.0;
        self.hold_r = 0.0;
        // Primed so the first sample is captured immediately.
        self.hold_counter = 1e9;
        for p in [&mut self.bits, &mut self.downsample, &mut self.mix] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.bits.set_target(value),
            1 => self.downsample.set_target(value),
            2 => self.mix.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::BITCRUSHER,
            name: "Bitcrusher",
            category: EngineCategory::Distortion,
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
    fn full_depth_no_hold_is_near_transparent() {
        let mut crusher = Bitcrusher::new();
        crusher.set_param(0, 0.0); // 16 bits
        crusher.set_param(1, 0.0); // 1× hold
        crusher.prepare(48_000.0, 256);
        let mut l: Vec<f32> = (0..1_024)
            .map(|n| 0.5 * libm::sinf(TAU * 440.0 * n as f32 / 48_000.0))
            .collect();
        let mut r = l.clone();
        let input = l.clone();
        let mut block = StereoBlock::new(&mut l, &mut r);
        crusher.process(&mut block);
        for (out, inp) in l.iter().zip(&input) {
            // 16-bit quantization error is below -84 dB.
            assert!((out - inp).abs() < 1e-4);
        }
    }

    #[test]
    fn coarse_bits_quantize_to_few_levels() {
        let mut crusher = Bitcrusher::new();
        crusher.set_param(0, 1.0); // 2 bits → 2 levels per unit
        crusher.set_param(1, 0.0);
        crusher.prepare(48_000.0, 256);
        let mut l: Vec<f32> = (0..2_048)
            .map(|n| 0.9 * libm::sinf(TAU * 100.0 * n as f32 / 48_000.0))
            .collect();
        let mut r = l.clone();
        let mut block = StereoBlock::new(&mut l, &mut r);
        crusher.process(&mut block);
        // Every output sample sits on a multiple of 0.5.
        for s in &l[512..] {
            let nearest = libm::floorf(s * 2.0 + 0.5) / 2.0;
            assert!((s - nearest).abs() < 1e-5, "sample {s} off the 2-bit grid");
        }
    }

    #[test]
    fn downsampling_holds_values() {
        let mut crusher = Bitcrusher::new();
        crusher.set_param(0, 0.0);
        crusher.set_param(1, 1.0); // 50× hold
        crusher.prepare(48_000.0, 256);
        let mut l: Vec<f32> = (0..512).map(|n| n as f32 / 512.0).collect();
        let mut r = l.clone();
        let mut block = StereoBlock::new(&mut l, &mut r);
        crusher.process(&mut block);
        // A ramp through a 50× hold produces runs of equal samples.
        let repeats = l.windows(2).filter(|w| w[0] == w[1]).count();
        assert!(repeats > 400, "expected long holds, got {repeats} repeats");
    }
}
