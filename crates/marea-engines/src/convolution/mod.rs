//! Convolution reverb.
//!
//! The IR is synthesized, not sampled: [`ir`] builds hall, plate,
//! stairwell, and cloud responses parametrically, [`cache`] memoizes them
//! at 1 % parameter resolution, and [`convolver`] runs uniform-partition
//! overlap-save FFT convolution at a fixed 256-sample partition. Around
//! the convolution core sit a modulated fractional pre-delay, low/high
//! cut filters on the wet path, mid/side width, and dry/wet mix.
//!
//! # Parameters
//!
//! | Index | Name       | Mapping                                       |
//! |-------|------------|-----------------------------------------------|
//! | 0     | Type       | hall / plate / stairwell / cloud (quartiles)  |
//! | 1     | Size       | decay scale 0.25× – 2×                        |
//! | 2     | Damping    | tail low-pass, floored at 200 Hz              |
//! | 3     | Reverse    | > 0.5 reverses the envelope                   |
//! | 4     | Pre-delay  | 0 – 200 ms                                    |
//! | 5     | Early/Late | balance of the first 80 ms vs the tail        |
//! | 6     | Low Cut    | 20 Hz – 1 kHz log, wet path                   |
//! | 7     | High Cut   | 1 kHz – 20 kHz log, wet path                  |
//! | 8     | Width      | mid/side width, 0 = mono, 1 = 200 %           |
//! | 9     | Mix        | dry/wet                                       |
//!
//! Type, Size, Damping, Reverse, and Early/Late latch an IR rebuild that
//! runs at the next block boundary (control path: it allocates and may
//! take milliseconds; the cache absorbs repeats). Cloud IRs engage a
//! slow pre-delay modulation (0.3 Hz, up to 1 ms) that keeps long pads
//! from sounding static. Latency is one partition.

pub mod cache;
pub mod convolver;
pub mod ir;

use libm::powf;
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, FractionalDelay, Lfo, SmoothedParam,
    StateVariableFilter, StereoBlock, SvfMode, ms_decode, ms_encode, wet_dry_mix,
};

use crate::ids;
use cache::IrCache;
use convolver::{Convolver, PARTITION};
use ir::{IrSpec, IrType};

const PARAM_COUNT: usize = 10;
const MIX_PARAM: usize = 9;

const MAX_PREDELAY_MS: f32 = 200.0;
const MOD_RATE_HZ: f32 = 0.3;
const MAX_MOD_MS: f32 = 1.0;

/// FFT-partitioned convolution reverb (see module docs for the
/// parameter map).
pub struct ConvolutionReverb {
    sample_rate: f32,
    ir_type: f32,
    size: f32,
    damping: f32,
    early_late: f32,
    reverse: f32,
    ir_dirty: bool,
    mod_depth_ms: f32,
    predelay: SmoothedParam,
    low_cut: SmoothedParam,
    high_cut: SmoothedParam,
    width: SmoothedParam,
    mix: SmoothedParam,
    cache: IrCache,
    conv_l: Convolver,
    conv_r: Convolver,
    pre_l: FractionalDelay,
    pre_r: FractionalDelay,
    movement_lfo: Lfo,
    hp_l: StateVariableFilter,
    hp_r: StateVariableFilter,
    lp_l: StateVariableFilter,
    lp_r: StateVariableFilter,
}

impl ConvolutionReverb {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        let mut engine = Self {
            sample_rate,
            ir_type: 0.0,
            size: 0.4,
            damping: 0.3,
            early_late: 0.5,
            reverse: 0.0,
            ir_dirty: true,
            mod_depth_ms: 0.0,
            predelay: SmoothedParam::with_config(0.1, sample_rate, 50.0),
            low_cut: SmoothedParam::with_config(0.0, sample_rate, 20.0),
            high_cut: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            width: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            mix: SmoothedParam::with_config(0.3, sample_rate, 20.0),
            cache: IrCache::new(),
            conv_l: Convolver::new(),
            conv_r: Convolver::new(),
            pre_l: FractionalDelay::from_time(sample_rate, (MAX_PREDELAY_MS + 2.0) * 1e-3),
            pre_r: FractionalDelay::from_time(sample_rate, (MAX_PREDELAY_MS + 2.0) * 1e-3),
            movement_lfo: Lfo::new(sample_rate, MOD_RATE_HZ),
            hp_l: StateVariableFilter::new(sample_rate),
            hp_r: StateVariableFilter::new(sample_rate),
            lp_l: StateVariableFilter::new(sample_rate),
            lp_r: StateVariableFilter::new(sample_rate),
        };
        for f in [&mut engine.hp_l, &mut engine.hp_r] {
            f.set_mode(SvfMode::Highpass);
        }
        for f in [&mut engine.lp_l, &mut engine.lp_r] {
            f.set_mode(SvfMode::Lowpass);
        }
        engine
    }

    fn current_spec(&self) -> IrSpec {
        IrSpec {
            ir_type: IrType::from_norm(self.ir_type),
            size: 0.25 + self.size * 1.75,
            damping: self.damping,
            early_late: self.early_late,
            reverse: self.reverse > 0.5,
        }
    }

    fn rebuild_ir(&mut self) {
        let spec = self.current_spec();
        // Only the cloud family gets the slow pre-delay wobble; the other
        // rooms stay put.
        self.mod_depth_ms = if spec.ir_type == IrType::Cloud {
            MAX_MOD_MS
        } else {
            0.0
        };
        let ir = self.cache.get_or_synthesize(&spec, self.sample_rate);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "convolution: ir rebuilt, {} samples per channel",
            ir.left.len()
        );
        self.conv_l.set_ir(&ir.left);
        self.conv_r.set_ir(&ir.right);
        self.ir_dirty = false;
    }

    fn low_cut_hz(&self, norm: f32) -> f32 {
        // 20 Hz – 1 kHz, logarithmic.
        20.0 * powf(50.0, norm)
    }

    fn high_cut_hz(&self, norm: f32) -> f32 {
        // 1 kHz – 20 kHz, logarithmic, bounded below Nyquist.
        let top = (20_000.0f32).min(self.sample_rate * 0.49);
        1_000.0 * powf(top / 1_000.0, norm)
    }
}

impl Default for ConvolutionReverb {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for ConvolutionReverb {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        self.pre_l = FractionalDelay::from_time(sr, (MAX_PREDELAY_MS + 2.0) * 1e-3);
        self.pre_r = FractionalDelay::from_time(sr, (MAX_PREDELAY_MS + 2.0) * 1e-3);
        self.movement_lfo.set_sample_rate(sr);
        for f in [&mut self.hp_l, &mut self.hp_r, &mut self.lp_l, &mut self.lp_r] {
            f.set_sample_rate(sr);
        }
        for p in [
            &mut self.predelay,
            &mut self.low_cut,
            &mut self.high_cut,
            &mut self.width,
            &mut self.mix,
        ] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.rebuild_ir();
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        if self.ir_dirty {
            // Control-path rebuild, latched to the block boundary.
            self.rebuild_ir();
        }

        // Filter cutoffs move at block cadence; per-sample tan() is not
        // worth it for a reverb tone control.
        let lc = self.low_cut_hz(self.low_cut.get());
        let hc = self.high_cut_hz(self.high_cut.get()).max(lc * 1.1);
        for f in [&mut self.hp_l, &mut self.hp_r] {
            f.set_cutoff(lc);
        }
        for f in [&mut self.lp_l, &mut self.lp_r] {
            f.set_cutoff(hc);
        }

        let sr = self.sample_rate;
        let depth_ms = self.mod_depth_ms;
        for (l, r) in block.frames_mut() {
            let predelay_ms = self.predelay.advance() * MAX_PREDELAY_MS;
            self.low_cut.advance();
            self.high_cut.advance();
            let width = self.width.advance();
            let mix = self.mix.advance();

            let wobble_ms = self.movement_lfo.next() * depth_ms;
            let pd_samples = ((predelay_ms + wobble_ms) * 1e-3 * sr).max(0.0);

            let fed_l = self.pre_l.read_write(*l, pd_samples);
            let fed_r = self.pre_r.read_write(*r, pd_samples);

            let mut wet_l = self.conv_l.process_sample(fed_l);
            let mut wet_r = self.conv_r.process_sample(fed_r);

            wet_l = self.lp_l.process(self.hp_l.process(wet_l));
            wet_r = self.lp_r.process(self.hp_r.process(wet_r));

            // Width: 0 → mono, 0.5 → unchanged, 1 → 200 % side.
            let (mid, side) = ms_encode(wet_l, wet_r);
            let (w_l, w_r) = ms_decode(mid, side * width * 2.0);

            *l = wet_dry_mix(*l, w_l, mix);
            *r = wet_dry_mix(*r, w_r, mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.conv_l.clear();
        self.conv_r.clear();
        self.pre_l.clear();
        self.pre_r.clear();
        self.movement_lfo.reset();
        for f in [&mut self.hp_l, &mut self.hp_r, &mut self.lp_l, &mut self.lp_r] {
            f.reset();
        }
        for p in [
            &mut self.predelay,
            &mut self.low_cut,
            &mut self.high_cut,
            &mut self.width,
            &mut self.mix,
        ] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => {
                self.ir_dirty |= (value - self.ir_type).abs() > 1e-6;
                self.ir_type = value;
            }
            1 => {
                self.ir_dirty |= (value - self.size).abs() > 1e-6;
                self.size = value;
            }
            2 => {
                self.ir_dirty |= (value - self.damping).abs() > 1e-6;
                self.damping = value;
            }
            3 => {
                self.ir_dirty |= (value > 0.5) != (self.reverse > 0.5);
                self.reverse = value;
            }
            4 => self.predelay.set_target(value),
            5 => {
                self.ir_dirty |= (value - self.early_late).abs() > 1e-6;
                self.early_late = value;
            }
            6 => self.low_cut.set_target(value),
            7 => self.high_cut.set_target(value),
            8 => self.width.set_target(value),
            9 => self.mix.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::CONVOLUTION_REVERB,
            name: "Convolution Reverb",
            category: EngineCategory::Reverb,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }

    fn latency_samples(&self) -> usize {
        PARTITION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_impulse(engine: &mut ConvolutionReverb, len: usize) -> Vec<f32> {
        let mut left = vec![0.0f32; len];
        let mut right = vec![0.0f32; len];
        left[0] = 1.0;
        right[0] = 1.0;
        for start in (0..len).step_by(512) {
            let end = (start + 512).min(len);
            let (lh, rh) = (&mut left[start..end], &mut right[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            engine.process(&mut block);
        }
        left
    }

    fn energy(samples: &[f32]) -> f32 {
        samples.iter().map(|s| s * s).sum()
    }

    #[test]
    fn impulse_grows_a_tail() {
        let mut reverb = ConvolutionReverb::new();
        reverb.set_param(9, 1.0); // full wet
        reverb.set_param(4, 0.0); // no pre-delay
        reverb.prepare(48_000.0, 512);
        let out = run_impulse(&mut reverb, 48_000);
        // Energy well past the impulse proves a decaying tail exists.
        assert!(energy(&out[4_800..9_600]) > 1e-6);
        assert!(energy(&out[24_000..48_000]) < energy(&out[4_800..9_600]));
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn dry_mix_is_transparent() {
        let mut reverb = ConvolutionReverb::new();
        reverb.set_param(9, 0.0);
        reverb.prepare(48_000.0, 512);
        let out = run_impulse(&mut reverb, 2_048);
        assert!((out[0] - 1.0).abs() < 1e-3);
        assert!(energy(&out[512..]) < 1e-6);
    }

    #[test]
    fn full_damping_still_produces_output() {
        let mut reverb = ConvolutionReverb::new();
        reverb.set_param(2, 1.0);
        reverb.set_param(9, 1.0);
        reverb.set_param(4, 0.0);
        reverb.prepare(48_000.0, 512);
        let out = run_impulse(&mut reverb, 24_000);
        assert!(energy(&out) > 1e-6, "full damping must stay audible");
    }

    #[test]
    fn zero_width_collapses_to_mono() {
        let mut reverb = ConvolutionReverb::new();
        reverb.set_param(8, 0.0);
        reverb.set_param(9, 1.0);
        reverb.set_param(4, 0.0);
        reverb.prepare(48_000.0, 512);

        let len = 8_192;
        let mut left = vec![0.0f32; len];
        let mut right = vec![0.0f32; len];
        left[0] = 1.0;
        right[0] = 1.0;
        for start in (0..len).step_by(512) {
            let end = (start + 512).min(len);
            let (lh, rh) = (&mut left[start..end], &mut right[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            reverb.process(&mut block);
        }
        for (l, r) in left.iter().zip(&right) {
            assert!((l - r).abs() < 1e-5, "zero width must be mono");
        }
    }

    #[test]
    fn reports_partition_latency() {
        let reverb = ConvolutionReverb::new();
        assert_eq!(reverb.latency_samples(), 256);
    }

    #[test]
    fn param_edits_latch_a_rebuild() {
        let mut reverb = ConvolutionReverb::new();
        reverb.prepare(48_000.0, 512);
        assert!(!reverb.ir_dirty);
        reverb.set_param(1, 0.9);
        assert!(reverb.ir_dirty);
        let mut l = [0.0f32; 64];
        let mut r = [0.0f32; 64];
        let mut block = StereoBlock::new(&mut l, &mut r);
        reverb.process(&mut block);
        assert!(!reverb.ir_dirty);
    }

    #[test]
    fn early_late_balance_latches_a_rebuild() {
        let mut reverb = ConvolutionReverb::new();
        reverb.prepare(48_000.0, 512);
        assert!(!reverb.ir_dirty);
        reverb.set_param(5, 0.9);
        assert!(reverb.ir_dirty);
        // Smoothed params never latch.
        reverb.ir_dirty = false;
        reverb.set_param(4, 0.8);
        reverb.set_param(6, 0.4);
        assert!(!reverb.ir_dirty);
    }
}
