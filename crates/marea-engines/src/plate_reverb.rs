//! Plate reverb.
//!
//! Schroeder topology: eight parallel damped combs into four series
//! allpass diffusers per channel, with the right channel's loop lengths
//! offset by a fixed stride so the tail decorrelates. Cheap next to the
//! convolution engine and infinitely sustainable, which the convolution
//! engine is not.
//!
//! # Parameters
//!
//! | Index | Name      | Mapping                         |
//! |-------|-----------|---------------------------------|
//! | 0     | Size      | comb tuning scale 0.7× – 1.6×   |
//! | 1     | Decay     | comb feedback 0.6 – 0.98        |
//! | 2     | Damping   | in-loop treble loss             |
//! | 3     | Pre-delay | 0 ms – 100 ms                   |
//! | 4     | Width     | stereo width of the tail        |
//! | 5     | Mix       | dry/wet                         |

use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    CombFilter, DenormalGuard, Engine, EngineCategory, EngineInfo, FractionalDelay, SmoothedParam,
    StereoBlock, flush_denormal, ms_decode, ms_encode, wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 6;
const MIX_PARAM: usize = 5;

/// Comb loop lengths in samples at 48 kHz, mutually prime.
const COMB_TUNINGS: [usize; 8] = [1557, 1617, 1491, 1422, 1277, 1356, 1188, 1116];
/// Allpass diffuser lengths at 48 kHz.
const ALLPASS_TUNINGS: [usize; 4] = [225, 556, 441, 341];
/// Right-channel loops run this many samples longer.
const STEREO_SPREAD: usize = 23;
const ALLPASS_FEEDBACK: f32 = 0.5;
const MAX_PREDELAY_SECONDS: f32 = 0.1;

/// Delay-based allpass diffuser (distinct from the phase allpass in the
/// core crate: this one smears time, not phase).
struct Diffuser {
    buffer: Vec<f32>,
    pos: usize,
}

impl Diffuser {
    fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.pos];
        let output = delayed - input;
        self.buffer[self.pos] = flush_denormal(input + delayed * ALLPASS_FEEDBACK);
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}

struct PlateChannel {
    combs: Vec<CombFilter>,
    diffusers: Vec<Diffuser>,
}

impl PlateChannel {
    fn new(sample_rate: f32, size: f32, spread: usize) -> Self {
        let scale = size * sample_rate / 48_000.0;
        let combs = COMB_TUNINGS
            .iter()
            .map(|&t| CombFilter::new(((t as f32 * scale) as usize + spread).max(1)))
            .collect();
        let diffusers = ALLPASS_TUNINGS
            .iter()
            .map(|&t| Diffuser::new((t as f32 * scale) as usize + spread))
            .collect();
        Self { combs, diffusers }
    }

    fn set_character(&mut self, feedback: f32, damping: f32) {
        for comb in &mut self.combs {
            comb.set_feedback(feedback);
            comb.set_damping(damping);
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let mut acc = 0.0;
        for comb in &mut self.combs {
            acc += comb.process(input);
        }
        let mut out = acc * 0.125;
        for diffuser in &mut self.diffusers {
            out = diffuser.process(out);
        }
        out
    }

    fn clear(&mut self) {
        for comb in &mut self.combs {
            comb.clear();
        }
        for diffuser in &mut self.diffusers {
            diffuser.clear();
        }
    }
}

/// Schroeder plate (see module docs for the parameter map).
pub struct PlateReverb {
    sample_rate: f32,
    size: SmoothedParam,
    decay: SmoothedParam,
    damping: SmoothedParam,
    pre_delay: SmoothedParam,
    width: SmoothedParam,
    mix: SmoothedParam,
    left: PlateChannel,
    right: PlateChannel,
    pre_l: FractionalDelay,
    pre_r: FractionalDelay,
    applied_decay: f32,
    applied_damping: f32,
    // Size changes reallocate the loops, so they latch until the next
    // prepare-or-rebuild boundary.
    size_dirty: bool,
}

impl PlateReverb {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        let scale = Self::size_scale(0.5);
        Self {
            sample_rate,
            size: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            decay: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            damping: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            pre_delay: SmoothedParam::with_config(0.1, sample_rate, 80.0),
            width: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            mix: SmoothedParam::with_config(0.3, sample_rate, 20.0),
            left: PlateChannel::new(sample_rate, scale, 0),
            right: PlateChannel::new(sample_rate, scale, STEREO_SPREAD),
            pre_l: FractionalDelay::from_time(sample_rate, MAX_PREDELAY_SECONDS),
            pre_r: FractionalDelay::from_time(sample_rate, MAX_PREDELAY_SECONDS),
            applied_decay: -1.0,
            applied_damping: -1.0,
            size_dirty: false,
        }
    }

    fn size_scale(norm: f32) -> f32 {
        0.7 + norm * 0.9
    }

    fn rebuild_loops(&mut self) {
        let scale = Self::size_scale(self.size.target());
        self.left = PlateChannel::new(self.sample_rate, scale, 0);
        self.right = PlateChannel::new(self.sample_rate, scale, STEREO_SPREAD);
        self.applied_decay = -1.0;
        self.applied_damping = -1.0;
        self.size_dirty = false;
    }
}

impl Default for PlateReverb {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for PlateReverb {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        self.pre_l = FractionalDelay::from_time(sr, MAX_PREDELAY_SECONDS);
        self.pre_r = FractionalDelay::from_time(sr, MAX_PREDELAY_SECONDS);
        for p in [
            &mut self.size,
            &mut self.decay,
            &mut self.damping,
            &mut self.pre_delay,
            &mut self.width,
            &mut self.mix,
        ] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.rebuild_loops();
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        // Size edits rebuild at the block boundary, off the sample loop.
        if self.size_dirty {
            self.rebuild_loops();
        }

        for (l, r) in block.frames_mut() {
            let decay_norm = self.decay.advance();
            let damping = self.damping.advance();
            let pre_seconds = self.pre_delay.advance() * MAX_PREDELAY_SECONDS;
            let width = self.width.advance();
            let mix = self.mix.advance();

            if (decay_norm - self.applied_decay).abs() > 1e-3
                || (damping - self.applied_damping).abs() > 1e-3
            {
                let feedback = 0.6 + decay_norm * 0.38;
                self.left.set_character(feedback, damping);
                self.right.set_character(feedback, damping);
                self.applied_decay = decay_norm;
                self.applied_damping = damping;
            }

            let pre_samples = pre_seconds * self.sample_rate;
            let in_l = self.pre_l.read_write(*l, pre_samples);
            let in_r = self.pre_r.read_write(*r, pre_samples);

            let wet_l = self.left.process(in_l);
            let wet_r = self.right.process(in_r);

            let (mid, side) = ms_encode(wet_l, wet_r);
            let (wide_l, wide_r) = ms_decode(mid, side * width);

            *l = wet_dry_mix(*l, wide_l, mix);
            *r = wet_dry_mix(*r, wide_r, mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        self.pre_l.clear();
        self.pre_r.clear();
        for p in [
            &mut self.size,
            &mut self.decay,
            &mut self.damping,
            &mut self.pre_delay,
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
                self.size.set_target(value);
                self.size_dirty = true;
            }
            1 => self.decay.set_target(value),
            2 => self.damping.set_target(value),
            3 => self.pre_delay.set_target(value),
            4 => self.width.set_target(value),
            5 => self.mix.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::PLATE_REVERB,
            name: "Plate Reverb",
            category: EngineCategory::Reverb,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(reverb: &mut PlateReverb, input: &[f32]) -> (Vec<f32>, Vec<f32>) {
        let mut l = input.to_vec();
        let mut r = input.to_vec();
        for start in (0..input.len()).step_by(256) {
            let end = (start + 256).min(input.len());
            let (lh, rh) = (&mut l[start..end], &mut r[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            reverb.process(&mut block);
        }
        (l, r)
    }

    #[test]
    fn impulse_grows_a_tail() {
        let mut reverb = PlateReverb::new();
        reverb.set_param(3, 0.0);
        reverb.set_param(5, 1.0);
        reverb.prepare(48_000.0, 256);
        let mut input = vec![0.0f32; 96_000];
        input[0] = 1.0;
        let (l, _) = run(&mut reverb, &input);
        let tail: f32 = l[24_000..48_000].iter().map(|s| s * s).sum();
        assert!(tail > 1e-6, "expected audible tail energy, got {tail}");
    }

    #[test]
    fn higher_decay_sustains_longer() {
        let tail_energy = |decay: f32| {
            let mut reverb = PlateReverb::new();
            reverb.set_param(1, decay);
            reverb.set_param(3, 0.0);
            reverb.set_param(5, 1.0);
            reverb.prepare(48_000.0, 256);
            let mut input = vec![0.0f32; 96_000];
            input[0] = 1.0;
            let (l, _) = run(&mut reverb, &input);
            l[48_000..].iter().map(|&s| f64::from(s * s)).sum::<f64>()
        };
        assert!(tail_energy(1.0) > tail_energy(0.0) * 2.0);
    }

    #[test]
    fn tail_decays_to_silence() {
        let mut reverb = PlateReverb::new();
        reverb.set_param(1, 0.3);
        reverb.set_param(5, 1.0);
        reverb.prepare(48_000.0, 256);
        let mut input = vec![0.0f32; 48_000 * 6];
        input[0] = 1.0;
        let (l, _) = run(&mut reverb, &input);
        let late = l[48_000 * 5..].iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(late < 1e-3, "tail should die out, late peak {late}");
    }

    #[test]
    fn channels_decorrelate() {
        let mut reverb = PlateReverb::new();
        reverb.set_param(3, 0.0);
        reverb.set_param(5, 1.0);
        reverb.prepare(48_000.0, 256);
        let mut input = vec![0.0f32; 48_000];
        input[0] = 1.0;
        let (l, r) = run(&mut reverb, &input);
        let diff: f32 = l[4_800..24_000]
            .iter()
            .zip(&r[4_800..24_000])
            .map(|(a, b)| (a - b).abs())
            .sum();
        assert!(diff > 0.01, "spread loops should decorrelate, diff {diff}");
    }

    #[test]
    fn dry_mix_is_transparent() {
        let mut reverb = PlateReverb::new();
        reverb.set_param(5, 0.0);
        reverb.prepare(48_000.0, 256);
        let input = vec![0.25f32; 2_048];
        let (l, _) = run(&mut reverb, &input);
        assert!((l[2_000] - 0.25).abs() < 1e-4);
    }
}
