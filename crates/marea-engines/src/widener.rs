//! Stereo widener.
//!
//! Pure mid/side gain: width 0 collapses to mono, 0.5 leaves the image
//! untouched, 1.0 doubles the side channel. A mono input carries no side
//! signal, so no setting can invent stereo where none exists. An optional
//! side low-cut keeps widened bass from going phasey on big systems.
//!
//! # Parameters
//!
//! | Index | Name         | Mapping                         |
//! |-------|--------------|---------------------------------|
//! | 0     | Width        | 0 = mono, 0.5 = 100 %, 1 = 200 % |
//! | 1     | Side Low Cut | off – 500 Hz highpass on side   |

use libm::powf;
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, OnePole, SmoothedParam, StereoBlock,
    ms_decode, ms_encode,
};

use crate::ids;

const PARAM_COUNT: usize = 2;

/// Mid/side width control (see module docs for the parameter map).
pub struct Widener {
    width: SmoothedParam,
    side_cut: SmoothedParam,
    side_lp: OnePole,
    applied_cut: f32,
}

impl Widener {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            width: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            side_cut: SmoothedParam::with_config(0.0, sample_rate, 20.0),
            side_lp: OnePole::new(sample_rate, 20.0),
            applied_cut: -1.0,
        }
    }

    fn cut_hz(norm: f32) -> f32 {
        // off below 1 %, then 20 – 500 Hz log.
        20.0 * powf(25.0, norm)
    }
}

impl Default for Widener {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Widener {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.width.set_sample_rate(sr);
        self.side_cut.set_sample_rate(sr);
        self.side_lp.set_sample_rate(sr);
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        for (l, r) in block.frames_mut() {
            let width = self.width.advance() * 2.0;
            let cut = self.side_cut.advance();

            let (mid, side) = ms_encode(*l, *r);
            let mut side = side * width;
            if cut > 0.01 {
                if (cut - self.applied_cut).abs() > 1e-3 {
                    self.side_lp.set_frequency(Self::cut_hz(cut));
                    self.applied_cut = cut;
                }
                // Highpass the side by subtracting its lowpassed copy.
                side -= self.side_lp.process(side);
            }
            let (out_l, out_r) = ms_decode(mid, side);
            *l = out_l;
            *r = out_r;
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.side_lp.reset();
        self.width.snap_to_target();
        self.side_cut.snap_to_target();
        self.applied_cut = -1.0;
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.width.set_target(value),
            1 => self.side_cut.set_target(value),
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::WIDENER,
            name: "Widener",
            category: EngineCategory::Spatial,
            param_count: PARAM_COUNT,
            mix_param: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process_pair(widener: &mut Widener, l: f32, r: f32, n: usize) -> (f32, f32) {
        let mut left = vec![l; n];
        let mut right = vec![r; n];
        let mut block = StereoBlock::new(&mut left, &mut right);
        widener.process(&mut block);
        (left[n - 1], right[n - 1])
    }

    #[test]
    fn half_width_is_identity() {
        let mut widener = Widener::new();
        widener.prepare(48_000.0, 64);
        let (l, r) = process_pair(&mut widener, 0.6, -0.2, 64);
        assert!((l - 0.6).abs() < 1e-5);
        assert!((r + 0.2).abs() < 1e-5);
    }

    #[test]
    fn zero_width_collapses_to_mono() {
        let mut widener = Widener::new();
        widener.set_param(0, 0.0);
        widener.prepare(48_000.0, 64);
        let (l, r) = process_pair(&mut widener, 0.8, 0.2, 64);
        assert!((l - r).abs() < 1e-5);
        assert!((l - 0.5).abs() < 1e-5, "mono sum should be (L+R)/2");
    }

    #[test]
    fn mono_input_stays_mono_at_any_width() {
        let mut widener = Widener::new();
        widener.set_param(0, 1.0);
        widener.prepare(48_000.0, 64);
        let (l, r) = process_pair(&mut widener, 0.5, 0.5, 64);
        assert!((l - r).abs() < 1e-6, "no side can appear from a mono input");
    }

    #[test]
    fn full_width_doubles_side() {
        let mut widener = Widener::new();
        widener.set_param(0, 1.0);
        widener.prepare(48_000.0, 64);
        // Pure side input: L = -R.
        let (l, r) = process_pair(&mut widener, 0.25, -0.25, 64);
        assert!((l - 0.5).abs() < 1e-5);
        assert!((r + 0.5).abs() < 1e-5);
    }
}
