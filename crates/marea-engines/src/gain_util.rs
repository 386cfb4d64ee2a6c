//! Gain utility.
//!
//! Channel housekeeping: trim, equal-power pan, and polarity flips.
//! No character, no coloration; this is the engine that goes in a chain
//! slot when the chain needs plumbing rather than processing.
//!
//! # Parameters
//!
//! | Index | Name     | Mapping                                  |
//! |-------|----------|------------------------------------------|
//! | 0     | Gain     | ±24 dB, center is unity                  |
//! | 1     | Pan      | equal-power, center is no pan            |
//! | 2     | Polarity | quartiles: none / flip L / flip R / both |

use core::f32::consts::FRAC_PI_2;
use libm::{cosf, sinf};
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, SmoothedParam, StereoBlock, db_to_linear,
};

use crate::ids;

const PARAM_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    None,
    FlipLeft,
    FlipRight,
    FlipBoth,
}

impl Polarity {
    fn from_norm(norm: f32) -> Self {
        match (norm.clamp(0.0, 1.0) * 4.0).min(3.999_9) as u32 {
            0 => Self::None,
            1 => Self::FlipLeft,
            2 => Self::FlipRight,
            _ => Self::FlipBoth,
        }
    }

    fn signs(self) -> (f32, f32) {
        match self {
            Self::None => (1.0, 1.0),
            Self::FlipLeft => (-1.0, 1.0),
            Self::FlipRight => (1.0, -1.0),
            Self::FlipBoth => (-1.0, -1.0),
        }
    }
}

/// Trim/pan/polarity utility (see module docs for the parameter map).
pub struct GainUtility {
    gain: SmoothedParam,
    pan: SmoothedParam,
    polarity: f32,
}

impl GainUtility {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            gain: SmoothedParam::with_config(0.5, sample_rate, 10.0),
            pan: SmoothedParam::with_config(0.5, sample_rate, 10.0),
            polarity: 0.0,
        }
    }
}

impl Default for GainUtility {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for GainUtility {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        for p in [&mut self.gain, &mut self.pan] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        let (sign_l, sign_r) = Polarity::from_norm(self.polarity).signs();
        for (l, r) in block.frames_mut() {
            let gain = db_to_linear((self.gain.advance() - 0.5) * 48.0);
            // Equal-power pan law: -3 dB per channel at center.
            let angle = self.pan.advance() * FRAC_PI_2;
            let pan_l = cosf(angle);
            let pan_r = sinf(angle);

            *l *= gain * pan_l * core::f32::consts::SQRT_2 * sign_l;
            *r *= gain * pan_r * core::f32::consts::SQRT_2 * sign_r;
        }
        block.scrub();
    }

    fn reset(&mut self) {
        for p in [&mut self.gain, &mut self.pan] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.gain.set_target(value),
            1 => self.pan.set_target(value),
            2 => self.polarity = value,
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::GAIN_UTILITY,
            name: "Gain Utility",
            category: EngineCategory::Utility,
            param_count: PARAM_COUNT,
            mix_param: None,
        }
    }
}
