//! Phase alignment.
//!
//! Fixes the comb-filtering that appears when two correlated sources
//! (top/bottom snare mics, DI plus amp) are mixed slightly out of time.
//! The right channel is treated as the one to move: four bands each get
//! an independent phase rotation built from a first-order allpass, and a
//! shared fractional delay (integer taps plus a Thiran section) trims
//! inter-channel lag with sub-sample precision.
//!
//! Auto mode measures the inter-channel lag by cross-correlating a short
//! analysis window and programs the delay to cancel it. Both channels run
//! through a fixed 32-sample margin delay so the correction can move in
//! either direction; latency is that margin, fixed at prepare.
//!
//! # Parameters
//!
//! | Index | Name       | Mapping                             |
//! |-------|------------|-------------------------------------|
//! | 0     | Low Phase  | -180° – +180°, band below 200 Hz    |
//! | 1     | Low-Mid    | -180° – +180°, 200 Hz – 1 kHz       |
//! | 2     | High-Mid   | -180° – +180°, 1 kHz – 5 kHz        |
//! | 3     | High Phase | -180° – +180°, above 5 kHz          |
//! | 4     | Delay      | manual trim, ±16 samples            |
//! | 5     | Auto       | > 0.5 measures and cancels the lag  |

use core::f32::consts::PI;
use libm::{cosf, sinf};
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    Biquad, DenormalGuard, Engine, EngineCategory, EngineInfo, FirstOrderAllpass, FractionalDelay,
    SmoothedParam, StereoBlock, ThiranAllpass, highpass, lowpass,
};

use crate::ids;

const PARAM_COUNT: usize = 6;

/// Fixed margin so the correction can be negative; also the latency.
const ALIGN_MARGIN: usize = 32;
/// Manual trim range in samples.
const MAX_TRIM: f32 = 16.0;
/// Auto-align analysis window.
const ANALYSIS_LEN: usize = 2_048;

const BAND_EDGES: [f32; 3] = [200.0, 1_000.0, 5_000.0];
const BAND_CENTERS: [f32; 4] = [100.0, 450.0, 2_200.0, 9_000.0];

const BUTTERWORTH_Q: f32 = core::f32::consts::FRAC_1_SQRT_2;

/// One LR4 split point.
struct Splitter {
    lp: [Biquad; 2],
    hp: [Biquad; 2],
}

impl Splitter {
    fn new() -> Self {
        Self {
            lp: [Biquad::new(), Biquad::new()],
            hp: [Biquad::new(), Biquad::new()],
        }
    }

    fn tune(&mut self, hz: f32, sample_rate: f32) {
        let lp = lowpass(hz, BUTTERWORTH_Q, sample_rate);
        let hp = highpass(hz, BUTTERWORTH_Q, sample_rate);
        for f in &mut self.lp {
            f.set_coefficients(lp);
        }
        for f in &mut self.hp {
            f.set_coefficients(hp);
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

/// Per-band phase rotation and alignment (see module docs for the
/// parameter map).
pub struct PhaseAlign {
    sample_rate: f32,
    phase: [SmoothedParam; 4],
    trim: SmoothedParam,
    auto: f32,
    splitters: [Splitter; 3],
    rotators: [FirstOrderAllpass; 4],
    delay_l: FractionalDelay,
    delay_r: FractionalDelay,
    thiran: ThiranAllpass,
    measured_lag: f32,
    analysis_l: Vec<f32>,
    analysis_r: Vec<f32>,
    analysis_fill: usize,
}

impl PhaseAlign {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            sample_rate,
            phase: core::array::from_fn(|_| SmoothedParam::with_config(0.5, sample_rate, 20.0)),
            trim: SmoothedParam::with_config(0.5, sample_rate, 50.0),
            auto: 0.0,
            splitters: core::array::from_fn(|_| Splitter::new()),
            rotators: core::array::from_fn(|i| {
                FirstOrderAllpass::new(sample_rate, BAND_CENTERS[i])
            }),
            delay_l: FractionalDelay::new(ALIGN_MARGIN * 4),
            delay_r: FractionalDelay::new(ALIGN_MARGIN * 4),
            thiran: ThiranAllpass::new(0.0),
            measured_lag: 0.0,
            analysis_l: vec![0.0; ANALYSIS_LEN],
            analysis_r: vec![0.0; ANALYSIS_LEN],
            analysis_fill: 0,
        }
    }

    /// Cross-correlate the analysis window and store the lag (positive
    /// means right arrives late).
    fn measure_lag(&mut self) {
        let max_lag = ALIGN_MARGIN as isize - 1;
        let mut best_lag = 0isize;
        let mut best = f64::MIN;
        for lag in -max_lag..=max_lag {
            let mut acc = 0.0f64;
            for n in 0..ANALYSIS_LEN {
                let m = n as isize + lag;
                if m >= 0 && (m as usize) < ANALYSIS_LEN {
                    acc += f64::from(self.analysis_l[n] * self.analysis_r[m as usize]);
                }
            }
            if acc > best {
                best = acc;
                best_lag = lag;
            }
        }
        if best > 1e-9 {
            self.measured_lag = best_lag as f32;
        }
    }
}

impl Default for PhaseAlign {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for PhaseAlign {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        for (splitter, &hz) in self.splitters.iter_mut().zip(&BAND_EDGES) {
            splitter.tune(hz, sr);
        }
        for (rot, &hz) in self.rotators.iter_mut().zip(&BAND_CENTERS) {
            *rot = FirstOrderAllpass::new(sr, hz);
        }
        for p in &mut self.phase {
            p.set_sample_rate(sr);
        }
        self.trim.set_sample_rate(sr);
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        let auto_on = self.auto > 0.5;
        for (l, r) in block.frames_mut() {
            let trim = (self.trim.advance() - 0.5) * 2.0 * MAX_TRIM;

            if auto_on {
                self.analysis_l[self.analysis_fill] = *l;
                self.analysis_r[self.analysis_fill] = *r;
                self.analysis_fill += 1;
                if self.analysis_fill == ANALYSIS_LEN {
                    self.analysis_fill = 0;
                    self.measure_lag();
                }
            }

            // Left takes the fixed margin; right takes margin minus the
            // programmed correction, so it can lead or lag.
            let correction = if auto_on { self.measured_lag } else { 0.0 } + trim;
            let margin = ALIGN_MARGIN as f32;
            let out_l = self.delay_l.read_write(*l, margin);
            let right_delay = (margin - correction).clamp(1.0, margin * 2.0);
            // Integer taps from the delay line, sub-sample part from the
            // Thiran section (which contributes 1 + frac samples itself).
            let int_delay = right_delay.floor() - 1.0;
            self.thiran.set_fraction(right_delay - int_delay - 1.0);
            let delayed_r = self
                .thiran
                .process(self.delay_r.read_write(*r, int_delay));

            // Band-split the right channel and rotate each band.
            let (b0, rest) = self.splitters[0].split(delayed_r);
            let (b1, rest) = self.splitters[1].split(rest);
            let (b2, b3) = self.splitters[2].split(rest);

            let mut out_r = 0.0;
            for (band, (rot, phase)) in [b0, b1, b2, b3]
                .into_iter()
                .zip(self.rotators.iter_mut().zip(self.phase.iter_mut()))
            {
                let theta = (phase.advance() - 0.5) * 2.0 * PI;
                let shifted = rot.process(band);
                out_r += cosf(theta) * band - sinf(theta) * shifted;
            }

            *l = out_l;
            *r = out_r;
        }
        block.scrub();
    }

    fn reset(&mut self) {
        for s in &mut self.splitters {
            s.clear();
        }
        for r in &mut self.rotators {
            r.reset();
        }
        self.delay_l.clear();
        self.delay_r.clear();
        self.thiran.reset();
        self.measured_lag = 0.0;
        self.analysis_l.fill(0.0);
        self.analysis_r.fill(0.0);
        self.analysis_fill = 0;
        for p in &mut self.phase {
            p.snap_to_target();
        }
        self.trim.snap_to_target();
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0..=3 => self.phase[index].set_target(value),
            4 => self.trim.set_target(value),
            5 => self.auto = value,
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::PHASE_ALIGN,
            name: "Phase Align",
            category: EngineCategory::Spatial,
            param_count: PARAM_COUNT,
            mix_param: None,
        }
    }

    fn latency_samples(&self) -> usize {
        ALIGN_MARGIN
    }
}
