//! Vintage console EQ.
//!
//! Three-band channel-strip EQ with the analog quirks that make console
//! emulations sit differently than clinical digital EQs: a
//! proportional-Q midband bell that widens as you push it, a saturation
//! stage modeled on four desk lineages, and an optional vintage mode
//! whose per-instance thermal tolerance detunes each band by less than
//! 2 % so no two instances are bit-identical.
//!
//! Filter coefficients are never recomputed per sample: updates fire on
//! a 32-sample cadence and only when a smoothed parameter has actually
//! moved.
//!
//! # Parameters
//!
//! | Index | Name         | Mapping                                  |
//! |-------|--------------|------------------------------------------|
//! | 0     | Low Gain     | ±15 dB shelf                             |
//! | 1     | Low Freq     | 30 Hz – 300 Hz, log                      |
//! | 2     | Mid Gain     | ±15 dB proportional-Q bell               |
//! | 3     | Mid Freq     | 200 Hz – 8 kHz, log                      |
//! | 4     | Mid Q        | 0.3 – 3.0                                |
//! | 5     | High Gain    | ±15 dB shelf                             |
//! | 6     | High Freq    | 3 kHz – 16 kHz, log                      |
//! | 7     | Drive        | saturation amount                        |
//! | 8     | Console Type | quartiles pick SSL / API / Neve / Pultec |
//! | 9     | Vintage      | > 0.5 enables thermal drift              |
//! | 10    | Mix          | dry/wet                                  |

use core::sync::atomic::{AtomicU32, Ordering};

use libm::{powf, sinf, tanhf};
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    Biquad, DenormalGuard, Engine, EngineCategory, EngineInfo, SmoothedParam, StereoBlock,
    XorShift32, high_shelf, low_shelf, peaking_proportional_q, wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 11;
const MIX_PARAM: usize = 10;

/// Coefficient update cadence in samples.
const UPDATE_INTERVAL: u32 = 32;
/// Smallest parameter move that forces a coefficient recompute.
const UPDATE_THRESHOLD: f32 = 1e-3;
/// Output level where the clip guard engages.
const GUARD_LEVEL: f32 = 0.95;

static INSTANCE_SEED: AtomicU32 = AtomicU32::new(0x00c0_ffee);

/// Console saturation flavor, selected by the Console Type quartile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleVariant {
    Ssl,
    Api,
    Neve,
    Pultec,
}

impl ConsoleVariant {
    fn from_norm(norm: f32) -> Self {
        match (norm.clamp(0.0, 1.0) * 4.0) as u32 {
            0 => ConsoleVariant::Ssl,
            1 => ConsoleVariant::Api,
            2 => ConsoleVariant::Neve,
            _ => ConsoleVariant::Pultec,
        }
    }

    /// Shape one sample. `prev` carries the last input for the slew term
    /// the Neve model needs.
    fn saturate(self, x: f32, amount: f32, prev: &mut f32) -> f32 {
        let slew = x - *prev;
        *prev = x;
        if amount < 1e-4 {
            return x;
        }
        match self {
            // Clean bus: symmetric tanh, gently normalized.
            ConsoleVariant::Ssl => {
                let drive = 1.0 + amount * 2.0;
                tanhf(x * drive) / drive
            }
            // Punchy soft knee above 0.7, tiny sine-shaped odd harmonics.
            ConsoleVariant::Api => {
                let knee = 0.7;
                let shaped = if x.abs() > knee {
                    let over = x.abs() - knee;
                    (knee + over / (1.0 + over * amount * 3.0)) * x.signum()
                } else {
                    x
                };
                shaped + sinf(x * core::f32::consts::PI) * amount * 0.02
            }
            // Transformer: slow-moving content leans harder into the
            // asymmetric curve than fast transients, plus a second
            // harmonic.
            ConsoleVariant::Neve => {
                let emphasized = x + (x - slew) * amount * 0.3;
                let drive = 1.0 + amount * 3.0;
                let k = if emphasized >= 0.0 { 1.1 } else { 0.9 };
                let core = tanhf(emphasized * drive * k) / drive;
                core + x * x * amount * 0.08
            }
            // Gentle program rounding.
            ConsoleVariant::Pultec => tanhf(x * (1.0 + 0.5 * amount)) / (1.0 + 0.3 * amount),
        }
    }
}

struct EqChannel {
    low: Biquad,
    mid: Biquad,
    high: Biquad,
    sat_prev: f32,
}

impl EqChannel {
    fn new() -> Self {
        Self {
            low: Biquad::new(),
            mid: Biquad::new(),
            high: Biquad::new(),
            sat_prev: 0.0,
        }
    }

    fn clear(&mut self) {
        self.low.clear();
        self.mid.clear();
        self.high.clear();
        self.sat_prev = 0.0;
    }
}

/// Three-band console EQ (see module docs for the parameter map).
pub struct ConsoleEq {
    sample_rate: f32,
    params: [SmoothedParam; PARAM_COUNT],
    applied: [f32; PARAM_COUNT],
    update_countdown: u32,
    left: EqChannel,
    right: EqChannel,
    /// Per-band frequency tolerance multipliers, < 2 % from unity.
    drift: [f32; 3],
    drift_rng: XorShift32,
}

impl ConsoleEq {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        let defaults = [0.5, 0.3, 0.5, 0.5, 0.5, 0.5, 0.5, 0.0, 0.0, 0.0, 1.0];
        let params =
            defaults.map(|d| SmoothedParam::with_config(d, sample_rate, 20.0));
        let seed = INSTANCE_SEED.fetch_add(0x9e37_79b9, Ordering::Relaxed);
        let mut eq = Self {
            sample_rate,
            params,
            applied: [f32::NAN; PARAM_COUNT],
            update_countdown: 0,
            left: EqChannel::new(),
            right: EqChannel::new(),
            drift: [1.0; 3],
            drift_rng: XorShift32::new(seed),
        };
        eq.roll_drift();
        eq
    }

    fn roll_drift(&mut self) {
        for d in &mut self.drift {
            *d = 1.0 + self.drift_rng.next_bipolar() * 0.02;
        }
    }

    fn update_coefficients(&mut self) {
        let mut p = [0.0f32; PARAM_COUNT];
        for (slot, param) in p.iter_mut().zip(&self.params) {
            *slot = param.get();
        }
        // Band params 0–6 and the vintage switch change coefficients;
        // drive, type, and mix never do.
        let moved = self
            .applied
            .iter()
            .zip(&p)
            .enumerate()
            .filter(|&(i, _)| i < 7 || i == 9)
            .any(|(_, (a, b))| (a - b).abs() > UPDATE_THRESHOLD || a.is_nan());
        if !moved {
            return;
        }

        let sr = self.sample_rate;
        let drift = if p[9] > 0.5 { self.drift } else { [1.0; 3] };
        let low_db = (p[0] - 0.5) * 30.0;
        let low_hz = 30.0 * powf(10.0, p[1]) * drift[0];
        let mid_db = (p[2] - 0.5) * 30.0;
        let mid_hz = 200.0 * powf(40.0, p[3]) * drift[1];
        let mid_q = 0.3 + p[4] * 2.7;
        let high_db = (p[5] - 0.5) * 30.0;
        let high_hz = (3_000.0 * powf(16.0 / 3.0, p[6]) * drift[2]).min(sr * 0.45);

        let low = low_shelf(low_hz, 0.7, low_db, sr);
        let mid = peaking_proportional_q(mid_hz, mid_q, mid_db, sr);
        let high = high_shelf(high_hz, 0.7, high_db, sr);
        for ch in [&mut self.left, &mut self.right] {
            ch.low.set_coefficients(low);
            ch.mid.set_coefficients(mid);
            ch.high.set_coefficients(high);
        }
        self.applied.copy_from_slice(&p);
    }
}

impl Default for ConsoleEq {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for ConsoleEq {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        for p in &mut self.params {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.applied = [f32::NAN; PARAM_COUNT];
        self.update_countdown = 0;
        self.left.clear();
        self.right.clear();
        self.update_coefficients();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        for (l, r) in block.frames_mut() {
            for p in &mut self.params {
                p.advance();
            }
            if self.update_countdown == 0 {
                self.update_coefficients();
                self.update_countdown = UPDATE_INTERVAL;
            }
            self.update_countdown -= 1;

            let amount = self.params[7].get();
            let variant = ConsoleVariant::from_norm(self.params[8].get());
            let mix = self.params[10].get();

            for (channel, sample) in [(&mut self.left, &mut *l), (&mut self.right, &mut *r)] {
                let dry = *sample;
                let mut x = channel.low.process(dry);
                x = channel.mid.process(x);
                x = channel.high.process(x);
                x = variant.saturate(x, amount, &mut channel.sat_prev);
                if x.abs() > GUARD_LEVEL {
                    x = tanhf(x * 0.9) * 1.055;
                }
                *sample = wet_dry_mix(dry, x, mix);
            }
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        for p in &mut self.params {
            p.snap_to_target();
        }
        // A reset is a power cycle: the channel warms up slightly
        // differently each time.
        self.roll_drift();
        self.applied = [f32::NAN; PARAM_COUNT];
        self.update_countdown = 0;
    }

    fn set_param(&mut self, index: usize, value: f32) {
        if let Some(p) = self.params.get_mut(index) {
            // Console Type and Vintage are discrete switches; gliding
            // through them would sweep across console models.
            if index == 8 || index == 9 {
                p.set_immediate(clamp_norm(value));
            } else {
                p.set_target(clamp_norm(value));
            }
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::CONSOLE_EQ,
            name: "Console EQ",
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

    fn run_tone(eq: &mut ConsoleEq, freq: f32, len: usize) -> (f32, f32) {
        let mut in_sq = 0.0f64;
        let mut out_sq = 0.0f64;
        let mut left = vec![0.0f32; len];
        let mut right = vec![0.0f32; len];
        for (n, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            *l = 0.25 * libm::sinf(TAU * freq * n as f32 / 48_000.0);
            *r = *l;
        }
        let input = left.clone();
        for start in (0..len).step_by(256) {
            let end = (start + 256).min(len);
            let (lh, rh) = (&mut left[start..end], &mut right[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            eq.process(&mut block);
        }
        for n in len / 2..len {
            in_sq += f64::from(input[n] * input[n]);
            out_sq += f64::from(left[n] * left[n]);
        }
        (((out_sq / in_sq).sqrt()) as f32, 0.0)
    }

    fn render_tone(eq: &mut ConsoleEq, freq: f32, amp: f32, len: usize) -> Vec<f32> {
        let mut left: Vec<f32> = (0..len)
            .map(|n| amp * libm::sinf(TAU * freq * n as f32 / 48_000.0))
            .collect();
        let mut right = left.clone();
        for start in (0..len).step_by(256) {
            let end = (start + 256).min(len);
            let (lh, rh) = (&mut left[start..end], &mut right[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            eq.process(&mut block);
        }
        left
    }

    #[test]
    fn flat_settings_are_near_transparent() {
        let mut eq = ConsoleEq::new();
        eq.set_param(7, 0.0); // no drive
        eq.prepare(48_000.0, 256);
        let (gain, _) = run_tone(&mut eq, 1_000.0, 24_000);
        assert!((gain - 1.0).abs() < 0.05, "flat EQ should pass, gain {gain}");
    }

    #[test]
    fn mid_boost_lifts_center_frequency() {
        let mut eq = ConsoleEq::new();
        eq.set_param(3, 0.5); // mid around 1.26 kHz
        eq.set_param(2, 1.0); // +15 dB
        eq.prepare(48_000.0, 256);
        let (gain, _) = run_tone(&mut eq, 1_260.0, 24_000);
        assert!(gain > 3.0, "+15 dB bell should lift the tone, gain {gain}");
    }

    #[test]
    fn low_shelf_cut_attenuates_bass() {
        let mut eq = ConsoleEq::new();
        eq.set_param(0, 0.0); // -15 dB shelf
        eq.set_param(1, 0.3); // ~60 Hz
        eq.prepare(48_000.0, 256);
        let (gain, _) = run_tone(&mut eq, 40.0, 24_000);
        assert!(gain < 0.35, "40 Hz should be shelved down, gain {gain}");
    }

    #[test]
    fn console_types_color_differently() {
        let render = |type_norm: f32| {
            let mut eq = ConsoleEq::new();
            eq.set_param(7, 0.8);
            eq.set_param(8, type_norm);
            eq.prepare(48_000.0, 256);
            render_tone(&mut eq, 220.0, 0.6, 2_048)
        };
        let ssl = render(0.1);
        let api = render(0.3);
        let neve = render(0.6);
        let pultec = render(0.9);
        let differs = |a: &[f32], b: &[f32]| {
            a.iter().zip(b).any(|(x, y)| (x - y).abs() > 1e-4)
        };
        assert!(differs(&ssl, &api), "SSL and API should not match");
        assert!(differs(&api, &neve), "API and Neve should not match");
        assert!(differs(&neve, &pultec), "Neve and Pultec should not match");
    }

    #[test]
    fn vintage_switch_gates_the_drift() {
        let render = |vintage: f32| {
            let mut eq = ConsoleEq::new();
            eq.set_param(2, 1.0); // hot mid bell makes drift audible
            eq.set_param(4, 1.0);
            eq.set_param(9, vintage);
            eq.prepare(48_000.0, 256);
            render_tone(&mut eq, 1_260.0, 0.1, 4_096)
        };
        let identical = |a: &[f32], b: &[f32]| a.iter().zip(b).all(|(x, y)| x == y);
        assert!(
            identical(&render(0.0), &render(0.0)),
            "with vintage off, instances must match exactly"
        );
        assert!(
            !identical(&render(1.0), &render(1.0)),
            "with vintage on, instance tolerances must diverge"
        );
    }

    #[test]
    fn drift_stays_inside_tolerance() {
        let eq = ConsoleEq::new();
        for d in eq.drift {
            assert!((d - 1.0).abs() <= 0.02);
        }
    }

    #[test]
    fn reset_rerolls_drift() {
        let mut eq = ConsoleEq::new();
        let before = eq.drift;
        eq.reset();
        assert_ne!(before, eq.drift);
    }

    #[test]
    fn instances_differ() {
        let a = ConsoleEq::new();
        let b = ConsoleEq::new();
        assert_ne!(a.drift, b.drift);
    }

    #[test]
    fn heavy_drive_stays_bounded() {
        let mut eq = ConsoleEq::new();
        eq.set_param(7, 1.0);
        eq.set_param(8, 0.6); // Neve
        eq.set_param(2, 1.0);
        eq.prepare(48_000.0, 256);
        let out = render_tone(&mut eq, 220.0, 2.0, 4_096);
        assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 4.0));
    }
}
