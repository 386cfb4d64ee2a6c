//! Algorithmic impulse response synthesis.
//!
//! Rather than shipping sample libraries, the reverb synthesizes its
//! impulse responses from a small parametric model: a type-specific set
//! of early reflections, a stochastic late tail under an exponential
//! RT60 envelope, one-pole damping, an early/late balance tilt at 80 ms,
//! and optional reversal. Left and right run the same model from
//! different PRNG seeds so the tail is decorrelated.
//!
//! Synthesis is a control-path operation; it allocates and is never
//! called from `process`.

use libm::{cosf, expf, powf, sinf};
use marea_core::{OnePole, XorShift32, flush_denormal};

use core::f32::consts::{PI, TAU};

/// Floor for the damping cutoff. Full damping must stay audible as a
/// heavily low-passed tail, never collapse to silence.
pub const MIN_DAMPING_HZ: f32 = 200.0;
/// Cutoff with damping fully open.
pub const MAX_DAMPING_HZ: f32 = 20_000.0;
/// Early/late boundary for the tilt stage.
const EARLY_LATE_MS: f32 = 80.0;
/// Leading samples below this magnitude are trimmed.
const TRIM_THRESHOLD: f32 = 1e-4;

/// Impulse response family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrType {
    /// Concert hall, sparse early taps, 2.8 s nominal decay.
    Hall,
    /// Dense plate with sinusoidally modulated tail density, 1.8 s.
    Plate,
    /// Stairwell with periodic slap reflections, 1.2 s.
    Stairwell,
    /// Pad-like cloud with slow onset, 4.5 s.
    Cloud,
}

impl IrType {
    /// Select a family from the normalized type parameter (quartiles).
    pub fn from_norm(norm: f32) -> Self {
        match (norm.clamp(0.0, 1.0) * 4.0) as u32 {
            0 => IrType::Hall,
            1 => IrType::Plate,
            2 => IrType::Stairwell,
            _ => IrType::Cloud,
        }
    }

    /// Nominal decay time at size 1.0.
    pub fn base_seconds(&self) -> f32 {
        match self {
            IrType::Hall => 2.8,
            IrType::Plate => 1.8,
            IrType::Stairwell => 1.2,
            IrType::Cloud => 4.5,
        }
    }

}

/// Synthesis inputs. `size` scales the decay time (0.25 – 2.0), `damping`
/// is the normalized low-pass amount, `early_late` balances the first
/// 80 ms against the tail, `reverse` flips the envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrSpec {
    /// Impulse response family.
    pub ir_type: IrType,
    /// Decay scale in \[0.25, 2.0\].
    pub size: f32,
    /// Normalized damping in \[0, 1\].
    pub damping: f32,
    /// Early/late balance in \[0, 1\]; 0 favors the first 80 ms, 1 the
    /// tail, 0.5 is even.
    pub early_late: f32,
    /// Reversed envelope.
    pub reverse: bool,
}

/// A synthesized stereo impulse response.
#[derive(Debug, Clone)]
pub struct StereoIr {
    /// Left channel samples.
    pub left: Vec<f32>,
    /// Right channel samples.
    pub right: Vec<f32>,
}

/// Build a stereo impulse response for `spec` at `sample_rate`.
pub fn synthesize(spec: &IrSpec, sample_rate: f32) -> StereoIr {
    let size = spec.size.clamp(0.25, 2.0);
    let seconds = spec.ir_type.base_seconds() * size;
    let len = ((seconds * sample_rate) as usize).max(64);

    let left = synthesize_channel(spec, sample_rate, len, 0x1234_5678);
    let right = synthesize_channel(spec, sample_rate, len, 0x8765_4321);
    StereoIr { left, right }
}

fn synthesize_channel(spec: &IrSpec, sample_rate: f32, len: usize, seed: u32) -> Vec<f32> {
    let mut ir = vec![0.0f32; len];
    let mut rng = XorShift32::new(seed);
    let seconds = len as f32 / sample_rate;

    // Late tail: noise under an exponential envelope reaching -60 dB at
    // the nominal decay time.
    let decay_rate = 6.907_755 / seconds;
    for (n, s) in ir.iter_mut().enumerate() {
        let t = n as f32 / sample_rate;
        let mut env = expf(-decay_rate * t);
        match spec.ir_type {
            IrType::Plate => {
                // Sinusoidal density ripple gives the metallic shimmer.
                env *= 1.0 + 0.3 * sinf(TAU * 11.0 * t);
            }
            IrType::Cloud => {
                // Slow onset: the cloud swells in over ~150 ms.
                env *= (t / 0.15).min(1.0);
            }
            IrType::Hall | IrType::Stairwell => {}
        }
        *s = rng.next_bipolar() * env;
    }

    add_early_reflections(&mut ir, spec.ir_type, sample_rate, &mut rng);
    apply_tilt(&mut ir, spec.early_late, sample_rate);
    apply_damping(&mut ir, spec.damping, sample_rate);
    apply_edge_fade(&mut ir);

    if spec.reverse {
        ir.reverse();
        // Squared fade-in keeps the reversed swell from clicking.
        let fade = (len / 8).max(1);
        for (n, s) in ir.iter_mut().take(fade).enumerate() {
            let g = n as f32 / fade as f32;
            *s *= g * g;
        }
    }

    trim_and_normalize(ir)
}

fn add_early_reflections(ir: &mut [f32], ir_type: IrType, sample_rate: f32, rng: &mut XorShift32) {
    match ir_type {
        IrType::Hall => {
            // A handful of sparse reflections inside the first 60 ms.
            for _ in 0..8 {
                let t = 0.005 + rng.next_f32() * 0.055;
                let idx = (t * sample_rate) as usize;
                if idx < ir.len() {
                    let polarity = if rng.next_f32() > 0.5 { 1.0 } else { -1.0 };
                    ir[idx] += (0.3 + rng.next_f32() * 0.4) * polarity;
                }
            }
        }
        IrType::Stairwell => {
            // Periodic slap pattern, decaying flutter.
            let period = (0.012 * sample_rate) as usize;
            let mut gain = 0.8;
            let mut idx = period;
            while idx < ir.len() && gain > 0.02 {
                ir[idx] += gain * if rng.next_f32() > 0.5 { 1.0 } else { -1.0 };
                idx += period;
                gain *= 0.75;
            }
        }
        IrType::Plate | IrType::Cloud => {}
    }
}

fn apply_tilt(ir: &mut [f32], early_late: f32, sample_rate: f32) {
    let bal = early_late.clamp(0.0, 1.0);
    let early_gain = 1.0 + (1.0 - bal);
    let late_gain = 1.0 + bal;
    let boundary = (EARLY_LATE_MS * 1e-3 * sample_rate) as usize;
    for (n, s) in ir.iter_mut().enumerate() {
        *s *= if n < boundary { early_gain } else { late_gain };
    }
}

fn apply_damping(ir: &mut [f32], damping: f32, sample_rate: f32) {
    let cutoff = (MAX_DAMPING_HZ * (1.0 - damping.clamp(0.0, 1.0))).max(MIN_DAMPING_HZ);
    let coeff = OnePole::coeff_for(cutoff, sample_rate);
    let mut state = 0.0f32;
    for s in ir.iter_mut() {
        state = flush_denormal(*s + coeff * (state - *s));
        *s = state;
    }
}

/// cos² fade over the last 10 % so size truncation never clicks.
fn apply_edge_fade(ir: &mut [f32]) {
    let len = ir.len();
    let fade = (len / 10).max(1);
    for (k, s) in ir[len - fade..].iter_mut().enumerate() {
        let x = k as f32 / fade as f32;
        let g = cosf(0.5 * PI * x);
        *s *= g * g;
    }
}

fn trim_and_normalize(mut ir: Vec<f32>) -> Vec<f32> {
    // Trim leading silence so pre-delay stays honest.
    let start = ir
        .iter()
        .position(|s| s.abs() > TRIM_THRESHOLD)
        .unwrap_or(ir.len());
    ir.drain(..start);

    let peak = ir.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if ir.is_empty() || peak < 1e-9 || !peak.is_finite() {
        // Degenerate synthesis falls back to a unit impulse: the reverb
        // becomes a pass-through instead of going silent.
        return vec![1.0];
    }
    let norm = 1.0 / peak;
    for s in &mut ir {
        *s *= norm;
    }
    // Energy compensation: longer tails carry more total energy at equal
    // peak, so scale toward equal loudness.
    let energy: f32 = ir.iter().map(|s| s * s).sum();
    let loudness = powf(energy.max(1e-9), 0.25);
    let gain = (1.0 / loudness).min(1.0);
    for s in &mut ir {
        *s *= gain;
    }
    ir
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_spec(ir_type: IrType) -> IrSpec {
        IrSpec {
            ir_type,
            size: 1.0,
            damping: 0.3,
            early_late: 0.5,
            reverse: false,
        }
    }

    #[test]
    fn every_type_produces_audible_ir() {
        for ir_type in [IrType::Hall, IrType::Plate, IrType::Stairwell, IrType::Cloud] {
            let ir = synthesize(&default_spec(ir_type), 48_000.0);
            assert!(!ir.left.is_empty());
            assert!(!ir.right.is_empty());
            let energy: f32 = ir.left.iter().map(|s| s * s).sum();
            assert!(energy > 1e-4, "{ir_type:?} IR should carry energy");
            assert!(ir.left.iter().all(|s| s.is_finite()));
        }
    }

    #[test]
    fn full_damping_remains_audible() {
        let mut spec = default_spec(IrType::Hall);
        spec.damping = 1.0;
        let ir = synthesize(&spec, 48_000.0);
        let energy: f32 = ir.left.iter().map(|s| s * s).sum();
        assert!(energy > 1e-6, "damping 1.0 must not silence the tail");
    }

    #[test]
    fn size_scales_length() {
        let mut small = default_spec(IrType::Hall);
        small.size = 0.25;
        let mut big = default_spec(IrType::Hall);
        big.size = 2.0;
        let ir_small = synthesize(&small, 48_000.0);
        let ir_big = synthesize(&big, 48_000.0);
        assert!(ir_big.left.len() > ir_small.left.len() * 4);
    }

    #[test]
    fn channels_are_decorrelated() {
        let ir = synthesize(&default_spec(IrType::Hall), 48_000.0);
        let n = ir.left.len().min(ir.right.len());
        let mut dot = 0.0f64;
        let mut el = 0.0f64;
        let mut er = 0.0f64;
        for i in 0..n {
            dot += f64::from(ir.left[i] * ir.right[i]);
            el += f64::from(ir.left[i] * ir.left[i]);
            er += f64::from(ir.right[i] * ir.right[i]);
        }
        let corr = dot / (el.sqrt() * er.sqrt() + 1e-12);
        assert!(corr.abs() < 0.2, "L/R tails should decorrelate, corr {corr}");
    }

    #[test]
    fn reversed_ir_swells() {
        let mut spec = default_spec(IrType::Hall);
        spec.reverse = true;
        let ir = synthesize(&spec, 48_000.0);
        let n = ir.left.len();
        let head: f32 = ir.left[..n / 4].iter().map(|s| s * s).sum();
        let tail: f32 = ir.left[3 * n / 4..].iter().map(|s| s * s).sum();
        assert!(tail > head, "reversed envelope should grow toward the end");
    }

    #[test]
    fn early_late_balance_tilts_the_energy() {
        let boundary = (80.0e-3 * 48_000.0) as usize;
        let ratio_at = |bal: f32| {
            let mut spec = default_spec(IrType::Hall);
            spec.early_late = bal;
            let ir = synthesize(&spec, 48_000.0);
            let split = boundary.min(ir.left.len());
            let early: f32 = ir.left[..split].iter().map(|s| s * s).sum();
            let late: f32 = ir.left[split..].iter().map(|s| s * s).sum();
            early / late.max(1e-12)
        };
        let favors_early = ratio_at(0.0);
        let favors_late = ratio_at(1.0);
        assert!(
            favors_early > favors_late * 4.0,
            "balance 0 vs 1 should swing the early/late ratio: {favors_early} vs {favors_late}"
        );
    }

    #[test]
    fn type_quartiles() {
        assert_eq!(IrType::from_norm(0.0), IrType::Hall);
        assert_eq!(IrType::from_norm(0.3), IrType::Plate);
        assert_eq!(IrType::from_norm(0.6), IrType::Stairwell);
        assert_eq!(IrType::from_norm(1.0), IrType::Cloud);
    }
}
