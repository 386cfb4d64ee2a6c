//! Math utilities shared by the engines.
//!
//! Level conversions, saturation curves, denormal squashing, and the
//! wet/dry crossfade. Everything here is allocation-free and `no_std` safe.
//!
//! # Saturation curves
//!
//! | Function | Character | Used by |
//! |----------|-----------|---------|
//! | [`soft_clip`] | Smooth tanh | output guards, SSL console model |
//! | [`tape_saturate`] | Asymmetric tanh + 2nd harmonic | tape echo, tape saturation |
//! | [`foldback`] | Wavefolding | wavefolder engine |

use libm::{expf, logf, tanhf};

/// Hard ceiling applied to every engine's output.
///
/// Samples never leave `process()` with magnitude above this. The value is
/// deliberately above unity so that hot-but-legal transients survive; the
/// host's limiter owns true peak control.
pub const SAFE_CLIP_LIMIT: f32 = 4.0;

/// Magnitude below which feedback state is squashed to exactly zero.
pub const DENORMAL_FLOOR: f32 = 1e-15;

/// Convert decibels to linear gain.
///
/// 0 dB → 1.0, -6 dB → ~0.5, +6 dB → ~2.0.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels. Input is floored at 1e-10.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Squash denormal-range values to zero.
///
/// Every feedback loop in the workspace routes its state through this, so
/// decaying tails hit exactly zero instead of lingering in the denormal
/// range where many CPUs stall.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < DENORMAL_FLOOR { 0.0 } else { x }
}

/// Replace NaN/Inf with zero and clamp to [`SAFE_CLIP_LIMIT`].
///
/// The last line of defense on the output path; the contract guarantees no
/// non-finite sample ever leaves an engine.
#[inline]
pub fn sanitize(x: f32) -> f32 {
    if x.is_finite() {
        x.clamp(-SAFE_CLIP_LIMIT, SAFE_CLIP_LIMIT)
    } else {
        0.0
    }
}

/// Smooth tanh soft clip, odd harmonics only.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Hard clip to ±threshold.
#[inline]
pub fn hard_clip(x: f32, threshold: f32) -> f32 {
    x.clamp(-threshold, threshold)
}

/// Tape-style saturation: asymmetric tanh plus a second-harmonic term.
///
/// The positive swing drives harder than the negative (k = 2.0 vs 1.5),
/// modeling transformer bias asymmetry, and a small `x²·sign(x)` component
/// adds second-harmonic warmth proportional to drive.
///
/// For any bounded input this is bounded: the tanh term is < 1/(1+0.5·drive)
/// in magnitude and the harmonic term is explicitly limited by the drive
/// scale. This bound is what keeps high-feedback echo loops stable.
#[inline]
pub fn tape_saturate(x: f32, drive: f32) -> f32 {
    let k = if x >= 0.0 { 2.0 } else { 1.5 };
    let mut y = tanhf(x * (1.0 + k * drive)) / (1.0 + 0.5 * drive);
    y += x * x * sign(x) * drive * 0.05;
    y
}

/// Foldback distortion: reflect the signal at ±threshold instead of clipping.
#[inline]
pub fn foldback(x: f32, threshold: f32) -> f32 {
    let mut y = x;
    // Bounded iteration instead of recursion; four folds cover any sane drive.
    for _ in 0..4 {
        if y > threshold {
            y = 2.0 * threshold - y;
        } else if y < -threshold {
            y = -2.0 * threshold - y;
        } else {
            break;
        }
    }
    y.clamp(-threshold, threshold)
}

/// Sign of x as ±1.0 (0.0 input gives +1.0).
#[inline]
fn sign(x: f32) -> f32 {
    if x < 0.0 { -1.0 } else { 1.0 }
}

/// Linear interpolation between `a` (t = 0) and `b` (t = 1).
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Linear wet/dry crossfade: `dry·(1-mix) + wet·mix`.
#[inline]
pub fn wet_dry_mix(dry: f32, wet: f32, mix: f32) -> f32 {
    dry * (1.0 - mix) + wet * mix
}

/// Encode a stereo pair to mid/side. `mid = (l+r)/2`, `side = (l-r)/2`.
#[inline]
pub fn ms_encode(l: f32, r: f32) -> (f32, f32) {
    ((l + r) * 0.5, (l - r) * 0.5)
}

/// Decode mid/side back to stereo.
#[inline]
pub fn ms_decode(mid: f32, side: f32) -> (f32, f32) {
    (mid + side, mid - side)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_round_trip() {
        for &db in &[-60.0, -12.0, 0.0, 6.0, 12.0] {
            let rt = linear_to_db(db_to_linear(db));
            assert!((rt - db).abs() < 0.01, "round trip failed for {db}: {rt}");
        }
    }

    #[test]
    fn flush_denormal_squashes_tiny() {
        assert_eq!(flush_denormal(1e-20), 0.0);
        assert_eq!(flush_denormal(-1e-16), 0.0);
        assert_eq!(flush_denormal(1e-10), 1e-10);
        assert_eq!(flush_denormal(0.5), 0.5);
    }

    #[test]
    fn sanitize_kills_non_finite() {
        assert_eq!(sanitize(f32::NAN), 0.0);
        assert_eq!(sanitize(f32::INFINITY), 0.0);
        assert_eq!(sanitize(100.0), SAFE_CLIP_LIMIT);
        assert_eq!(sanitize(-100.0), -SAFE_CLIP_LIMIT);
        assert_eq!(sanitize(0.25), 0.25);
    }

    #[test]
    fn tape_saturate_bounded() {
        for i in -100..=100 {
            let x = i as f32 * 0.05; // [-5, 5]
            for &drive in &[0.0, 0.5, 1.0] {
                let y = tape_saturate(x, drive);
                assert!(y.abs() < 3.0, "tape_saturate({x}, {drive}) = {y}");
            }
        }
    }

    #[test]
    fn tape_saturate_asymmetric() {
        let pos = tape_saturate(0.5, 1.0);
        let neg = tape_saturate(-0.5, 1.0);
        assert!(
            (pos + neg).abs() > 1e-4,
            "saturation should be asymmetric: {pos} vs {neg}"
        );
    }

    #[test]
    fn foldback_reflects() {
        assert!((foldback(1.5, 1.0) - 0.5).abs() < 1e-6);
        assert!((foldback(-1.5, 1.0) + 0.5).abs() < 1e-6);
        assert_eq!(foldback(0.5, 1.0), 0.5);
    }

    #[test]
    fn ms_round_trip() {
        let (m, s) = ms_encode(0.8, -0.2);
        let (l, r) = ms_decode(m, s);
        assert!((l - 0.8).abs() < 1e-6);
        assert!((r + 0.2).abs() < 1e-6);
    }
}
