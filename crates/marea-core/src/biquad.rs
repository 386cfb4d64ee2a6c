//! Biquad filter and RBJ cookbook coefficient functions.
//!
//! Direct Form I second-order IIR. Coefficient functions follow the
//! Robert Bristow-Johnson Audio EQ Cookbook, extended with shelf slopes and
//! a proportional-Q peaking form for console-style EQ bands.

use core::f32::consts::PI;
use libm::{cosf, sinf, sqrtf};

use crate::math::db_to_linear;

/// Second-order IIR filter, Direct Form I.
///
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

/// Unnormalized biquad coefficients `(b0, b1, b2, a0, a1, a2)`.
pub type Coefficients = (f32, f32, f32, f32, f32, f32);

impl Biquad {
    /// Pass-through biquad (`y[n] = x[n]`).
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Install coefficients, normalizing by `a0`.
    pub fn set_coefficients(&mut self, (b0, b1, b2, a0, a1, a2): Coefficients) {
        let inv = 1.0 / a0;
        self.b0 = b0 * inv;
        self.b1 = b1 * inv;
        self.b2 = b2 * inv;
        self.a1 = a1 * inv;
        self.a2 = a2 * inv;
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }

    /// Clear filter history without touching coefficients.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

/// RBJ lowpass coefficients.
pub fn lowpass(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let omega = 2.0 * PI * frequency / sample_rate;
    let (sin_w, cos_w) = (sinf(omega), cosf(omega));
    let alpha = sin_w / (2.0 * q);

    (
        (1.0 - cos_w) / 2.0,
        1.0 - cos_w,
        (1.0 - cos_w) / 2.0,
        1.0 + alpha,
        -2.0 * cos_w,
        1.0 - alpha,
    )
}

/// RBJ highpass coefficients.
pub fn highpass(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let omega = 2.0 * PI * frequency / sample_rate;
    let (sin_w, cos_w) = (sinf(omega), cosf(omega));
    let alpha = sin_w / (2.0 * q);

    (
        (1.0 + cos_w) / 2.0,
        -(1.0 + cos_w),
        (1.0 + cos_w) / 2.0,
        1.0 + alpha,
        -2.0 * cos_w,
        1.0 - alpha,
    )
}

/// RBJ peaking EQ coefficients (`gain_db` boost/cut at `frequency`).
pub fn peaking(frequency: f32, q: f32, gain_db: f32, sample_rate: f32) -> Coefficients {
    let a = sqrtf(db_to_linear(gain_db));
    let omega = 2.0 * PI * frequency / sample_rate;
    let (sin_w, cos_w) = (sinf(omega), cosf(omega));
    let alpha = sin_w / (2.0 * q);

    (
        1.0 + alpha * a,
        -2.0 * cos_w,
        1.0 - alpha * a,
        1.0 + alpha / a,
        -2.0 * cos_w,
        1.0 - alpha / a,
    )
}

/// Peaking EQ with proportional Q: the effective Q widens with boost/cut,
/// `q_eff = q * (1 + |gain_db| / 15)`, the classic analog-console bell.
pub fn peaking_proportional_q(
    frequency: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,
) -> Coefficients {
    let q_eff = q * (1.0 + gain_db.abs() / 15.0);
    peaking(frequency, q_eff, gain_db, sample_rate)
}

/// RBJ low shelf with shelf slope `s` (0.7 for gentle program EQ).
pub fn low_shelf(frequency: f32, s: f32, gain_db: f32, sample_rate: f32) -> Coefficients {
    let a = sqrtf(db_to_linear(gain_db));
    let omega = 2.0 * PI * frequency / sample_rate;
    let (sin_w, cos_w) = (sinf(omega), cosf(omega));
    let alpha = sin_w / 2.0 * sqrtf((a + 1.0 / a) * (1.0 / s - 1.0) + 2.0);
    let two_sqrt_a_alpha = 2.0 * sqrtf(a) * alpha;

    (
        a * ((a + 1.0) - (a - 1.0) * cos_w + two_sqrt_a_alpha),
        2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w),
        a * ((a + 1.0) - (a - 1.0) * cos_w - two_sqrt_a_alpha),
        (a + 1.0) + (a - 1.0) * cos_w + two_sqrt_a_alpha,
        -2.0 * ((a - 1.0) + (a + 1.0) * cos_w),
        (a + 1.0) + (a - 1.0) * cos_w - two_sqrt_a_alpha,
    )
}

/// RBJ high shelf with shelf slope `s`.
pub fn high_shelf(frequency: f32, s: f32, gain_db: f32, sample_rate: f32) -> Coefficients {
    let a = sqrtf(db_to_linear(gain_db));
    let omega = 2.0 * PI * frequency / sample_rate;
    let (sin_w, cos_w) = (sinf(omega), cosf(omega));
    let alpha = sin_w / 2.0 * sqrtf((a + 1.0 / a) * (1.0 / s - 1.0) + 2.0);
    let two_sqrt_a_alpha = 2.0 * sqrtf(a) * alpha;

    (
        a * ((a + 1.0) + (a - 1.0) * cos_w + two_sqrt_a_alpha),
        -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w),
        a * ((a + 1.0) + (a - 1.0) * cos_w - two_sqrt_a_alpha),
        (a + 1.0) - (a - 1.0) * cos_w + two_sqrt_a_alpha,
        2.0 * ((a - 1.0) - (a + 1.0) * cos_w),
        (a + 1.0) - (a - 1.0) * cos_w - two_sqrt_a_alpha,
    )
}
