//! 2× oversampling wrapper for waveshaping stages.
//!
//! Zero-stuff upsample → half-band FIR → nonlinearity at 2× rate →
//! half-band FIR → decimate. Running a saturator inside the wrapper
//! pushes its aliases above the audible band before they fold back.
//!
//! The half-band filter is a 31-tap symmetric FIR designed for -80 dB
//! stopband; every other tap is zero, which the convolution loop does not
//! bother to exploit (31 taps per sample is already cheap).

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

/// Half-band FIR taps: 31-tap Blackman-windowed sinc, cutoff at fs/4.
/// Center tap 0.5, even-offset taps identically zero, unity DC gain.
const HALFBAND_TAPS: [f32; 31] = [
    0.0, 0.0, 0.000_410, 0.0, -0.002_231, 0.0, 0.007_101, 0.0,
    -0.017_917, 0.0, 0.040_106, 0.0, -0.090_100, 0.0, 0.312_620, 0.5,
    0.312_620, 0.0, -0.090_100, 0.0, 0.040_106, 0.0, -0.017_917, 0.0,
    0.007_101, 0.0, -0.002_231, 0.0, 0.000_410, 0.0, 0.0,
];

#[derive(Debug, Clone)]
struct HalfbandFir {
    history: [f32; 31],
    pos: usize,
}

impl HalfbandFir {
    fn new() -> Self {
        Self {
            history: [0.0; 31],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.history[self.pos] = input;
        let mut acc = 0.0;
        let mut idx = self.pos;
        for &tap in &HALFBAND_TAPS {
            acc += tap * self.history[idx];
            idx = if idx == 0 { 30 } else { idx - 1 };
        }
        self.pos = (self.pos + 1) % 31;
        acc
    }

    fn clear(&mut self) {
        self.history = [0.0; 31];
        self.pos = 0;
    }
}

/// 2× oversampler. Call [`Oversampler2x::process_block`] with the
/// nonlinearity to run at the doubled rate.
#[derive(Debug, Clone)]
pub struct Oversampler2x {
    up: HalfbandFir,
    down: HalfbandFir,
    work: Vec<f32>,
}

impl Oversampler2x {
    /// Create an oversampler able to handle blocks up to `max_block`
    /// samples.
    pub fn new(max_block: usize) -> Self {
        Self {
            up: HalfbandFir::new(),
            down: HalfbandFir::new(),
            work: vec![0.0; max_block.max(1) * 2],
        }
    }

    /// Run `shaper` over `samples` at twice the sample rate, in place.
    ///
    /// The shaper sees interpolated samples; its output is band-limited
    /// back down before decimation.
    pub fn process_block(&mut self, samples: &mut [f32], mut shaper: impl FnMut(f32) -> f32) {
        debug_assert!(samples.len() * 2 <= self.work.len());
        // Upsample: zero-stuff with 2× gain to preserve amplitude, filter.
        for (n, &x) in samples.iter().enumerate() {
            self.work[2 * n] = self.up.process(2.0 * x);
            self.work[2 * n + 1] = self.up.process(0.0);
        }
        // Shape at 2× rate.
        for s in &mut self.work[..samples.len() * 2] {
            *s = shaper(*s);
        }
        // Filter and decimate.
        for (n, out) in samples.iter_mut().enumerate() {
            let a = self.down.process(self.work[2 * n]);
            let _ = self.down.process(self.work[2 * n + 1]);
            *out = a;
        }
    }

    /// Clear filter histories.
    pub fn reset(&mut self) {
        self.up.clear();
        self.down.clear();
    }

    /// Group delay through both half-band filters, in samples at the base
    /// rate.
    pub fn latency_samples(&self) -> usize {
        // Each 31-tap FIR delays 15 samples at its own rate; two passes at
        // 2× collapse to 15 samples at 1×.
        15
    }
}
