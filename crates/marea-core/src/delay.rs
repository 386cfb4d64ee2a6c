//! Fractional delay line.
//!
//! A heap-allocated circular buffer with interpolated reads. The buffer is
//! sized once (at engine `prepare`) and never reallocates, so reads and
//! writes are real-time safe.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

/// Interpolation mode for fractional reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Truncate to the nearest stored sample.
    None,
    /// Two-point linear interpolation.
    #[default]
    Linear,
    /// Four-point cubic Lagrange; best for modulated reads.
    Cubic,
}

/// Circular-buffer delay line with fractional-position reads.
///
/// ```rust
/// use marea_core::FractionalDelay;
///
/// let mut delay = FractionalDelay::new(4800);
/// delay.write(1.0);
/// let _tap = delay.read(10.5); // fractional position, interpolated
/// ```
#[derive(Debug, Clone)]
pub struct FractionalDelay {
    buffer: Vec<f32>,
    write_pos: usize,
    interpolation: Interpolation,
}

impl FractionalDelay {
    /// Create a delay line holding `capacity` samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "delay capacity must be > 0");
        Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
            interpolation: Interpolation::Linear,
        }
    }

    /// Create a delay line sized for `max_seconds` at `sample_rate`.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Self {
        Self::new((sample_rate * max_seconds) as usize + 1)
    }

    /// Select the interpolation mode for reads.
    pub fn set_interpolation(&mut self, interp: Interpolation) {
        self.interpolation = interp;
    }

    /// Read at `delay_samples` behind the write head (clamped to capacity).
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.max(0.0).min((len - 1) as f32);
        let delay_int = delay as usize;
        let frac = delay - delay_int as f32;
        let read_pos = (self.write_pos + len - delay_int - 1) % len;

        match self.interpolation {
            Interpolation::None => self.buffer[read_pos],
            Interpolation::Linear => {
                let next = (read_pos + len - 1) % len;
                let a = self.buffer[read_pos];
                let b = self.buffer[next];
                a + (b - a) * frac
            }
            Interpolation::Cubic => {
                let p0 = (read_pos + 1) % len;
                let p1 = read_pos;
                let p2 = (read_pos + len - 1) % len;
                let p3 = (read_pos + len - 2) % len;

                let y0 = self.buffer[p0];
                let y1 = self.buffer[p1];
                let y2 = self.buffer[p2];
                let y3 = self.buffer[p3];

                let t = frac;
                let a0 = y3 - y2 - y0 + y1;
                let a1 = y0 - y1 - a0;
                let a2 = y2 - y0;
                ((a0 * t + a1) * t + a2) * t + y1
            }
        }
    }

    /// Store a sample and advance the write head.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Read then write in one call.
    #[inline]
    pub fn read_write(&mut self, sample: f32, delay_samples: f32) -> f32 {
        let out = self.read(delay_samples);
        self.write(sample);
        out
    }

    /// Zero the buffer.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Maximum delay in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_delay() {
        let mut delay = FractionalDelay::new(16);
        for i in 1..=6 {
            delay.write(i as f32);
        }
        assert_eq!(delay.read(3.0), 3.0);
    }

    #[test]
    fn linear_interpolation_midpoint() {
        let mut delay = FractionalDelay::new(16);
        delay.write(0.0);
        delay.write(1.0);
        delay.write(2.0);
        delay.write(3.0);
        let out = delay.read(1.5);
        assert!((out - 1.5).abs() < 1e-6, "expected 1.5, got {out}");
    }

    #[test]
    fn wraps_cleanly() {
        let mut delay = FractionalDelay::new(4);
        for i in 1..=5 {
            delay.write(i as f32);
        }
        assert_eq!(delay.read(3.0), 2.0);
    }

    #[test]
    fn cubic_tracks_smooth_signal() {
        let mut delay = FractionalDelay::new(64);
        delay.set_interpolation(Interpolation::Cubic);
        for i in 0..32 {
            delay.write(libm::sinf(i as f32 * core::f32::consts::TAU / 32.0));
        }
        let true_val = libm::sinf(25.5 * core::f32::consts::TAU / 32.0);
        let got = delay.read(5.5);
        assert!((got - true_val).abs() < 0.01, "cubic error too large: {got} vs {true_val}");
    }

    #[test]
    fn clear_zeroes() {
        let mut delay = FractionalDelay::new(8);
        delay.write(1.0);
        delay.clear();
        assert_eq!(delay.read(1.0), 0.0);
    }

    #[test]
    #[should_panic]
    fn zero_capacity_panics() {
        let _ = FractionalDelay::new(0);
    }
}
