//! Streaming STFT with overlap-add resynthesis.
//!
//! Hann analysis and synthesis windows at 75 % overlap (hop = N/4), which
//! satisfies COLA with a constant window-power sum of 1.5. The core
//! collects hop-sized input chunks, runs forward FFT, hands the
//! non-negative-frequency bins to a caller-supplied closure, mirrors the
//! conjugate half, and overlap-adds the inverse transform. End-to-end
//! latency is one window.
//!
//! FFT plans come from `rustfft` and are created once per `prepare`;
//! `process_sample` only touches preallocated buffers.

use core::f32::consts::TAU;
use std::sync::Arc;

use libm::cosf;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Smallest supported FFT size.
pub const MIN_FFT_SIZE: usize = 512;
/// Largest supported FFT size.
pub const MAX_FFT_SIZE: usize = 4_096;

/// One channel of streaming STFT analysis/resynthesis.
pub struct StftCore {
    fft_size: usize,
    hop: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    frame: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    ola: Vec<f32>,
    hop_in: Vec<f32>,
    hop_out: Vec<f32>,
    fill: usize,
}

impl StftCore {
    /// Create a core for `fft_size` (clamped to a supported power of two).
    pub fn new(fft_size: usize) -> Self {
        let fft_size = clamp_fft_size(fft_size);
        let hop = fft_size / 4;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let ifft = planner.plan_fft_inverse(fft_size);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());

        let window = (0..fft_size)
            .map(|n| 0.5 * (1.0 - cosf(TAU * n as f32 / fft_size as f32)))
            .collect();

        Self {
            fft_size,
            hop,
            window,
            fft,
            ifft,
            scratch: vec![Complex::default(); scratch_len],
            frame: vec![0.0; fft_size],
            spectrum: vec![Complex::default(); fft_size],
            ola: vec![0.0; fft_size + fft_size / 4],
            hop_in: vec![0.0; hop],
            hop_out: vec![0.0; hop],
            fill: 0,
        }
    }

    /// FFT size in samples.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Hop size in samples (N/4).
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Processing latency in samples (one window).
    pub fn latency_samples(&self) -> usize {
        self.fft_size
    }

    /// Center frequency of `bin` in Hz.
    pub fn bin_frequency(&self, bin: usize, sample_rate: f32) -> f32 {
        bin as f32 * sample_rate / self.fft_size as f32
    }

    /// Push one sample, pull one (delayed) sample. `handler` runs once per
    /// hop over bins `0..=N/2`; the conjugate half is reconstructed
    /// afterwards, so the output stays real.
    #[inline]
    pub fn process_sample(
        &mut self,
        input: f32,
        handler: &mut impl FnMut(&mut [Complex<f32>]),
    ) -> f32 {
        let output = self.hop_out[self.fill];
        self.hop_in[self.fill] = input;
        self.fill += 1;
        if self.fill == self.hop {
            self.fill = 0;
            self.run_frame(handler);
        }
        output
    }

    fn run_frame(&mut self, handler: &mut impl FnMut(&mut [Complex<f32>])) {
        let n = self.fft_size;
        let hop = self.hop;

        // Slide the analysis frame and append the new hop.
        self.frame.copy_within(hop.., 0);
        self.frame[n - hop..].copy_from_slice(&self.hop_in);

        for ((s, &x), &w) in self.spectrum.iter_mut().zip(&self.frame).zip(&self.window) {
            *s = Complex::new(x * w, 0.0);
        }
        self.fft.process_with_scratch(&mut self.spectrum, &mut self.scratch);

        handler(&mut self.spectrum[..=n / 2]);

        // Hermitian mirror keeps the inverse transform real.
        self.spectrum[0].im = 0.0;
        self.spectrum[n / 2].im = 0.0;
        for i in 1..n / 2 {
            self.spectrum[n - i] = self.spectrum[i].conj();
        }
        self.ifft.process_with_scratch(&mut self.spectrum, &mut self.scratch);

        // Synthesis window + COLA power compensation (sum of Hann² at
        // 75 % overlap is 1.5), and 1/N for the unnormalized inverse.
        let norm = 1.0 / (1.5 * n as f32);
        for ((acc, s), &w) in self.ola.iter_mut().zip(&self.spectrum).zip(&self.window) {
            *acc += s.re * w * norm;
        }

        self.hop_out.copy_from_slice(&self.ola[..hop]);
        self.ola.copy_within(hop.., 0);
        let tail = self.ola.len() - hop;
        self.ola[tail..].fill(0.0);
    }

    /// Zero all streaming state.
    pub fn reset(&mut self) {
        self.frame.fill(0.0);
        self.ola.fill(0.0);
        self.hop_in.fill(0.0);
        self.hop_out.fill(0.0);
        self.fill = 0;
    }
}

/// Clamp to the supported power-of-two range.
pub fn clamp_fft_size(requested: usize) -> usize {
    let clamped = requested.clamp(MIN_FFT_SIZE, MAX_FFT_SIZE);
    clamped.next_power_of_two().min(MAX_FFT_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fft_size_clamped_to_pow2_range() {
        assert_eq!(clamp_fft_size(0), MIN_FFT_SIZE);
        assert_eq!(clamp_fft_size(1_000), 1_024);
        assert_eq!(clamp_fft_size(100_000), MAX_FFT_SIZE);
        assert_eq!(clamp_fft_size(2_048), 2_048);
    }

    #[test]
    fn identity_handler_reconstructs_input() {
        let mut core = StftCore::new(512);
        let latency = core.latency_samples();
        let total = latency + 2_048;
        let mut handler = |_bins: &mut [Complex<f32>]| {};

        let mut max_err = 0.0f32;
        let mut history = vec![0.0f32; total];
        for (n, slot) in history.iter_mut().enumerate() {
            *slot = libm::sinf(TAU * 440.0 * n as f32 / 48_000.0) * 0.7;
        }
        let mut outputs = Vec::with_capacity(total);
        for &x in &history {
            outputs.push(core.process_sample(x, &mut handler));
        }
        // After the warm-up window, output equals input delayed by latency.
        for n in latency + 512..total {
            max_err = max_err.max((outputs[n] - history[n - latency]).abs());
        }
        assert!(max_err < 1e-3, "reconstruction error {max_err}");
    }

    #[test]
    fn zeroed_bins_silence_output() {
        let mut core = StftCore::new(512);
        let mut handler = |bins: &mut [Complex<f32>]| {
            for b in bins {
                *b = Complex::default();
            }
        };
        let mut peak = 0.0f32;
        for n in 0..4_096 {
            let x = libm::sinf(TAU * 1_000.0 * n as f32 / 48_000.0);
            peak = peak.max(core.process_sample(x, &mut handler).abs());
        }
        assert!(peak < 1e-6);
    }

    #[test]
    fn reset_clears_tail() {
        let mut core = StftCore::new(512);
        let mut handler = |_bins: &mut [Complex<f32>]| {};
        for _ in 0..1_024 {
            core.process_sample(1.0, &mut handler);
        }
        core.reset();
        let out = core.process_sample(0.0, &mut handler);
        assert_eq!(out, 0.0);
    }
}
