//! Uniform-partition FFT convolution.
//!
//! The impulse response is chopped into 256-sample partitions, each held
//! in the frequency domain. Input is processed overlap-save in 256-sample
//! blocks: one forward FFT per block, a complex multiply-accumulate over
//! the frequency delay line, one inverse FFT. Cost per sample is
//! O(K + log N) for K partitions instead of O(IR length), and latency is
//! one partition.
//!
//! Partitioning (`set_ir`) allocates and belongs to the control path;
//! `process_sample` only touches preallocated buffers.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Partition size in samples.
pub const PARTITION: usize = 256;
/// FFT size: two partitions for linear (not circular) convolution.
const FFT_SIZE: usize = 2 * PARTITION;

/// Single-channel uniform-partition overlap-save convolver.
pub struct Convolver {
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    /// IR partition spectra, one per partition.
    ir_spectra: Vec<Vec<Complex<f32>>>,
    /// Frequency delay line of past input spectra, ring-indexed.
    input_spectra: Vec<Vec<Complex<f32>>>,
    fdl_pos: usize,
    /// Sliding 2P input frame.
    input_frame: Vec<f32>,
    accum: Vec<Complex<f32>>,
    block_in: Vec<f32>,
    block_out: Vec<f32>,
    fill: usize,
}

impl Convolver {
    /// Create an empty convolver (acts as silence until `set_ir`).
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let ifft = planner.plan_fft_inverse(FFT_SIZE);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());
        Self {
            fft,
            ifft,
            scratch: vec![Complex::default(); scratch_len],
            ir_spectra: Vec::new(),
            input_spectra: Vec::new(),
            fdl_pos: 0,
            input_frame: vec![0.0; FFT_SIZE],
            accum: vec![Complex::default(); FFT_SIZE],
            block_in: vec![0.0; PARTITION],
            block_out: vec![0.0; PARTITION],
            fill: 0,
        }
    }

    /// Partition `ir` into frequency-domain blocks. Allocates; call from
    /// the control path only.
    pub fn set_ir(&mut self, ir: &[f32]) {
        self.ir_spectra.clear();
        for chunk in ir.chunks(PARTITION) {
            let mut spectrum = vec![Complex::default(); FFT_SIZE];
            for (s, &x) in spectrum.iter_mut().zip(chunk) {
                s.re = x;
            }
            self.fft.process_with_scratch(&mut spectrum, &mut self.scratch);
            self.ir_spectra.push(spectrum);
        }
        self.input_spectra = vec![vec![Complex::default(); FFT_SIZE]; self.ir_spectra.len().max(1)];
        self.fdl_pos = 0;
        self.clear();
    }

    /// Number of IR partitions currently loaded.
    pub fn partitions(&self) -> usize {
        self.ir_spectra.len()
    }

    /// Latency through the block convolution: one full partition, as the
    /// `impulse_ir_is_delay_only` test pins down.
    pub fn latency_samples(&self) -> usize {
        PARTITION
    }

    /// Push one input sample, pull one convolved sample.
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let output = self.block_out[self.fill];
        self.block_in[self.fill] = input;
        self.fill += 1;
        if self.fill == PARTITION {
            self.fill = 0;
            self.run_block();
        }
        output
    }

    fn run_block(&mut self) {
        if self.ir_spectra.is_empty() {
            self.block_out.fill(0.0);
            return;
        }

        // Overlap-save: slide the 2P frame, FFT it into the delay line.
        self.input_frame.copy_within(PARTITION.., 0);
        self.input_frame[PARTITION..].copy_from_slice(&self.block_in);

        let k = self.input_spectra.len();
        self.fdl_pos = (self.fdl_pos + k - 1) % k;
        let slot = &mut self.input_spectra[self.fdl_pos];
        for (s, &x) in slot.iter_mut().zip(&self.input_frame) {
            *s = Complex::new(x, 0.0);
        }
        self.fft.process_with_scratch(slot, &mut self.scratch);

        // Multiply-accumulate across all partitions.
        self.accum.fill(Complex::default());
        for (p, ir_spec) in self.ir_spectra.iter().enumerate() {
            let in_spec = &self.input_spectra[(self.fdl_pos + p) % k];
            for ((a, &h), &x) in self.accum.iter_mut().zip(ir_spec).zip(in_spec) {
                *a += h * x;
            }
        }

        self.ifft.process_with_scratch(&mut self.accum, &mut self.scratch);
        // Overlap-save keeps only the last P samples; 1/N for the
        // unnormalized inverse.
        let norm = 1.0 / FFT_SIZE as f32;
        for (out, a) in self.block_out.iter_mut().zip(&self.accum[PARTITION..]) {
            *out = a.re * norm;
        }
    }

    /// Zero all streaming state, keeping the loaded IR.
    pub fn clear(&mut self) {
        for s in &mut self.input_spectra {
            s.fill(Complex::default());
        }
        self.input_frame.fill(0.0);
        self.accum.fill(Complex::default());
        self.block_in.fill(0.0);
        self.block_out.fill(0.0);
        self.fill = 0;
    }
}

impl Default for Convolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convolve_direct(input: &[f32], ir: &[f32], len: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; len];
        for (n, o) in out.iter_mut().enumerate() {
            for (k, &h) in ir.iter().enumerate() {
                if n >= k && n - k < input.len() {
                    *o += h * input[n - k];
                }
            }
        }
        out
    }

    fn run(conv: &mut Convolver, input: &[f32], len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| conv.process_sample(if n < input.len() { input[n] } else { 0.0 }))
            .collect()
    }

    #[test]
    fn matches_direct_convolution() {
        let ir: Vec<f32> = (0..700).map(|n| libm::sinf(n as f32 * 0.1) * 0.01).collect();
        let input: Vec<f32> = (0..300).map(|n| libm::cosf(n as f32 * 0.37)).collect();

        let mut conv = Convolver::new();
        conv.set_ir(&ir);

        let len = 1_500;
        let out = run(&mut conv, &input, len + PARTITION);
        let expect = convolve_direct(&input, &ir, len);

        // Block convolver output lags by one partition.
        let mut max_err = 0.0f32;
        for n in 0..len {
            max_err = max_err.max((out[n + PARTITION] - expect[n]).abs());
        }
        assert!(max_err < 1e-3, "partitioned vs direct error {max_err}");
    }

    #[test]
    fn impulse_ir_is_delay_only() {
        let mut conv = Convolver::new();
        conv.set_ir(&[1.0]);
        let mut input = vec![0.0f32; 1_024];
        input[10] = 1.0;
        let out = run(&mut conv, &input, 1_024);
        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .unwrap();
        assert_eq!(peak.0, 10 + PARTITION);
        assert!((peak.1 - 1.0).abs() < 1e-4);
    }

    #[test]
    fn empty_ir_outputs_silence() {
        let mut conv = Convolver::new();
        let out = run(&mut conv, &[1.0, 1.0, 1.0], 600);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn clear_flushes_tail() {
        let mut conv = Convolver::new();
        conv.set_ir(&vec![0.1; 2_000]);
        for _ in 0..4_096 {
            conv.process_sample(1.0);
        }
        conv.clear();
        let out = run(&mut conv, &[], 1_024);
        assert!(out.iter().all(|&s| s.abs() < 1e-6));
    }
}
