//! Spectral gate.
//!
//! STFT-domain noise gate: every bin carries its own envelope follower,
//! and bins whose envelope sits below threshold are tapered down by
//! `(env / thr)^(ratio · k)` instead of hard-muted, which avoids the
//! musical-noise sputter of binary masks. A frequency range confines the
//! gate so it can, say, clean hiss above 6 kHz while leaving the body of
//! the signal untouched.
//!
//! # Parameters
//!
//! | Index | Name      | Mapping                                   |
//! |-------|-----------|-------------------------------------------|
//! | 0     | Threshold | -80 dB – 0 dB                             |
//! | 1     | Ratio     | taper exponent scale                      |
//! | 2     | Attack    | 1 ms – 100 ms (per-bin envelope)          |
//! | 3     | Release   | 10 ms – 1000 ms                           |
//! | 4     | Low       | gate range lower bound, 20 Hz – 20 kHz log |
//! | 5     | High      | gate range upper bound, 20 Hz – 20 kHz log |
//! | 6     | Mix       | dry/wet (dry is latency-compensated)      |
//! | 7     | Window    | FFT size {512, 1024, 2048, 4096}, latched at prepare |
//!
//! Latency is one FFT window; the dry path runs through a matching delay
//! so mix blending stays phase-coherent.

use libm::{expf, powf};
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, SmoothedParam, StereoBlock, db_to_linear,
    wet_dry_mix,
};
use rustfft::num_complex::Complex;

use crate::ids;
use crate::stft::{StftCore, clamp_fft_size};

const PARAM_COUNT: usize = 8;
const MIX_PARAM: usize = 6;

/// Taper exponent scale applied on top of the ratio parameter.
const TAPER_K: f32 = 2.0;

/// Map a normalized value onto 20 Hz – 20 kHz logarithmically.
fn norm_to_freq(norm: f32) -> f32 {
    20.0 * powf(1_000.0, norm)
}

struct GateChannel {
    core: StftCore,
    envelopes: Vec<f32>,
    dry: Vec<f32>,
    dry_pos: usize,
}

impl GateChannel {
    fn new(fft_size: usize) -> Self {
        let core = StftCore::new(fft_size);
        let bins = core.fft_size() / 2 + 1;
        let latency = core.latency_samples();
        Self {
            core,
            envelopes: vec![0.0; bins],
            dry: vec![0.0; latency],
            dry_pos: 0,
        }
    }

    fn reset(&mut self) {
        self.core.reset();
        self.envelopes.fill(0.0);
        self.dry.fill(0.0);
        self.dry_pos = 0;
    }
}

/// STFT-domain gate (see module docs for the parameter map).
pub struct SpectralGate {
    sample_rate: f32,
    threshold: SmoothedParam,
    ratio: SmoothedParam,
    attack: SmoothedParam,
    release: SmoothedParam,
    low: SmoothedParam,
    high: SmoothedParam,
    mix: SmoothedParam,
    window_norm: f32,
    left: GateChannel,
    right: GateChannel,
}

impl SpectralGate {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            sample_rate,
            threshold: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            ratio: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            attack: SmoothedParam::with_config(0.1, sample_rate, 20.0),
            release: SmoothedParam::with_config(0.3, sample_rate, 20.0),
            low: SmoothedParam::with_config(0.0, sample_rate, 20.0),
            high: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            mix: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            window_norm: 0.33, // 1024
            left: GateChannel::new(1_024),
            right: GateChannel::new(1_024),
        }
    }

    fn requested_fft_size(&self) -> usize {
        let sizes = [512usize, 1_024, 2_048, 4_096];
        let idx = ((self.window_norm * sizes.len() as f32) as usize).min(sizes.len() - 1);
        clamp_fft_size(sizes[idx])
    }
}

impl Default for SpectralGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for SpectralGate {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        let fft_size = self.requested_fft_size();
        self.left = GateChannel::new(fft_size);
        self.right = GateChannel::new(fft_size);
        for p in [
            &mut self.threshold,
            &mut self.ratio,
            &mut self.attack,
            &mut self.release,
            &mut self.low,
            &mut self.high,
            &mut self.mix,
        ] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        let sr = self.sample_rate;
        let hop = self.left.core.hop();
        let frame_rate = sr / hop as f32;

        for (l, r) in block.frames_mut() {
            let thr_db = -80.0 + self.threshold.advance() * 80.0;
            let thr = db_to_linear(thr_db);
            let exponent = (self.ratio.advance() * TAPER_K * 4.0).max(0.1);
            let attack_ms = 1.0 + self.attack.advance() * 99.0;
            let release_ms = 10.0 + self.release.advance() * 990.0;
            let low_hz = norm_to_freq(self.low.advance());
            let high_hz = norm_to_freq(self.high.advance()).max(low_hz);
            let mix = self.mix.advance();

            let atk = expf(-1.0 / (attack_ms * 1e-3 * frame_rate));
            let rel = expf(-1.0 / (release_ms * 1e-3 * frame_rate));

            for (channel, sample) in [(&mut self.left, l), (&mut self.right, r)] {
                let GateChannel {
                    core,
                    envelopes,
                    dry,
                    dry_pos,
                } = channel;
                let fft_size = core.fft_size();
                let mut handler = |bins: &mut [Complex<f32>]| {
                    for (i, (bin, env)) in bins.iter_mut().zip(envelopes.iter_mut()).enumerate() {
                        // Frame-normalized magnitude so thresholds in dB
                        // line up with time-domain level.
                        let mag = bin.norm() * 2.0 / fft_size as f32;
                        let coeff = if mag > *env { atk } else { rel };
                        *env = mag + coeff * (*env - mag);

                        let freq = i as f32 * sr / fft_size as f32;
                        if freq < low_hz || freq > high_hz {
                            continue;
                        }
                        if *env < thr {
                            let gain = powf((*env / thr).max(1e-6), exponent);
                            *bin *= gain;
                        }
                    }
                };
                let wet = core.process_sample(*sample, &mut handler);
                let delayed_dry = dry[*dry_pos];
                dry[*dry_pos] = *sample;
                *dry_pos = (*dry_pos + 1) % dry.len();
                *sample = wet_dry_mix(delayed_dry, wet, mix);
            }
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        for p in [
            &mut self.threshold,
            &mut self.ratio,
            &mut self.attack,
            &mut self.release,
            &mut self.low,
            &mut self.high,
            &mut self.mix,
        ] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.threshold.set_target(value),
            1 => self.ratio.set_target(value),
            2 => self.attack.set_target(value),
            3 => self.release.set_target(value),
            4 => self.low.set_target(value),
            5 => self.high.set_target(value),
            6 => self.mix.set_target(value),
            7 => self.window_norm = value,
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::SPECTRAL_GATE,
            name: "Spectral Gate",
            category: EngineCategory::Spectral,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }

    fn latency_samples(&self) -> usize {
        self.left.core.latency_samples()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    fn run(engine: &mut SpectralGate, input: &[f32]) -> Vec<f32> {
        let mut left = input.to_vec();
        let mut right = input.to_vec();
        for start in (0..left.len()).step_by(256) {
            let end = (start + 256).min(left.len());
            let (lh, rh) = (&mut left[start..end], &mut right[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            engine.process(&mut block);
        }
        left
    }

    fn rms(samples: &[f32]) -> f32 {
        let sum: f64 = samples.iter().map(|&s| f64::from(s * s)).sum();
        ((sum / samples.len() as f64).sqrt()) as f32
    }

    #[test]
    fn quiet_signal_is_attenuated() {
        let mut gate = SpectralGate::new();
        gate.prepare(48_000.0, 256);
        gate.set_param(0, 0.75); // -20 dB threshold
        gate.set_param(1, 1.0);
        gate.reset();
        // -40 dB tone sits well under threshold.
        let input: Vec<f32> = (0..24_000)
            .map(|n| 0.01 * libm::sinf(TAU * 1_000.0 * n as f32 / 48_000.0))
            .collect();
        let out = run(&mut gate, &input);
        let settled = &out[12_000..];
        assert!(rms(settled) < rms(&input[12_000..]) * 0.3);
    }

    #[test]
    fn loud_signal_passes() {
        let mut gate = SpectralGate::new();
        gate.prepare(48_000.0, 256);
        gate.set_param(0, 0.25); // -60 dB threshold
        gate.reset();
        let input: Vec<f32> = (0..24_000)
            .map(|n| 0.5 * libm::sinf(TAU * 1_000.0 * n as f32 / 48_000.0))
            .collect();
        let out = run(&mut gate, &input);
        let settled = &out[12_000..];
        let ratio = rms(settled) / rms(&input[12_000..]);
        assert!((ratio - 1.0).abs() < 0.1, "loud tone should pass, ratio {ratio}");
    }

    #[test]
    fn out_of_range_bins_untouched() {
        let mut gate = SpectralGate::new();
        gate.prepare(48_000.0, 256);
        gate.set_param(0, 1.0); // 0 dB threshold, everything below it
        gate.set_param(4, 0.75); // gate only above ~3.5 kHz
        gate.set_param(5, 1.0);
        gate.reset();
        // 500 Hz is below the gated range and must survive.
        let input: Vec<f32> = (0..24_000)
            .map(|n| 0.1 * libm::sinf(TAU * 500.0 * n as f32 / 48_000.0))
            .collect();
        let out = run(&mut gate, &input);
        let ratio = rms(&out[12_000..]) / rms(&input[12_000..]);
        assert!((ratio - 1.0).abs() < 0.1, "out-of-range tone must pass, ratio {ratio}");
    }

    #[test]
    fn reports_window_latency() {
        let mut gate = SpectralGate::new();
        gate.set_param(7, 0.9); // 4096 window
        gate.prepare(48_000.0, 256);
        assert_eq!(gate.latency_samples(), 4_096);
    }
}
