//! Spectral freeze.
//!
//! Captures the magnitude spectrum on the rising edge of the Freeze
//! control and holds it indefinitely, re-synthesizing each frame with
//! phases advanced by `2π · bin_freq · hop / sr` so the held spectrum
//! keeps moving instead of buzzing at the frame rate. Releasing the
//! freeze crossfades back to the live signal over a configurable number
//! of frames.
//!
//! # Parameters
//!
//! | Index | Name   | Mapping                                        |
//! |-------|--------|------------------------------------------------|
//! | 0     | Freeze | > 0.5 latches the current spectrum             |
//! | 1     | Fade   | release crossfade, 1 – 32 frames               |
//! | 2     | Mix    | dry/wet (dry is latency-compensated)           |
//! | 3     | Window | FFT size {512, 1024, 2048, 4096}, latched at prepare |

use core::f32::consts::TAU;
use libm::{cosf, sinf};
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, SmoothedParam, StereoBlock, wet_dry_mix,
};
use rustfft::num_complex::Complex;

use crate::ids;
use crate::stft::{StftCore, clamp_fft_size};

const PARAM_COUNT: usize = 4;
const MIX_PARAM: usize = 2;

#[derive(Clone, Copy, PartialEq, Eq)]
enum FreezeState {
    Live,
    CapturePending,
    Frozen,
    FadingOut,
}

struct FreezeChannel {
    core: StftCore,
    frozen_mags: Vec<f32>,
    phases: Vec<f32>,
    dry: Vec<f32>,
    dry_pos: usize,
}

impl FreezeChannel {
    fn new(fft_size: usize) -> Self {
        let core = StftCore::new(fft_size);
        let bins = core.fft_size() / 2 + 1;
        let latency = core.latency_samples();
        Self {
            core,
            frozen_mags: vec![0.0; bins],
            phases: vec![0.0; bins],
            dry: vec![0.0; latency],
            dry_pos: 0,
        }
    }

    fn reset(&mut self) {
        self.core.reset();
        self.frozen_mags.fill(0.0);
        self.phases.fill(0.0);
        self.dry.fill(0.0);
        self.dry_pos = 0;
    }
}

/// STFT magnitude freeze (see module docs for the parameter map).
pub struct SpectralFreeze {
    sample_rate: f32,
    freeze: f32,
    fade: f32,
    mix: SmoothedParam,
    window_norm: f32,
    state: FreezeState,
    fade_frames_left: u32,
    left: FreezeChannel,
    right: FreezeChannel,
}

impl SpectralFreeze {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            sample_rate,
            freeze: 0.0,
            fade: 0.25,
            mix: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            window_norm: 0.6, // 2048
            state: FreezeState::Live,
            fade_frames_left: 0,
            left: FreezeChannel::new(2_048),
            right: FreezeChannel::new(2_048),
        }
    }

    fn requested_fft_size(&self) -> usize {
        let sizes = [512usize, 1_024, 2_048, 4_096];
        let idx = ((self.window_norm * sizes.len() as f32) as usize).min(sizes.len() - 1);
        clamp_fft_size(sizes[idx])
    }

    fn fade_frames(&self) -> u32 {
        1 + (self.fade * 31.0) as u32
    }
}

impl Default for SpectralFreeze {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for SpectralFreeze {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        let fft_size = self.requested_fft_size();
        self.left = FreezeChannel::new(fft_size);
        self.right = FreezeChannel::new(fft_size);
        self.mix.set_sample_rate(sr);
        self.mix.snap_to_target();
        self.state = FreezeState::Live;
        self.fade_frames_left = 0;
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        let fft_size = self.left.core.fft_size();
        let hop = self.left.core.hop();
        // Phase advance per frame for bin i: 2π·(i·sr/N)·(hop/sr) = 2π·i·hop/N.
        let phase_per_bin = TAU * hop as f32 / fft_size as f32;
        let fade_total = self.fade_frames();

        for (l, r) in block.frames_mut() {
            let mix = self.mix.advance();
            let state = self.state;
            let fade_left = self.fade_frames_left;
            let mut frame_ran = false;

            for (channel, sample) in [(&mut self.left, l), (&mut self.right, r)] {
                let FreezeChannel {
                    core,
                    frozen_mags,
                    phases,
                    dry,
                    dry_pos,
                } = channel;
                let mut handler = |bins: &mut [Complex<f32>]| {
                    frame_ran = true;
                    match state {
                        FreezeState::Live => {}
                        FreezeState::CapturePending => {
                            for ((bin, mag), phase) in
                                bins.iter().zip(frozen_mags.iter_mut()).zip(phases.iter_mut())
                            {
                                *mag = bin.norm();
                                *phase = bin.arg();
                            }
                        }
                        FreezeState::Frozen | FreezeState::FadingOut => {
                            let blend = if state == FreezeState::Frozen {
                                1.0
                            } else {
                                fade_left as f32 / fade_total as f32
                            };
                            for (i, ((bin, &mag), phase)) in bins
                                .iter_mut()
                                .zip(frozen_mags.iter())
                                .zip(phases.iter_mut())
                                .enumerate()
                            {
                                *phase = (*phase + phase_per_bin * i as f32) % TAU;
                                let frozen = Complex::new(mag * cosf(*phase), mag * sinf(*phase));
                                *bin = *bin * (1.0 - blend) + frozen * blend;
                            }
                        }
                    }
                };
                let wet = core.process_sample(*sample, &mut handler);
                let delayed_dry = dry[*dry_pos];
                dry[*dry_pos] = *sample;
                *dry_pos = (*dry_pos + 1) % dry.len();
                *sample = wet_dry_mix(delayed_dry, wet, mix);
            }

            // Both channels run their frame on the same sample tick, so one
            // state step per tick is enough.
            if frame_ran {
                match self.state {
                    FreezeState::CapturePending => self.state = FreezeState::Frozen,
                    FreezeState::FadingOut => {
                        self.fade_frames_left = self.fade_frames_left.saturating_sub(1);
                        if self.fade_frames_left == 0 {
                            self.state = FreezeState::Live;
                        }
                    }
                    FreezeState::Live | FreezeState::Frozen => {}
                }
            }
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.mix.snap_to_target();
        self.state = FreezeState::Live;
        self.fade_frames_left = 0;
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => {
                let was_on = self.freeze > 0.5;
                let now_on = value > 0.5;
                self.freeze = value;
                if now_on && !was_on {
                    self.state = FreezeState::CapturePending;
                } else if !now_on && was_on {
                    self.state = FreezeState::FadingOut;
                    self.fade_frames_left = self.fade_frames();
                }
            }
            1 => self.fade = value,
            2 => self.mix.set_target(value),
            3 => self.window_norm = value,
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::SPECTRAL_FREEZE,
            name: "Spectral Freeze",
            category: EngineCategory::Spectral,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }

    fn latency_samples(&self) -> usize {
        self.left.core.latency_samples()
    }
}
