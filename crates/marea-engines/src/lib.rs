//! Marea Engines - Audio engine implementations
//!
//! Every engine in the collection lives here, each implementing the
//! [`marea_core::Engine`] contract: prepare/process/reset lifecycle,
//! normalized \[0, 1\] parameters, in-place stereo block processing.
//!
//! Flagship engines:
//!
//! - [`ConvolutionReverb`] - FFT-partitioned convolution with synthesized
//!   impulse responses (hall, plate, stairwell, cloud)
//! - [`TapeEcho`] - Wow/flutter modulated delay with tape saturation
//! - [`ConsoleEq`] - Three-band console EQ with proportional-Q bell and
//!   console saturation color
//! - [`Widener`] / [`MonoMaker`] / [`PhaseAlign`] - Stereo field tools
//! - [`SpectralGate`] / [`SpectralFreeze`] - STFT-domain processors
//!
//! The remaining engines cover every category of the roster: dynamics,
//! filters, saturation, distortion, modulation, pitch, delay, reverb,
//! experimental, and utility. Engine ids live in [`ids`]; the
//! `marea-registry` crate maps ids to defaults and constructors.
//!
//! ```rust,ignore
//! use marea_core::{Engine, StereoBlock};
//! use marea_engines::TapeEcho;
//!
//! let mut echo = TapeEcho::new();
//! echo.prepare(48_000.0, 512);
//! echo.set_param(1, 0.5); // feedback
//! echo.process(&mut block);
//! ```

pub mod ids;
pub mod stft;

pub mod auto_wah;
pub mod bitcrusher;
pub mod chorus;
pub mod compressor;
pub mod console_eq;
pub mod convolution;
pub mod detune;
pub mod digital_delay;
pub mod distortion;
pub mod exciter;
pub mod flanger;
pub mod gain_util;
pub mod limiter;
pub mod mono_maker;
pub mod multimode_filter;
pub mod noise_gate;
pub mod none;
pub mod phase_align;
pub mod phaser;
pub mod plate_reverb;
pub mod ring_mod;
pub mod spectral_freeze;
pub mod spectral_gate;
pub mod tape_echo;
pub mod tape_saturation;
pub mod tremolo;
pub mod wavefolder;
pub mod widener;

// Re-export main types at crate root
pub use auto_wah::AutoWah;
pub use bitcrusher::Bitcrusher;
pub use chorus::Chorus;
pub use compressor::Compressor;
pub use console_eq::ConsoleEq;
pub use convolution::ConvolutionReverb;
pub use detune::Detune;
pub use digital_delay::DigitalDelay;
pub use distortion::Distortion;
pub use exciter::Exciter;
pub use flanger::Flanger;
pub use gain_util::GainUtility;
pub use limiter::Limiter;
pub use mono_maker::MonoMaker;
pub use multimode_filter::MultimodeFilter;
pub use noise_gate::NoiseGate;
pub use none::NoneEngine;
pub use phase_align::PhaseAlign;
pub use phaser::Phaser;
pub use plate_reverb::PlateReverb;
pub use ring_mod::RingMod;
pub use spectral_freeze::SpectralFreeze;
pub use spectral_gate::SpectralGate;
pub use tape_echo::TapeEcho;
pub use tape_saturation::TapeSaturation;
pub use tremolo::Tremolo;
pub use wavefolder::Wavefolder;
pub use widener::Widener;
