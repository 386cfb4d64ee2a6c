//! Marea Core - DSP primitives and the engine contract
//!
//! This crate provides the foundational building blocks for the marea
//! engine collection: the uniform [`Engine`] trait, parameter smoothing,
//! and the filter/delay/modulation primitives the engines are built from.
//! Everything here is designed for real-time audio with zero allocation
//! in the processing path.
//!
//! # Core Abstractions
//!
//! ## Engine Contract
//!
//! - [`Engine`] - Object-safe trait with a uniform prepare/process/reset
//!   lifecycle and normalized \[0, 1\] parameters
//! - [`EngineInfo`] / [`EngineCategory`] - Static engine descriptors
//! - [`StereoBlock`] - Borrowed stereo block processed in place
//! - [`TransportInfo`] - Host transport snapshot for tempo sync
//!
//! ## Parameter Smoothing
//!
//! - [`SmoothedParam`] - Exponential one-pole smoothing toward a target,
//!   advanced once per sample for zipper-free automation
//!
//! ## Filters
//!
//! - [`Biquad`] - Direct Form I IIR with RBJ cookbook coefficients
//! - [`StateVariableFilter`] - TPT SVF, stable under cutoff modulation
//! - [`CombFilter`] - Damped feedback comb for reverb loops
//! - [`FirstOrderAllpass`] / [`ThiranAllpass`] - Phase shift and
//!   sub-sample alignment
//! - [`OnePole`] / [`DcBlocker`] - One-multiply smoothers and DC removal
//!
//! ## Delay, Modulation, Dynamics
//!
//! - [`FractionalDelay`] - Interpolated circular-buffer delay line
//! - [`Lfo`] - Phase-accumulator LFO with stereo phase offset
//! - [`EnvelopeFollower`] - Attack/release peak follower
//!
//! ## Numeric Hygiene
//!
//! - [`DenormalGuard`] + [`flush_denormal`] - Denormal protection in
//!   feedback paths
//! - [`sanitize`] / [`StereoBlock::scrub`] - NaN/Inf removal and the
//!   hard output clamp at [`SAFE_CLIP_LIMIT`]
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! marea-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: all allocation happens in `prepare`
//! - **Total contract**: no operation on an engine returns an error;
//!   misuse is clamped or ignored
//! - **No dependencies on std**: pure `no_std` with `libm` for math

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod allpass;
pub mod biquad;
pub mod block;
pub mod comb;
pub mod dc_blocker;
pub mod delay;
pub mod denormal;
pub mod engine;
pub mod envelope;
pub mod lfo;
pub mod math;
pub mod one_pole;
pub mod oversample;
pub mod param;
pub mod rng;
pub mod svf;
pub mod tempo;

// Re-export main types at crate root
pub use allpass::{FirstOrderAllpass, ThiranAllpass};
pub use biquad::{
    Biquad, Coefficients, high_shelf, highpass, low_shelf, lowpass, peaking,
    peaking_proportional_q,
};
pub use block::StereoBlock;
pub use comb::CombFilter;
pub use dc_blocker::DcBlocker;
pub use delay::{FractionalDelay, Interpolation};
pub use denormal::DenormalGuard;
pub use engine::{
    CategoryGuidelines, Engine, EngineCategory, EngineInfo, MAX_PARAMS, clamp_norm,
    clamp_sample_rate,
};
pub use envelope::EnvelopeFollower;
pub use lfo::{Lfo, LfoWaveform};
pub use math::{
    DENORMAL_FLOOR, SAFE_CLIP_LIMIT, db_to_linear, flush_denormal, foldback, hard_clip, lerp,
    linear_to_db, ms_decode, ms_encode, sanitize, soft_clip, tape_saturate, wet_dry_mix,
};
pub use one_pole::OnePole;
pub use oversample::Oversampler2x;
pub use param::SmoothedParam;
pub use rng::XorShift32;
pub use svf::{StateVariableFilter, SvfMode};
pub use tempo::{NoteDivision, TransportInfo, snap_to_division};
