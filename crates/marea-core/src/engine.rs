//! The engine contract.
//!
//! Every audio engine in the workspace implements [`Engine`]: a uniform
//! lifecycle (`prepare` → `process`/`reset` → drop) with normalized \[0, 1\]
//! parameters and in-place block processing. The trait is object-safe so the
//! registry can hand out `Box<dyn Engine + Send>`.
//!
//! # Contract
//!
//! - `prepare` allocates everything and recomputes all rate-dependent
//!   coefficients. After it returns, `process` never allocates, blocks,
//!   or performs I/O.
//! - `process` mutates the block in place and leaves it free of NaN/Inf
//!   samples, every sample within the safe clip limit.
//! - `set_param` clamps to \[0, 1\] and silently ignores unknown indices.
//!   Targets written before `prepare` are retained and picked up when
//!   smoothing starts.
//! - `reset` clears audio state without reallocating; smoothed parameters
//!   snap to their targets.
//! - No operation returns an error. Misuse is clamped, ignored, or, for
//!   unrecoverable conditions (allocation failure in `prepare`), fatal
//!   before audio starts.

use crate::tempo::TransportInfo;
use crate::StereoBlock;

/// Upper bound on the number of parameters any engine may expose.
pub const MAX_PARAMS: usize = 15;

/// Category tags for engine organization.
///
/// Every engine except the pass-through `NONE` slot belongs to exactly one
/// category. Categories carry rough usage guidelines that hosts can surface
/// as hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineCategory {
    /// Compressors, gates, limiters.
    Dynamics,
    /// Resonant and multimode filters.
    Filter,
    /// Tape, transformer, and console color.
    Saturation,
    /// Waveshaping, bit reduction, folding.
    Distortion,
    /// Chorus, flanger, phaser, tremolo.
    Modulation,
    /// Pitch and detune processors.
    Pitch,
    /// Echo and delay lines.
    Delay,
    /// Convolution and algorithmic reverbs.
    Reverb,
    /// Stereo field processors.
    Spatial,
    /// STFT-domain processors.
    Spectral,
    /// Unconventional processors.
    Experimental,
    /// Gain staging and routing helpers.
    Utility,
}

impl EngineCategory {
    /// All categories in display order.
    pub const ALL: [EngineCategory; 12] = [
        EngineCategory::Dynamics,
        EngineCategory::Filter,
        EngineCategory::Saturation,
        EngineCategory::Distortion,
        EngineCategory::Modulation,
        EngineCategory::Pitch,
        EngineCategory::Delay,
        EngineCategory::Reverb,
        EngineCategory::Spatial,
        EngineCategory::Spectral,
        EngineCategory::Experimental,
        EngineCategory::Utility,
    ];

    /// Human-readable category name.
    pub const fn name(&self) -> &'static str {
        match self {
            EngineCategory::Dynamics => "Dynamics",
            EngineCategory::Filter => "Filter",
            EngineCategory::Saturation => "Saturation",
            EngineCategory::Distortion => "Distortion",
            EngineCategory::Modulation => "Modulation",
            EngineCategory::Pitch => "Pitch",
            EngineCategory::Delay => "Delay",
            EngineCategory::Reverb => "Reverb",
            EngineCategory::Spatial => "Spatial",
            EngineCategory::Spectral => "Spectral",
            EngineCategory::Experimental => "Experimental",
            EngineCategory::Utility => "Utility",
        }
    }

    /// Usage guidelines for the category.
    pub const fn guidelines(&self) -> CategoryGuidelines {
        match self {
            EngineCategory::Dynamics | EngineCategory::Filter | EngineCategory::Utility => {
                CategoryGuidelines {
                    suggested_mix: (1.0, 1.0),
                    typical_drive: (0.0, 0.3),
                }
            }
            EngineCategory::Saturation => CategoryGuidelines {
                suggested_mix: (0.7, 1.0),
                typical_drive: (0.2, 0.6),
            },
            EngineCategory::Distortion => CategoryGuidelines {
                suggested_mix: (0.6, 1.0),
                typical_drive: (0.3, 0.9),
            },
            EngineCategory::Modulation | EngineCategory::Pitch | EngineCategory::Spatial => {
                CategoryGuidelines {
                    suggested_mix: (0.3, 0.6),
                    typical_drive: (0.0, 0.2),
                }
            }
            EngineCategory::Delay | EngineCategory::Reverb => CategoryGuidelines {
                suggested_mix: (0.2, 0.5),
                typical_drive: (0.0, 0.4),
            },
            EngineCategory::Spectral | EngineCategory::Experimental => CategoryGuidelines {
                suggested_mix: (0.4, 1.0),
                typical_drive: (0.0, 0.5),
            },
        }
    }
}

/// Rough per-category usage hints (normalized ranges).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryGuidelines {
    /// Suggested dry/wet mix range.
    pub suggested_mix: (f32, f32),
    /// Typical drive range.
    pub typical_drive: (f32, f32),
}

/// Static description of an engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineInfo {
    /// Engine id; dense, with 0 reserved for the pass-through slot.
    pub id: u16,
    /// Human-readable name.
    pub name: &'static str,
    /// Category tag.
    pub category: EngineCategory,
    /// Number of exposed parameters, at most [`MAX_PARAMS`].
    pub param_count: usize,
    /// Index of the dry/wet parameter, if the engine has one.
    pub mix_param: Option<usize>,
}

/// Uniform interface implemented by every audio engine.
pub trait Engine {
    /// Allocate buffers and recompute every sample-rate-dependent
    /// coefficient. Sample rates outside \[8 kHz, 384 kHz\] are clamped.
    ///
    /// Must be called before `process`, and only while processing is
    /// quiescent (the host's responsibility).
    fn prepare(&mut self, sample_rate: f32, max_block: usize);

    /// Process one block in place. Real-time safe: no allocation, locks,
    /// or I/O. Advances parameter smoothing once per sample. An empty
    /// block is a no-op.
    fn process(&mut self, block: &mut StereoBlock<'_>);

    /// Clear all audio state (delay lines, filter history, LFO phases)
    /// without reallocating. Smoothed parameters snap to their targets.
    fn reset(&mut self);

    /// Set the target for parameter `index` to `value` clamped to \[0, 1\].
    /// Unknown indices are ignored.
    fn set_param(&mut self, index: usize, value: f32);

    /// Static descriptor for this engine.
    fn info(&self) -> EngineInfo;

    /// Processing latency in samples. Fixed for the lifetime of a prepared
    /// engine; the host uses it for delay compensation.
    fn latency_samples(&self) -> usize {
        0
    }

    /// Snapshot host transport state. Tempo-synced engines read it at the
    /// next block start; everyone else ignores it.
    fn set_transport(&mut self, _transport: TransportInfo) {}
}

/// Clamp a host-supplied sample rate into the supported range.
#[inline]
pub fn clamp_sample_rate(sample_rate: f32) -> f32 {
    let clamped = sample_rate.clamp(8_000.0, 384_000.0);
    #[cfg(feature = "tracing")]
    if clamped != sample_rate {
        tracing::debug!("prepare: sample rate {sample_rate} clamped to {clamped}");
    }
    clamped
}

/// Clamp a normalized parameter value on ingress.
#[inline]
pub fn clamp_norm(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_rate_clamped() {
        assert_eq!(clamp_sample_rate(44_100.0), 44_100.0);
        assert_eq!(clamp_sample_rate(0.0), 8_000.0);
        assert_eq!(clamp_sample_rate(1e9), 384_000.0);
    }

    #[test]
    fn norm_clamp_handles_garbage() {
        assert_eq!(clamp_norm(0.5), 0.5);
        assert_eq!(clamp_norm(-1.0), 0.0);
        assert_eq!(clamp_norm(2.0), 1.0);
        assert_eq!(clamp_norm(f32::NAN), 0.0);
    }

    #[test]
    fn every_category_has_guidelines() {
        for cat in EngineCategory::ALL {
            let g = cat.guidelines();
            assert!(g.suggested_mix.0 <= g.suggested_mix.1);
            assert!(g.typical_drive.0 <= g.typical_drive.1);
            assert!(!cat.name().is_empty());
        }
    }
}
