//! Impulse response cache.
//!
//! Synthesis takes milliseconds, and hosts love to wiggle knobs.
//! Finished IRs are cached under a quantized key (1 % parameter
//! resolution) in a small fixed-capacity store with round-robin
//! eviction, so knob sweeps that revisit a value reuse the old IR
//! instead of resynthesizing it.

use std::sync::Arc;

use super::ir::{IrSpec, IrType, StereoIr, synthesize};

/// Number of cached IRs.
pub const CACHE_SLOTS: usize = 8;

/// Quantized cache key: type, size, damping and early/late balance at
/// 1 % steps, reverse flag, sample rate in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrKey {
    ir_type: IrType,
    size_pct: u16,
    damping_pct: u16,
    early_late_pct: u16,
    reverse: bool,
    sample_rate: u32,
}

impl IrKey {
    /// Quantize a spec to its cache key.
    pub fn quantize(spec: &IrSpec, sample_rate: f32) -> Self {
        Self {
            ir_type: spec.ir_type,
            size_pct: (spec.size * 100.0).round() as u16,
            damping_pct: (spec.damping * 100.0).round() as u16,
            early_late_pct: (spec.early_late * 100.0).round() as u16,
            reverse: spec.reverse,
            sample_rate: sample_rate as u32,
        }
    }
}

/// Fixed-capacity IR store with round-robin eviction.
pub struct IrCache {
    slots: Vec<(IrKey, Arc<StereoIr>)>,
    next_evict: usize,
}

impl IrCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(CACHE_SLOTS),
            next_evict: 0,
        }
    }

    /// Fetch the IR for `spec`, synthesizing and caching on a miss.
    pub fn get_or_synthesize(&mut self, spec: &IrSpec, sample_rate: f32) -> Arc<StereoIr> {
        let key = IrKey::quantize(spec, sample_rate);
        if let Some((_, ir)) = self.slots.iter().find(|(k, _)| *k == key) {
            #[cfg(feature = "tracing")]
            tracing::debug!("ir_cache: hit for {key:?}");
            return Arc::clone(ir);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("ir_cache: miss for {key:?}, synthesizing");
        let ir = Arc::new(synthesize(spec, sample_rate));
        if self.slots.len() < CACHE_SLOTS {
            self.slots.push((key, Arc::clone(&ir)));
        } else {
            self.slots[self.next_evict] = (key, Arc::clone(&ir));
            self.next_evict = (self.next_evict + 1) % CACHE_SLOTS;
        }
        ir
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for IrCache {
    fn default() -> Self {
        Self::new()
    }
}
