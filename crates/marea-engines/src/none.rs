//! Pass-through slot.
//!
//! Id 0 in the registry: a prepared, valid engine that does nothing.
//! Hosts use it for empty slots so the processing chain never has to
//! special-case "no engine here".

use marea_core::{Engine, EngineCategory, EngineInfo, StereoBlock};

use crate::ids;

/// The empty slot. Audio passes unchanged.
#[derive(Debug, Default, Clone)]
pub struct NoneEngine;

impl NoneEngine {
    /// Create the pass-through engine.
    pub fn new() -> Self {
        Self
    }
}

impl Engine for NoneEngine {
    fn prepare(&mut self, _sample_rate: f32, _max_block: usize) {}

    fn process(&mut self, _block: &mut StereoBlock<'_>) {}

    fn reset(&mut self) {}

    fn set_param(&mut self, _index: usize, _value: f32) {}

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::NONE,
            name: "None",
            category: EngineCategory::Utility,
            param_count: 0,
            mix_param: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_audio_untouched() {
        let mut none = NoneEngine::new();
        none.prepare(48_000.0, 64);
        let mut l = [0.1f32, -0.5, 0.9];
        let mut r = [0.2f32, 0.3, -0.7];
        let mut block = StereoBlock::new(&mut l, &mut r);
        none.process(&mut block);
        assert_eq!(l, [0.1, -0.5, 0.9]);
        assert_eq!(r, [0.2, 0.3, -0.7]);
    }
}
