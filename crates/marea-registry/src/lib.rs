//! Engine registry and factory for the marea engine collection.
//!
//! One compiled-in table maps every engine id to its descriptor: name,
//! category, default parameter values, mix parameter index, and a
//! factory. Hosts consult the table to populate UIs and to seed a
//! freshly inserted engine with its defaults; nothing here does I/O and
//! nothing is mutable at runtime.
//!
//! The id space is closed and dense (see [`marea_engines::ids`]):
//! `NONE = 0` plus 27 engines across all twelve categories. Lookups for
//! ids outside the space return `None`/empty rather than panicking.
//!
//! # Example
//!
//! ```rust
//! use marea_engines::ids;
//!
//! // Seed a new tape echo with its shipped defaults.
//! let mut echo = marea_registry::create(ids::TAPE_ECHO, 48_000.0).unwrap();
//! for (index, &value) in marea_registry::defaults_for(ids::TAPE_ECHO)
//!     .iter()
//!     .enumerate()
//! {
//!     echo.set_param(index, value);
//! }
//! ```

use marea_core::{Engine, EngineCategory};
use marea_engines::ids;
use marea_engines::{
    AutoWah, Bitcrusher, Chorus, Compressor, ConsoleEq, ConvolutionReverb, Detune, DigitalDelay,
    Distortion, Exciter, Flanger, GainUtility, Limiter, MonoMaker, MultimodeFilter, NoiseGate,
    NoneEngine, PhaseAlign, Phaser, PlateReverb, RingMod, SpectralFreeze, SpectralGate, TapeEcho,
    TapeSaturation, Tremolo, Wavefolder, Widener,
};

/// Factory signature: every engine constructs parameter-defaulted and is
/// prepared at the host's rate before use.
type EngineFactory = fn() -> Box<dyn Engine + Send>;

/// One row of the registry table.
#[derive(Clone, Copy)]
pub struct EngineEntry {
    /// Engine id from [`marea_engines::ids`].
    pub id: u16,
    /// Display name, identical to `info().name`.
    pub name: &'static str,
    /// Category, identical to `info().category`.
    pub category: EngineCategory,
    /// Normalized default for every parameter, in index order.
    pub defaults: &'static [f32],
    /// Which parameter is the dry/wet mix, if the engine has one.
    pub mix_param: Option<usize>,
    factory: EngineFactory,
}

fn boxed<E: Engine + Send + Default + 'static>() -> Box<dyn Engine + Send> {
    Box::new(E::default())
}

/// The registry table, ordered by id with no gaps.
static ENGINES: [EngineEntry; ids::ENGINE_COUNT as usize] = [
    EngineEntry {
        id: ids::NONE,
        name: "None",
        category: EngineCategory::Utility,
        defaults: &[],
        mix_param: None,
        factory: boxed::<NoneEngine>,
    },
    EngineEntry {
        id: ids::CONVOLUTION_REVERB,
        name: "Convolution Reverb",
        category: EngineCategory::Reverb,
        defaults: &[0.0, 0.4, 0.3, 0.0, 0.1, 0.5, 0.0, 1.0, 0.5, 0.3],
        mix_param: Some(9),
        factory: boxed::<ConvolutionReverb>,
    },
    EngineEntry {
        id: ids::PLATE_REVERB,
        name: "Plate Reverb",
        category: EngineCategory::Reverb,
        defaults: &[0.5, 0.5, 0.5, 0.1, 1.0, 0.3],
        mix_param: Some(5),
        factory: boxed::<PlateReverb>,
    },
    EngineEntry {
        id: ids::TAPE_ECHO,
        name: "Tape Echo",
        category: EngineCategory::Delay,
        defaults: &[0.375, 0.35, 0.25, 0.3, 0.35, 0.0],
        mix_param: Some(4),
        factory: boxed::<TapeEcho>,
    },
    EngineEntry {
        id: ids::DIGITAL_DELAY,
        name: "Digital Delay",
        category: EngineCategory::Delay,
        defaults: &[0.25, 0.35, 0.0, 1.0, 0.35, 0.0],
        mix_param: Some(4),
        factory: boxed::<DigitalDelay>,
    },
    EngineEntry {
        id: ids::CONSOLE_EQ,
        name: "Console EQ",
        category: EngineCategory::Filter,
        defaults: &[0.5, 0.3, 0.5, 0.5, 0.5, 0.5, 0.5, 0.0, 0.0, 0.0, 1.0],
        mix_param: Some(10),
        factory: boxed::<ConsoleEq>,
    },
    EngineEntry {
        id: ids::MULTIMODE_FILTER,
        name: "Filter",
        category: EngineCategory::Filter,
        defaults: &[0.5, 0.1, 0.0, 1.0],
        mix_param: Some(3),
        factory: boxed::<MultimodeFilter>,
    },
    EngineEntry {
        id: ids::AUTO_WAH,
        name: "Auto Wah",
        category: EngineCategory::Filter,
        defaults: &[0.6, 0.5, 0.4, 0.3, 0.7],
        mix_param: Some(4),
        factory: boxed::<AutoWah>,
    },
    EngineEntry {
        id: ids::COMPRESSOR,
        name: "Compressor",
        category: EngineCategory::Dynamics,
        defaults: &[0.7, 0.15, 0.3, 0.2, 0.0, 1.0],
        mix_param: Some(5),
        factory: boxed::<Compressor>,
    },
    EngineEntry {
        id: ids::NOISE_GATE,
        name: "Noise Gate",
        category: EngineCategory::Dynamics,
        defaults: &[0.4, 1.0, 0.1, 0.2],
        mix_param: None,
        factory: boxed::<NoiseGate>,
    },
    EngineEntry {
        id: ids::LIMITER,
        name: "Limiter",
        category: EngineCategory::Dynamics,
        defaults: &[0.95, 0.1, 0.0],
        mix_param: None,
        factory: boxed::<Limiter>,
    },
    EngineEntry {
        id: ids::TAPE_SATURATION,
        name: "Tape Saturation",
        category: EngineCategory::Saturation,
        defaults: &[0.4, 0.7, 0.5, 1.0],
        mix_param: Some(3),
        factory: boxed::<TapeSaturation>,
    },
    EngineEntry {
        id: ids::EXCITER,
        name: "Exciter",
        category: EngineCategory::Saturation,
        defaults: &[0.4, 0.5, 0.3],
        mix_param: None,
        factory: boxed::<Exciter>,
    },
    EngineEntry {
        id: ids::DISTORTION,
        name: "Distortion",
        category: EngineCategory::Distortion,
        defaults: &[0.4, 0.0, 0.5, 1.0],
        mix_param: Some(3),
        factory: boxed::<Distortion>,
    },
    EngineEntry {
        id: ids::BITCRUSHER,
        name: "Bitcrusher",
        category: EngineCategory::Distortion,
        defaults: &[0.3, 0.2, 1.0],
        mix_param: Some(2),
        factory: boxed::<Bitcrusher>,
    },
    EngineEntry {
        id: ids::WAVEFOLDER,
        name: "Wavefolder",
        category: EngineCategory::Distortion,
        defaults: &[0.3, 0.5, 0.5, 1.0],
        mix_param: Some(3),
        factory: boxed::<Wavefolder>,
    },
    EngineEntry {
        id: ids::CHORUS,
        name: "Chorus",
        category: EngineCategory::Modulation,
        defaults: &[0.4, 0.5, 0.6, 0.5],
        mix_param: Some(3),
        factory: boxed::<Chorus>,
    },
    EngineEntry {
        id: ids::FLANGER,
        name: "Flanger",
        category: EngineCategory::Modulation,
        defaults: &[0.4, 0.6, 0.3, 0.5],
        mix_param: Some(3),
        factory: boxed::<Flanger>,
    },
    EngineEntry {
        id: ids::PHASER,
        name: "Phaser",
        category: EngineCategory::Modulation,
        defaults: &[0.4, 0.6, 0.5, 0.3, 0.5],
        mix_param: Some(4),
        factory: boxed::<Phaser>,
    },
    EngineEntry {
        id: ids::TREMOLO,
        name: "Tremolo",
        category: EngineCategory::Modulation,
        defaults: &[0.4, 0.5, 0.0, 0.0],
        mix_param: None,
        factory: boxed::<Tremolo>,
    },
    EngineEntry {
        id: ids::DETUNE,
        name: "Detune",
        category: EngineCategory::Pitch,
        defaults: &[0.6, 1.0, 0.5],
        mix_param: Some(2),
        factory: boxed::<Detune>,
    },
    EngineEntry {
        id: ids::WIDENER,
        name: "Widener",
        category: EngineCategory::Spatial,
        defaults: &[0.5, 0.0],
        mix_param: None,
        factory: boxed::<Widener>,
    },
    EngineEntry {
        id: ids::MONO_MAKER,
        name: "Mono Maker",
        category: EngineCategory::Spatial,
        defaults: &[0.5, 1.0],
        mix_param: None,
        factory: boxed::<MonoMaker>,
    },
    EngineEntry {
        id: ids::PHASE_ALIGN,
        name: "Phase Align",
        category: EngineCategory::Spatial,
        defaults: &[0.5, 0.5, 0.5, 0.5, 0.5, 0.0],
        mix_param: None,
        factory: boxed::<PhaseAlign>,
    },
    EngineEntry {
        id: ids::SPECTRAL_GATE,
        name: "Spectral Gate",
        category: EngineCategory::Spectral,
        defaults: &[0.5, 0.5, 0.1, 0.3, 0.0, 1.0, 1.0, 0.33],
        mix_param: Some(6),
        factory: boxed::<SpectralGate>,
    },
    EngineEntry {
        id: ids::SPECTRAL_FREEZE,
        name: "Spectral Freeze",
        category: EngineCategory::Spectral,
        defaults: &[0.0, 0.25, 1.0, 0.6],
        mix_param: Some(2),
        factory: boxed::<SpectralFreeze>,
    },
    EngineEntry {
        id: ids::RING_MOD,
        name: "Ring Mod",
        category: EngineCategory::Experimental,
        defaults: &[0.5, 0.5, 0.0, 0.5],
        mix_param: Some(3),
        factory: boxed::<RingMod>,
    },
    EngineEntry {
        id: ids::GAIN_UTILITY,
        name: "Gain Utility",
        category: EngineCategory::Utility,
        defaults: &[0.5, 0.5, 0.0],
        mix_param: None,
        factory: boxed::<GainUtility>,
    },
];

fn entry(id: u16) -> Option<&'static EngineEntry> {
    ENGINES.get(usize::from(id)).filter(|e| e.id == id)
}

/// Every engine's descriptor, ordered by id.
pub fn all_engines() -> &'static [EngineEntry] {
    &ENGINES
}

/// Normalized defaults for every parameter of `id`, empty for unknown ids.
pub fn defaults_for(id: u16) -> &'static [f32] {
    entry(id).map_or(&[], |e| e.defaults)
}

/// Index of the dry/wet parameter, `None` for unknown ids and engines
/// without one.
pub fn mix_param_index(id: u16) -> Option<usize> {
    entry(id).and_then(|e| e.mix_param)
}

/// Parameter count, 0 for unknown ids.
pub fn param_count(id: u16) -> usize {
    entry(id).map_or(0, |e| e.defaults.len())
}

/// Category of `id`, `None` for unknown ids.
pub fn category_of(id: u16) -> Option<EngineCategory> {
    entry(id).map(|e| e.category)
}

/// Ids of every engine in `category`, ordered by id.
pub fn engines_by_category(category: EngineCategory) -> Vec<u16> {
    ENGINES
        .iter()
        .filter(|e| e.category == category)
        .map(|e| e.id)
        .collect()
}

/// Instantiate `id`, prepared at `sample_rate` with a 512-sample block
/// bound, its parameters seeded from the table. `None` for unknown ids.
pub fn create(id: u16, sample_rate: f32) -> Option<Box<dyn Engine + Send>> {
    let entry = entry(id)?;
    let mut engine = (entry.factory)();
    for (index, &value) in entry.defaults.iter().enumerate() {
        engine.set_param(index, value);
    }
    engine.prepare(sample_rate, 512);
    Some(engine)
}

/// Cross-check the table against the live engines.
///
/// For every id, instantiates the engine and verifies that the
/// descriptor's id, name, category, parameter count, and mix index match
/// `info()`, that all defaults are in \[0, 1\], and that ids are dense.
/// Returns the first mismatch as a message.
pub fn validate() -> Result<(), String> {
    for (index, e) in ENGINES.iter().enumerate() {
        if usize::from(e.id) != index {
            return Err(format!("id {} out of order at index {index}", e.id));
        }
        let engine = (e.factory)();
        let info = engine.info();
        if info.id != e.id {
            return Err(format!("engine {} reports id {}", e.id, info.id));
        }
        if info.name != e.name {
            return Err(format!("engine {} reports name {:?}", e.id, info.name));
        }
        if info.category != e.category {
            return Err(format!("engine {} category mismatch", e.id));
        }
        if info.param_count != e.defaults.len() {
            return Err(format!(
                "engine {}: {} defaults for {} params",
                e.id,
                e.defaults.len(),
                info.param_count
            ));
        }
        if info.mix_param != e.mix_param {
            return Err(format!("engine {} mix param mismatch", e.id));
        }
        if e.defaults.iter().any(|d| !(0.0..=1.0).contains(d)) {
            return Err(format!("engine {} has a default outside [0, 1]", e.id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_dense_and_consistent() {
        validate().unwrap();
    }

    #[test]
    fn unknown_ids_are_harmless() {
        assert!(create(ids::ENGINE_COUNT, 48_000.0).is_none());
        assert!(defaults_for(999).is_empty());
        assert_eq!(param_count(999), 0);
        assert!(category_of(999).is_none());
        assert!(mix_param_index(999).is_none());
    }

    #[test]
    fn every_category_is_populated() {
        for category in EngineCategory::ALL {
            assert!(
                !engines_by_category(category).is_empty(),
                "no engines in {category:?}"
            );
        }
    }
}
