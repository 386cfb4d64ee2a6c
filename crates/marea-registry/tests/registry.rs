//! Registry table invariants.

use marea_core::EngineCategory;
use marea_engines::ids;
use marea_registry::{
    all_engines, category_of, create, defaults_for, engines_by_category, mix_param_index,
    param_count, validate,
};

#[test]
fn defaults_are_normalized() {
    for entry in all_engines() {
        for (index, &value) in entry.defaults.iter().enumerate() {
            assert!(
                (0.0..=1.0).contains(&value),
                "engine {} param {index} default {value} out of range",
                entry.id
            );
        }
    }
}

#[test]
fn mix_index_points_at_a_real_parameter() {
    for entry in all_engines() {
        if let Some(mix) = entry.mix_param {
            assert!(
                mix < entry.defaults.len(),
                "engine {} mix index {mix} beyond its {} params",
                entry.id,
                entry.defaults.len()
            );
        }
    }
}

#[test]
fn every_engine_lands_in_exactly_one_category() {
    for entry in all_engines() {
        if entry.id == ids::NONE {
            continue;
        }
        let homes = EngineCategory::ALL
            .iter()
            .filter(|&&c| engines_by_category(c).contains(&entry.id))
            .count();
        assert_eq!(homes, 1, "engine {} appears in {homes} categories", entry.id);
    }
}

#[test]
fn param_counts_stay_under_the_contract_bound() {
    for entry in all_engines() {
        assert!(
            param_count(entry.id) <= marea_core::MAX_PARAMS,
            "engine {} exceeds the parameter bound",
            entry.id
        );
    }
}

#[test]
fn tape_echo_ships_its_documented_defaults() {
    let defaults = defaults_for(ids::TAPE_ECHO);
    assert_eq!(&defaults[..5], &[0.375, 0.35, 0.25, 0.3, 0.35]);
    assert_eq!(defaults.get(5), Some(&0.0), "sync defaults off");
    assert_eq!(mix_param_index(ids::TAPE_ECHO), Some(4));
    assert_eq!(category_of(ids::TAPE_ECHO), Some(EngineCategory::Delay));
}

#[test]
fn table_validates_against_live_engines() {
    validate().unwrap();
}

#[test]
fn create_covers_the_whole_id_space() {
    for id in 0..ids::ENGINE_COUNT {
        let engine = create(id, 48_000.0).unwrap_or_else(|| panic!("id {id} missing"));
        assert_eq!(engine.info().id, id);
    }
    assert!(create(ids::ENGINE_COUNT, 48_000.0).is_none());
}

#[test]
fn created_engines_process_silence_without_artifacts() {
    for id in 0..ids::ENGINE_COUNT {
        let mut engine = create(id, 48_000.0).unwrap();
        let mut left = [0.0f32; 512];
        let mut right = [0.0f32; 512];
        let mut block = marea_core::StereoBlock::new(&mut left, &mut right);
        engine.process(&mut block);
        assert!(
            left.iter().chain(right.iter()).all(|s| s.is_finite()),
            "engine {id} produced non-finite output from silence"
        );
    }
}
