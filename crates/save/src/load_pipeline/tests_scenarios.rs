// ---------------------------------------------------------------------------
// tests_scenarios – End-to-end load scenarios
// ---------------------------------------------------------------------------

use std::sync::Arc;

use serde_json::json;

use super::{LoadStage, SaveEngine};
use crate::clock::FixedClock;
use crate::corruption::{detect_corruption, CorruptionKind, Severity};
use crate::corruption_recovery::recover;
use crate::save_config::SaveConfig;
use crate::save_error::SaveError;
use crate::save_types::{
    keys, Document, CURRENT_SAVE_VERSION, OLDEST_SUPPORTED_VERSION, ZONES_SINCE,
};
use crate::storage::{MemoryStorage, Storage};
use crate::version_detect::detect_version;

const NOW: u64 = 1_700_000_000_000;

fn engine() -> (SaveEngine, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let engine = SaveEngine::with_clock(
        storage.clone(),
        SaveConfig::default(),
        Arc::new(FixedClock(NOW)),
    );
    (engine, storage)
}

fn doc(value: serde_json::Value) -> Document {
    Document::try_from(value).unwrap()
}

#[test]
fn test_scenario_legacy_save_gains_actor_roster() {
    let input = doc(json!({
        "structures": [{
            "id": "b1",
            "type": "WALL",
            "position": {"x": 0, "y": 0, "z": 0},
            "status": "COMPLETE",
            "progress": 100
        }],
        "resources": {"gold": 100, "wood": 50}
    }));
    assert_eq!(detect_version(&input), Some(OLDEST_SUPPORTED_VERSION));

    let (engine, _) = engine();
    let out = engine
        .migrations()
        .migrate(&input, OLDEST_SUPPORTED_VERSION, OLDEST_SUPPORTED_VERSION + 1)
        .unwrap();

    assert_eq!(out.get(keys::VERSION), Some(&json!(OLDEST_SUPPORTED_VERSION + 1)));
    assert_eq!(out.get(keys::ACTORS), Some(&json!([])));
    assert_eq!(out.get(keys::NEXT_ACTOR_ID), Some(&json!(0)));
    let history = out.migration_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from_version, OLDEST_SUPPORTED_VERSION);
    assert_eq!(history[0].to_version, OLDEST_SUPPORTED_VERSION + 1);
    assert!(!history[0].action.is_empty());

    // The same bytes load all the way to the current version.
    let loaded = engine.load(&serde_json::to_vec(&input).unwrap()).unwrap();
    assert_eq!(loaded.get(keys::VERSION), Some(&json!(CURRENT_SAVE_VERSION)));
    assert_eq!(loaded.resources().unwrap()["gold"], json!(100));
}

#[test]
fn test_scenario_v2_save_gets_default_zone_with_population() {
    let input = doc(json!({
        "version": 2,
        "timestamp": 1_699_540_000_000_u64,
        "structures": [
            {"id": "b1", "type": "HOUSE", "position": {"x": 4, "y": 0, "z": 4},
             "status": "COMPLETE", "progress": 100},
            {"id": "b2", "type": "FARM", "position": {"x": -10, "y": 0, "z": 6},
             "status": "IN_PROGRESS", "progress": 40}
        ],
        "actors": [
            {"id": "n1", "name": "Ada", "role": "FARMER", "morale": 80, "skills": {},
             "assigned_structure": "b2"},
            {"id": "n2", "name": "Bo", "role": "BUILDER", "morale": 55, "skills": {"masonry": 2}}
        ]
    }));

    let (engine, _) = engine();
    let out = engine.migrations().migrate(&input, 2, ZONES_SINCE).unwrap();

    let zones = out.zones();
    assert_eq!(zones.len(), 1, "exactly one default zone");
    assert_eq!(zones[0][keys::CENTER], json!({"x": 0, "y": 0, "z": 0}));
    assert_eq!(
        zones[0][keys::STATS]["population"],
        json!(out.actors().len()),
        "population must equal the actor count"
    );
    assert_eq!(zones[0][keys::STRUCTURE_IDS], json!(["b1", "b2"]));
    assert_eq!(out.get(keys::TIMESTAMP), Some(&json!(1_699_540_000_000_u64)));
}

#[test]
fn test_scenario_empty_roster_and_negative_gold() {
    let input = doc(json!({"version": 2, "structures": [], "resources": {"gold": -50}}));

    let reports = detect_corruption(&input);
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().any(|r| r.kind == CorruptionKind::EmptyStructures));
    assert!(reports.iter().any(|r| matches!(
        &r.kind,
        CorruptionKind::NegativeResource { resource, .. } if resource == "gold"
    )));

    let fixed = recover(input, &reports).unwrap();
    assert_eq!(fixed.resources().unwrap()["gold"], json!(0), "gold must be clamped");

    // The empty roster is only recorded; it is neither fixed nor fatal.
    let empty = reports
        .iter()
        .find(|r| r.kind == CorruptionKind::EmptyStructures)
        .unwrap();
    assert_eq!(empty.severity, Severity::Advisory);
    assert_eq!(fixed.get(keys::STRUCTURES), Some(&json!([])));
}

#[test]
fn test_scenario_empty_roster_and_negative_gold_through_pipeline() {
    let (engine, _) = engine();
    let mut current = engine
        .migrations()
        .migrate(&crate::save_migrate::tests::v2_save(), 2, CURRENT_SAVE_VERSION)
        .unwrap();
    current.insert(keys::STRUCTURES, json!([]));
    current.insert(keys::ACTORS, json!([]));
    current.insert(keys::ZONES, json!([]));
    current.insert(keys::RESOURCES, json!({"gold": -50}));

    let report = engine.load_document(current).unwrap();
    assert_eq!(report.document.resources().unwrap()["gold"], json!(0));
    assert_eq!(report.recovered.len(), 1);
    assert_eq!(report.advisories.len(), 1);
    assert_eq!(report.advisories[0].kind, CorruptionKind::EmptyStructures);
    assert_eq!(
        report.stages,
        vec![
            LoadStage::Received,
            LoadStage::VersionDetected(CURRENT_SAVE_VERSION),
            LoadStage::Validating,
            LoadStage::Recovering,
            LoadStage::Committed,
        ]
    );
}

#[test]
fn test_scenario_future_version_rejected_without_backup_writes() {
    let (engine, storage) = engine();
    let future = json!({"version": 99, "structures": [], "resources": {}});
    let bytes = serde_json::to_vec(&future).unwrap();

    let err = engine.load(&bytes).unwrap_err();
    assert!(
        matches!(err, SaveError::UnsupportedFutureVersion { found: 99, .. }),
        "got {err:?}"
    );
    assert!(storage.list("").unwrap().is_empty(), "backup store must be untouched");
}

#[test]
fn test_legacy_load_stage_trail() {
    let (engine, _) = engine();
    let bytes = serde_json::to_vec(&crate::save_migrate::tests::legacy_save()).unwrap();
    let report = engine.load_with_report(&bytes).unwrap();
    assert!(report.was_migrated());
    assert_eq!(report.original_version, 1);
    assert_eq!(
        report.stages,
        vec![
            LoadStage::Received,
            LoadStage::VersionDetected(1),
            LoadStage::Migrating {
                from: 1,
                to: CURRENT_SAVE_VERSION
            },
            LoadStage::Validating,
            LoadStage::Committed,
        ]
    );
}
