// ---------------------------------------------------------------------------
// tests_rejections – Every way a load, save or rollback can fail
// ---------------------------------------------------------------------------

use std::sync::Arc;

use serde_json::json;

use super::SaveEngine;
use crate::clock::FixedClock;
use crate::save_config::SaveConfig;
use crate::save_error::SaveError;
use crate::save_migrate::tests::{legacy_save, v2_save};
use crate::save_types::{keys, CURRENT_SAVE_VERSION};
use crate::storage::{MemoryStorage, Storage};

fn engine() -> (SaveEngine, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let engine =
        SaveEngine::with_clock(storage.clone(), SaveConfig::default(), Arc::new(FixedClock(7)));
    (engine, storage)
}

#[test]
fn test_undetectable_document_rejected_before_backups() {
    let (engine, storage) = engine();
    for body in [
        json!({}),
        json!({"resources": {"gold": 1}}),
        json!({"version": "3", "structures": []}),
        json!({"version": 0, "structures": []}),
        json!({"structures": [], "actors": []}),
    ] {
        let bytes = serde_json::to_vec(&body).unwrap();
        let err = engine.load(&bytes).unwrap_err();
        assert!(
            matches!(err, SaveError::VersionUndetectable),
            "{body} should be undetectable, got {err:?}"
        );
    }
    assert!(storage.list("").unwrap().is_empty());
}

#[test]
fn test_undecodable_bytes_rejected() {
    let (engine, _) = engine();
    for bytes in [&b""[..], &b"not json at all"[..], &b"[1, 2, 3]"[..], &b"HRTH\x00"[..]] {
        assert!(
            matches!(engine.load(bytes), Err(SaveError::Decode(_))),
            "{bytes:?} should fail to decode"
        );
    }
}

#[test]
fn test_failing_step_keeps_earlier_backups_and_names_step() {
    let (engine, _) = engine();
    let mut doc = legacy_save();
    doc.get_mut(keys::STRUCTURES).unwrap()[0][keys::TYPE] = json!("SPACEPORT");

    let err = engine.load(&serde_json::to_vec(&doc).unwrap()).unwrap_err();
    match err {
        SaveError::MigrationStepFailed {
            version,
            cause,
            backup,
        } => {
            assert_eq!(version, 2);
            assert_eq!(cause.path, "structures[0].type");
            assert_eq!(backup.map(|b| b.version), Some(2));
        }
        other => panic!("expected MigrationStepFailed, got {other:?}"),
    }
    assert_eq!(engine.list_backups(1).unwrap().len(), 1);
    assert_eq!(engine.rollback(1).unwrap(), doc);
}

#[test]
fn test_structural_failure_after_migration_is_fatal() {
    let (engine, _) = engine();
    let mut doc = legacy_save();
    doc.get_mut(keys::STRUCTURES).unwrap()[0]
        .as_object_mut()
        .unwrap()
        .remove(keys::POSITION);
    doc.insert(keys::RESOURCES, json!("plenty"));

    match engine.load(&serde_json::to_vec(&doc).unwrap()) {
        Err(SaveError::ValidationFailed(errors)) => {
            assert!(errors.iter().any(|e| e.contains("structures[0].position")), "{errors:?}");
            assert!(errors.iter().any(|e| e.starts_with("resources")), "{errors:?}");
        }
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
}

#[test]
fn test_mis_tagged_document_refused_by_step() {
    // Tagged v3 but already carries zones: the v3 -> v4 step must not
    // overwrite them.
    let (engine, _) = engine();
    let mut doc = engine.migrations().migrate(&v2_save(), 2, 3).unwrap();
    doc.insert(keys::ZONES, json!([{"id": "custom"}]));
    match engine.load_document(doc) {
        Err(SaveError::MigrationStepFailed { version: 3, cause, .. }) => {
            assert_eq!(cause.path, keys::ZONES);
        }
        other => panic!("expected MigrationStepFailed at v3, got {other:?}"),
    }
}

#[test]
fn test_rollback_without_backup() {
    let (engine, _) = engine();
    assert!(matches!(
        engine.rollback(3),
        Err(SaveError::RollbackNotFound(3))
    ));
}

#[test]
fn test_save_refuses_non_current_document() {
    let (engine, _) = engine();
    match engine.save(&v2_save()) {
        Err(SaveError::ValidationFailed(errors)) => assert!(!errors.is_empty()),
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
}

#[test]
fn test_save_of_loaded_document_is_accepted() {
    let (engine, _) = engine();
    let loaded = engine.load(&serde_json::to_vec(&v2_save()).unwrap()).unwrap();
    assert_eq!(loaded.get(keys::VERSION), Some(&json!(CURRENT_SAVE_VERSION)));
    let bytes = engine.save(&loaded).unwrap();
    assert_eq!(engine.load(&bytes).unwrap(), loaded);
}

#[test]
fn test_prune_uses_configured_retention() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = SaveEngine::with_clock(
        storage,
        SaveConfig {
            max_backups_per_version: 1,
            ..Default::default()
        },
        Arc::new(FixedClock(7)),
    );
    let bytes = serde_json::to_vec(&legacy_save()).unwrap();
    engine.load(&bytes).unwrap();
    engine.load(&bytes).unwrap();
    assert_eq!(engine.list_backups(1).unwrap().len(), 2);

    let removed = engine.prune_backups().unwrap();
    assert_eq!(removed.len(), (CURRENT_SAVE_VERSION - 1) as usize);
    for version in 1..CURRENT_SAVE_VERSION {
        assert_eq!(engine.list_backups(version).unwrap().len(), 1);
    }
}
