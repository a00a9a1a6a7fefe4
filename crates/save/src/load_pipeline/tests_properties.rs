// ---------------------------------------------------------------------------
// tests_properties – Pipeline properties over generated documents
// ---------------------------------------------------------------------------
//
// Documents are generated with a deterministic xorshift RNG so failures are
// reproducible from the seed.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::SaveEngine;
use crate::clock::FixedClock;
use crate::corruption::detect_corruption;
use crate::corruption_recovery::recover;
use crate::save_codec::encode_document;
use crate::save_config::SaveConfig;
use crate::save_error::SaveError;
use crate::save_types::{
    keys, Document, StructureKind, CURRENT_SAVE_VERSION, OLDEST_SUPPORTED_VERSION,
    STRUCTURE_STATUSES,
};
use crate::save_validate::validate;
use crate::storage::MemoryStorage;

const NOW: u64 = 1_700_000_000_000;

/// Simple deterministic pseudo-random number generator (xorshift64).
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn gen_range(&mut self, lo: usize, hi: usize) -> usize {
        if lo >= hi {
            return lo;
        }
        (self.next_u64() as usize) % (hi - lo) + lo
    }

    fn coordinate(&mut self) -> i64 {
        self.gen_range(0, 201) as i64 - 100
    }

    fn chance(&mut self, percent: usize) -> bool {
        self.gen_range(0, 100) < percent
    }
}

/// A random, well-formed untagged legacy save.
fn random_legacy_save(rng: &mut Rng) -> Document {
    let count = rng.gen_range(1, 9);
    let structures: Vec<Value> = (0..count)
        .map(|i| {
            let kind = StructureKind::ALL[rng.gen_range(0, StructureKind::ALL.len())];
            let status = STRUCTURE_STATUSES[rng.gen_range(0, STRUCTURE_STATUSES.len())];
            json!({
                "id": format!("b{i}"),
                "type": kind.tag(),
                "position": {
                    "x": rng.coordinate(),
                    "y": rng.gen_range(0, 4),
                    "z": rng.coordinate()
                },
                "status": status,
                "progress": rng.gen_range(0, 101),
            })
        })
        .collect();

    let mut resources = Map::new();
    for name in ["gold", "wood", "stone", "grain"] {
        if rng.chance(75) {
            resources.insert(name.to_string(), json!(rng.gen_range(0, 1000)));
        }
    }

    let mut doc = Document::new();
    doc.insert(keys::STRUCTURES, Value::Array(structures));
    doc.insert(keys::RESOURCES, Value::Object(resources));
    if rng.chance(50) {
        doc.insert(keys::TIMESTAMP, json!(NOW - rng.gen_range(0, 1_000_000) as u64));
    }
    if rng.chance(50) {
        doc.insert(keys::PLAYTIME, json!(rng.gen_range(0, 100_000)));
    }
    if rng.chance(50) {
        doc.insert(keys::TIER, json!(rng.gen_range(0, 5)));
    }
    if rng.chance(30) {
        doc.insert("mod_data", json!({"seed": rng.next_u64() % 1000}));
    }
    doc
}

fn engine_with(config: SaveConfig) -> SaveEngine {
    SaveEngine::with_clock(Arc::new(MemoryStorage::new()), config, Arc::new(FixedClock(NOW)))
}

fn engine() -> SaveEngine {
    engine_with(SaveConfig::default())
}

#[test]
fn test_oldest_to_current_always_validates() {
    let engine = engine();
    let mut rng = Rng::new(0xDEAD_BEEF_CAFE_1234);
    for trial in 0..40 {
        let doc = random_legacy_save(&mut rng);
        let out = engine
            .migrations()
            .migrate(&doc, OLDEST_SUPPORTED_VERSION, CURRENT_SAVE_VERSION)
            .unwrap_or_else(|e| panic!("trial {trial}: migration failed: {e}"));
        assert_eq!(out.get(keys::VERSION), Some(&json!(CURRENT_SAVE_VERSION)));
        let result = validate(&out);
        assert!(result.is_valid, "trial {trial}: {:#?}", result.errors);
    }
}

#[test]
fn test_migrate_never_mutates_input() {
    let engine = engine();
    let mut rng = Rng::new(0xBAAD_F00D_1234_5678);
    for trial in 0..20 {
        let doc = random_legacy_save(&mut rng);
        let before = doc.clone();
        engine
            .migrations()
            .migrate(&doc, OLDEST_SUPPORTED_VERSION, CURRENT_SAVE_VERSION)
            .unwrap();
        assert_eq!(doc, before, "trial {trial}: input was mutated");
    }
}

#[test]
fn test_migrating_current_document_is_identity() {
    let engine = engine();
    let mut rng = Rng::new(0x1234_5678_9ABC_DEF0);
    for _ in 0..10 {
        let current = engine
            .migrations()
            .migrate(&random_legacy_save(&mut rng), 1, CURRENT_SAVE_VERSION)
            .unwrap();
        let again = engine
            .migrations()
            .migrate(&current, CURRENT_SAVE_VERSION, CURRENT_SAVE_VERSION)
            .unwrap();
        assert_eq!(again, current);
        assert_eq!(again.migration_history().len(), current.migration_history().len());
    }
}

#[test]
fn test_load_of_save_round_trips() {
    for compress in [true, false] {
        let engine = engine_with(SaveConfig {
            compress,
            ..Default::default()
        });
        let mut rng = Rng::new(0xFEED_FACE_DEAD_BEEF);
        for trial in 0..15 {
            let current = engine
                .migrations()
                .migrate(&random_legacy_save(&mut rng), 1, CURRENT_SAVE_VERSION)
                .unwrap();
            let bytes = engine.save(&current).unwrap();
            let loaded = engine.load(&bytes).unwrap();
            assert_eq!(loaded, current, "trial {trial} (compress: {compress})");
        }
    }
}

#[test]
fn test_future_versions_always_rejected() {
    let engine = engine();
    let mut rng = Rng::new(0x0F0F_0F0F_0F0F_0F0F);
    let valid_current = engine
        .migrations()
        .migrate(&random_legacy_save(&mut rng), 1, CURRENT_SAVE_VERSION)
        .unwrap();

    for version in [CURRENT_SAVE_VERSION + 1, CURRENT_SAVE_VERSION + 2, 99, u32::MAX] {
        let bodies = [
            valid_current.clone(),
            random_legacy_save(&mut rng),
            Document::new(),
        ];
        for mut body in bodies {
            body.set_version(version);
            let bytes = serde_json::to_vec(&body).unwrap();
            match engine.load(&bytes) {
                Err(SaveError::UnsupportedFutureVersion { found, supported }) => {
                    assert_eq!(found, version);
                    assert_eq!(supported, CURRENT_SAVE_VERSION);
                }
                other => panic!("v{version} should be rejected, got {other:?}"),
            }
            assert!(!validate(&body).is_valid);
        }
    }
    assert!(engine.backups().list_all().unwrap().is_empty());
}

#[test]
fn test_recovery_clamps_only_negative_amounts() {
    let mut rng = Rng::new(0xC1A3_0000_0000_0001);
    for trial in 0..30 {
        let mut ledger = Map::new();
        for i in 0..rng.gen_range(1, 8) {
            let magnitude = rng.gen_range(0, 500) as i64;
            let amount = if rng.chance(50) { -magnitude } else { magnitude };
            ledger.insert(format!("res{i}"), json!(amount));
        }
        let doc = Document::try_from(json!({
            "version": 2,
            "structures": [{"id": "b1"}],
            "resources": Value::Object(ledger.clone()),
        }))
        .unwrap();

        let fixed = recover(doc.clone(), &detect_corruption(&doc)).unwrap();
        let fixed_ledger = fixed.resources().unwrap();
        for (name, original) in &ledger {
            let amount = original.as_i64().unwrap();
            if amount < 0 {
                assert_eq!(fixed_ledger[name], json!(0), "trial {trial}: {name}");
            } else {
                assert_eq!(&fixed_ledger[name], original, "trial {trial}: {name}");
            }
        }
    }
}

#[test]
fn test_dangling_actor_reference_rejected_naming_actor() {
    let engine = engine();
    let mut rng = Rng::new(0xA11C_E000_0000_0001);
    for trial in 0..10 {
        let mut current = engine
            .migrations()
            .migrate(&random_legacy_save(&mut rng), 1, CURRENT_SAVE_VERSION)
            .unwrap();
        let actor_id = format!("n{trial}");
        current.insert(
            keys::ACTORS,
            json!([{
                "id": actor_id,
                "name": "Stray",
                "role": "HAULER",
                "morale": 50,
                "skills": {},
                "assigned_structure": "b-missing"
            }]),
        );
        current.insert(keys::NEXT_ACTOR_ID, json!(1));

        match engine.load_document(current) {
            Err(SaveError::CorruptionUnrecoverable(reports)) => {
                assert!(
                    reports.iter().any(|r| r.description.contains(&actor_id)),
                    "trial {trial}: reports should name {actor_id}: {reports:?}"
                );
            }
            other => panic!("trial {trial}: expected CorruptionUnrecoverable, got {other:?}"),
        }
    }
}

#[test]
fn test_every_transition_backed_up_and_rollback_restores_snapshot() {
    let engine = engine();
    let mut rng = Rng::new(0xBAC0_0000_0000_0001);
    let original = random_legacy_save(&mut rng);
    let bytes = serde_json::to_vec(&original).unwrap();

    let report = engine.load_with_report(&bytes).unwrap();
    assert_eq!(report.backups.len(), (CURRENT_SAVE_VERSION - OLDEST_SUPPORTED_VERSION) as usize);

    for version in OLDEST_SUPPORTED_VERSION..CURRENT_SAVE_VERSION {
        let ids = engine.list_backups(version).unwrap();
        assert_eq!(ids.len(), 1, "one backup for v{version}");

        // The document as it stood right before the v -> v+1 step.
        let expected = engine
            .migrations()
            .migrate(&original, OLDEST_SUPPORTED_VERSION, version)
            .unwrap();
        assert_eq!(engine.rollback(version).unwrap(), expected);

        let stored = engine.backups().read_raw(&ids[0]).unwrap();
        let reencoded =
            encode_document(&expected, engine.config().compress, ids[0].timestamp).unwrap();
        assert_eq!(stored, reencoded, "v{version} snapshot bytes differ");
    }
}
