//! Migration and codec benchmarks at increasing settlement sizes.
//!
//! Measures the v1 -> current migration chain, schema validation, the
//! document codec and the full load pipeline (including backups) for legacy
//! saves with 100, 1 000 and 10 000 structures.
//!
//! Run with: `cargo bench -p hearth_save --bench migration_bench`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use serde_json::{json, Map, Value};

use hearth_save::migration_engine::MigrationEngine;
use hearth_save::save_codec::{decode_document, encode_document};
use hearth_save::save_migrate::build_migration_registry;
use hearth_save::save_types::{StructureKind, STRUCTURE_STATUSES};
use hearth_save::save_validate::validate;
use hearth_save::{
    Document, FixedClock, MemoryStorage, SaveConfig, SaveEngine, CURRENT_SAVE_VERSION,
    OLDEST_SUPPORTED_VERSION,
};

const NOW: u64 = 1_700_000_000_000;
const SIZES: [usize; 3] = [100, 1_000, 10_000];

// ---------------------------------------------------------------------------
// Helpers: synthetic legacy saves
// ---------------------------------------------------------------------------

/// Untagged legacy save with `structure_count` structures laid out on a grid.
fn build_legacy_save(structure_count: usize) -> Document {
    let structures: Vec<Value> = (0..structure_count)
        .map(|i| {
            let kind = StructureKind::ALL[i % StructureKind::ALL.len()];
            let status = STRUCTURE_STATUSES[i % STRUCTURE_STATUSES.len()];
            json!({
                "id": format!("b{i}"),
                "type": kind.tag(),
                "position": {"x": (i % 100) as i64 - 50, "y": 0, "z": (i / 100) as i64},
                "status": status,
                "progress": (i * 7) % 101,
            })
        })
        .collect();

    let mut resources = Map::new();
    for (i, name) in ["gold", "wood", "stone", "grain"].iter().enumerate() {
        resources.insert(name.to_string(), json!(structure_count * (i + 1)));
    }

    let mut doc = Document::new();
    doc.insert("structures", Value::Array(structures));
    doc.insert("resources", Value::Object(resources));
    doc.insert("timestamp", json!(NOW));
    doc.insert("playtime", json!(structure_count * 30));
    doc.insert("tier", json!(2));
    doc
}

fn migrations() -> MigrationEngine {
    MigrationEngine::new(build_migration_registry(), Arc::new(FixedClock(NOW)))
}

fn size_label(count: usize) -> String {
    format!("{count}_structures")
}

// ---------------------------------------------------------------------------
// 1. MIGRATION CHAIN (v1 -> current, no backups)
// ---------------------------------------------------------------------------

fn bench_migrate_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("migrate_chain");
    group.sample_size(10);
    let engine = migrations();

    for &count in &SIZES {
        let doc = build_legacy_save(count);
        let id = BenchmarkId::new("v1_to_current", size_label(count));
        group.bench_with_input(id, &doc, |b, doc| {
            b.iter(|| {
                black_box(
                    engine
                        .migrate(doc, OLDEST_SUPPORTED_VERSION, CURRENT_SAVE_VERSION)
                        .unwrap(),
                )
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 2. VALIDATION
// ---------------------------------------------------------------------------

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    group.sample_size(10);
    let engine = migrations();

    for &count in &SIZES {
        let current = engine
            .migrate(&build_legacy_save(count), OLDEST_SUPPORTED_VERSION, CURRENT_SAVE_VERSION)
            .unwrap();
        group.bench_with_input(BenchmarkId::new("current", size_label(count)), &current, |b, doc| {
            b.iter(|| black_box(validate(doc).is_valid));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 3. CODEC (JSON + header, with and without LZ4)
// ---------------------------------------------------------------------------

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.sample_size(10);

    for &count in &SIZES {
        let doc = build_legacy_save(count);
        for compress in [false, true] {
            let mode = if compress { "lz4" } else { "plain" };
            group.bench_with_input(
                BenchmarkId::new(format!("encode_{mode}"), size_label(count)),
                &doc,
                |b, doc| {
                    b.iter(|| black_box(encode_document(doc, compress, NOW).unwrap()));
                },
            );

            let bytes = encode_document(&doc, compress, NOW).unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("decode_{mode}"), size_label(count)),
                &bytes,
                |b, bytes| {
                    b.iter(|| black_box(decode_document(bytes).unwrap()));
                },
            );
        }
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 4. FULL LOAD PIPELINE: decode + migrate with backups + validate
// ---------------------------------------------------------------------------

fn bench_full_load_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_full_pipeline");
    group.sample_size(10);

    for &count in &SIZES {
        let bytes = serde_json::to_vec(&build_legacy_save(count)).unwrap();
        let id = BenchmarkId::new("legacy_json", size_label(count));
        group.bench_with_input(id, &bytes, |b, bytes| {
            // Fresh storage per iteration so backups do not pile up.
            b.iter_batched(
                || {
                    SaveEngine::with_clock(
                        Arc::new(MemoryStorage::new()),
                        SaveConfig::default(),
                        Arc::new(FixedClock(NOW)),
                    )
                },
                |engine| black_box(engine.load(bytes).unwrap()),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Register all benchmark groups
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_migrate_chain,
    bench_validate,
    bench_codec,
    bench_full_load_pipeline,
);
criterion_main!(benches);
