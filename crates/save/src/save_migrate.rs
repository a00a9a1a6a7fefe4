// ---------------------------------------------------------------------------
// Save migration steps
// ---------------------------------------------------------------------------
//
// This module defines the concrete migration steps.  The chain is built via
// `build_migration_registry()`, which validates that every version
// transition from OLDEST_SUPPORTED_VERSION to CURRENT_SAVE_VERSION is
// covered.  Each step clones its input and only adds or rewrites the fields
// its version introduces; everything else passes through verbatim.

use serde_json::{json, Map, Value};

use crate::save_migrate_registry::{MigrationRegistry, MigrationStep};
use crate::save_types::{
    keys, starter_unlocks, Document, StepError, StructureKind, CURRENT_SAVE_VERSION,
    DEFAULT_ZONE_ID, DEFAULT_ZONE_MAX_RADIUS, DEFAULT_ZONE_RADIUS, OLDEST_SUPPORTED_VERSION,
};

/// Build the full migration registry with all version transition steps.
///
/// The registry constructor validates the chain is contiguous (no gaps).
pub fn build_migration_registry() -> MigrationRegistry {
    let steps = vec![
        // v1 -> v2: explicit tagging, actor roster.
        MigrationStep {
            from_version: 1,
            description: "Add actor roster and actor id counter; seed timestamp, playtime, tier",
            migrate_fn: add_actor_roster,
        },
        // v2 -> v3: worker assignment per structure.
        MigrationStep {
            from_version: 2,
            description: "Add unassigned work slots to every structure",
            migrate_fn: add_work_slots,
        },
        // v3 -> v4: spatial zones.
        MigrationStep {
            from_version: 3,
            description: "Add default zone containing all placed structures",
            migrate_fn: add_default_zone,
        },
        // v4 -> v5: technology progression.
        MigrationStep {
            from_version: 4,
            description: "Add technology block with tier starter unlocks",
            migrate_fn: add_technology,
        },
    ];

    MigrationRegistry::new(steps, OLDEST_SUPPORTED_VERSION, CURRENT_SAVE_VERSION)
}

/// Refuse to overwrite a block the step is supposed to introduce.  A
/// document that already has it was mis-tagged, and overwriting would
/// silently drop player data.
fn ensure_absent(doc: &Document, key: &str) -> Result<(), StepError> {
    if doc.contains_key(key) {
        return Err(StepError::new(
            key,
            "already present in a document that predates it; refusing to overwrite",
        ));
    }
    Ok(())
}

fn structures_mut(doc: &mut Document) -> Result<&mut Vec<Value>, StepError> {
    doc.get_mut(keys::STRUCTURES)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| StepError::new(keys::STRUCTURES, "expected an array of structures"))
}

fn structure_object(index: usize, value: &Value) -> Result<&Map<String, Value>, StepError> {
    value
        .as_object()
        .ok_or_else(|| StepError::new(format!("structures[{index}]"), "expected an object"))
}

fn add_actor_roster(doc: &Document) -> Result<Document, StepError> {
    ensure_absent(doc, keys::ACTORS)?;
    ensure_absent(doc, keys::NEXT_ACTOR_ID)?;

    let mut next = doc.clone();
    next.insert(keys::ACTORS, Value::Array(Vec::new()));
    next.insert(keys::NEXT_ACTOR_ID, json!(0));

    // Fields optional in untagged saves become required from v2 on.
    if !next.contains_key(keys::TIMESTAMP) {
        next.insert(keys::TIMESTAMP, json!(0));
    }
    if !next.contains_key(keys::PLAYTIME) {
        next.insert(keys::PLAYTIME, json!(0));
    }
    if !next.contains_key(keys::TIER) {
        next.insert(keys::TIER, json!(1));
    }
    Ok(next)
}

fn add_work_slots(doc: &Document) -> Result<Document, StepError> {
    let mut next = doc.clone();
    for (index, structure) in structures_mut(&mut next)?.iter_mut().enumerate() {
        let object = structure
            .as_object_mut()
            .ok_or_else(|| StepError::new(format!("structures[{index}]"), "expected an object"))?;
        if object.contains_key(keys::WORK_SLOTS) {
            continue;
        }
        let tag = object.get(keys::TYPE).and_then(Value::as_str);
        let kind = tag.and_then(StructureKind::from_tag).ok_or_else(|| {
            StepError::new(
                format!("structures[{index}].{}", keys::TYPE),
                format!("cannot size work slots for structure type {tag:?}"),
            )
        })?;
        object.insert(
            keys::WORK_SLOTS.to_string(),
            Value::Array(vec![Value::Null; kind.work_slots()]),
        );
    }
    Ok(next)
}

/// Horizontal distance of a structure from the origin, if it has a usable
/// position.
fn planar_distance(structure: &Map<String, Value>) -> Option<f64> {
    let position = structure.get(keys::POSITION)?.as_object()?;
    let x = position.get("x")?.as_f64()?;
    let z = position.get("z")?.as_f64()?;
    Some(x.hypot(z))
}

fn add_default_zone(doc: &Document) -> Result<Document, StepError> {
    ensure_absent(doc, keys::ZONES)?;

    // Runs after the v2 -> v3 step, so work slots are already present and
    // are counted from the migrated structures, not re-derived.
    let mut structure_ids = Vec::new();
    let mut farthest = 0.0_f64;
    let mut work_slot_capacity = 0_usize;
    let mut assigned_workers = 0_usize;
    let structures = doc
        .get(keys::STRUCTURES)
        .and_then(Value::as_array)
        .ok_or_else(|| StepError::new(keys::STRUCTURES, "expected an array of structures"))?;
    for (index, value) in structures.iter().enumerate() {
        let structure = structure_object(index, value)?;
        let id = structure
            .get(keys::ID)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                StepError::new(
                    format!("structures[{index}].{}", keys::ID),
                    "zone membership needs a string id",
                )
            })?;
        structure_ids.push(Value::from(id));
        farthest = farthest.max(planar_distance(structure).unwrap_or(0.0));
        if let Some(slots) = structure.get(keys::WORK_SLOTS).and_then(Value::as_array) {
            work_slot_capacity += slots.len();
            assigned_workers += slots.iter().filter(|slot| !slot.is_null()).count();
        }
    }

    let radius = DEFAULT_ZONE_RADIUS.max(farthest.ceil());
    let zone = json!({
        "id": DEFAULT_ZONE_ID,
        "name": "Settlement",
        "center": {"x": 0, "y": 0, "z": 0},
        "radius": radius,
        "max_radius": radius.max(DEFAULT_ZONE_MAX_RADIUS),
        "expansions": 0,
        "structure_ids": structure_ids,
        "stats": {
            "population": doc.actors().len(),
            "structure_count": structures.len(),
            "work_slot_capacity": work_slot_capacity,
            "assigned_workers": assigned_workers,
        },
    });

    let mut next = doc.clone();
    next.insert(keys::ZONES, Value::Array(vec![zone]));
    Ok(next)
}

fn add_technology(doc: &Document) -> Result<Document, StepError> {
    ensure_absent(doc, keys::TECHNOLOGY)?;

    let tier = match doc.get(keys::TIER) {
        None => 1,
        Some(value) => value
            .as_u64()
            .ok_or_else(|| StepError::new(keys::TIER, "expected a non-negative integer"))?,
    };

    let mut next = doc.clone();
    next.insert(
        keys::TECHNOLOGY,
        json!({
            "unlocked": starter_unlocks(tier),
            "research_points": 0,
            "active": null,
        }),
    );
    Ok(next)
}
