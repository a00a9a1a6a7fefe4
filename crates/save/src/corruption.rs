// ---------------------------------------------------------------------------
// Corruption detection: semantic problems in structurally valid documents
// ---------------------------------------------------------------------------
//
// Detection never modifies the document and never panics, even on input
// that failed structural validation: missing or mistyped fields are simply
// skipped.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use crate::save_types::{keys, Document};

/// How a corruption finding is handled by recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Worth logging; not an error and never changed.
    Advisory,
    /// Repaired automatically with a deterministic fix.
    Soft,
    /// Cannot be repaired; the load is rejected.
    Hard,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Advisory => "advisory",
            Severity::Soft => "soft",
            Severity::Hard => "hard",
        })
    }
}

/// One kind of semantic problem.
#[derive(Debug, Clone, PartialEq)]
pub enum CorruptionKind {
    /// The settlement has no structures at all.
    EmptyStructures,
    /// A resource ledger entry is below zero.
    NegativeResource { resource: String, amount: f64 },
    /// `next_actor_id` would hand out an id below the roster size.
    ActorIdCounterBehind { counter: u64, roster: usize },
    /// An actor is assigned to a structure that does not exist.
    DanglingActorStructure {
        actor_id: String,
        structure_id: String,
    },
    /// A zone lists a structure that does not exist.
    DanglingZoneStructure {
        zone_id: String,
        structure_id: String,
    },
    /// A structure's work slot holds an actor that does not exist.
    DanglingWorkSlotActor {
        structure_id: String,
        actor_id: String,
    },
}

impl CorruptionKind {
    pub fn severity(&self) -> Severity {
        match self {
            CorruptionKind::EmptyStructures => Severity::Advisory,
            CorruptionKind::NegativeResource { .. }
            | CorruptionKind::ActorIdCounterBehind { .. } => Severity::Soft,
            CorruptionKind::DanglingActorStructure { .. }
            | CorruptionKind::DanglingZoneStructure { .. }
            | CorruptionKind::DanglingWorkSlotActor { .. } => Severity::Hard,
        }
    }
}

impl fmt::Display for CorruptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorruptionKind::EmptyStructures => write!(f, "settlement has no structures"),
            CorruptionKind::NegativeResource { resource, amount } => {
                write!(f, "resource `{resource}` is negative ({amount})")
            }
            CorruptionKind::ActorIdCounterBehind { counter, roster } => write!(
                f,
                "next_actor_id is {counter} but {roster} actor(s) exist"
            ),
            CorruptionKind::DanglingActorStructure {
                actor_id,
                structure_id,
            } => write!(
                f,
                "actor `{actor_id}` is assigned to missing structure `{structure_id}`"
            ),
            CorruptionKind::DanglingZoneStructure {
                zone_id,
                structure_id,
            } => write!(
                f,
                "zone `{zone_id}` references missing structure `{structure_id}`"
            ),
            CorruptionKind::DanglingWorkSlotActor {
                structure_id,
                actor_id,
            } => write!(
                f,
                "structure `{structure_id}` has missing actor `{actor_id}` in a work slot"
            ),
        }
    }
}

/// A single finding, with its severity and a human-readable description.
#[derive(Debug, Clone, PartialEq)]
pub struct CorruptionReport {
    pub kind: CorruptionKind,
    pub description: String,
    pub severity: Severity,
}

impl CorruptionReport {
    pub fn new(kind: CorruptionKind) -> Self {
        Self {
            description: kind.to_string(),
            severity: kind.severity(),
            kind,
        }
    }
}

fn id_of(entity: &Value) -> Option<&str> {
    entity.get(keys::ID).and_then(Value::as_str)
}

fn ids(entities: &[Value]) -> HashSet<&str> {
    entities.iter().filter_map(id_of).collect()
}

/// Scan `doc` for semantic problems.  Reports come back in a fixed order:
/// empty roster, resources (ledger order), actor counter, actor
/// assignments, zones, work slots.
pub fn detect_corruption(doc: &Document) -> Vec<CorruptionReport> {
    let mut reports = Vec::new();
    let structures = doc.structures();
    let actors = doc.actors();
    let structure_ids = ids(structures);
    let actor_ids = ids(actors);

    if doc.get(keys::STRUCTURES).is_some_and(Value::is_array) && structures.is_empty() {
        reports.push(CorruptionReport::new(CorruptionKind::EmptyStructures));
    }

    if let Some(resources) = doc.resources() {
        for (resource, amount) in resources {
            if let Some(amount) = amount.as_f64().filter(|a| *a < 0.0) {
                reports.push(CorruptionReport::new(CorruptionKind::NegativeResource {
                    resource: resource.clone(),
                    amount,
                }));
            }
        }
    }

    if let Some(counter) = doc.get(keys::NEXT_ACTOR_ID).and_then(Value::as_u64) {
        if counter < actors.len() as u64 {
            reports.push(CorruptionReport::new(CorruptionKind::ActorIdCounterBehind {
                counter,
                roster: actors.len(),
            }));
        }
    }

    for actor in actors {
        let assigned = actor.get(keys::ASSIGNED_STRUCTURE).and_then(Value::as_str);
        if let Some(structure_id) = assigned.filter(|s| !structure_ids.contains(s)) {
            reports.push(CorruptionReport::new(CorruptionKind::DanglingActorStructure {
                actor_id: id_of(actor).unwrap_or("<unknown>").to_string(),
                structure_id: structure_id.to_string(),
            }));
        }
    }

    for zone in doc.zones() {
        let listed = zone
            .get(keys::STRUCTURE_IDS)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for structure_id in listed.iter().filter_map(Value::as_str) {
            if !structure_ids.contains(structure_id) {
                reports.push(CorruptionReport::new(CorruptionKind::DanglingZoneStructure {
                    zone_id: id_of(zone).unwrap_or("<unknown>").to_string(),
                    structure_id: structure_id.to_string(),
                }));
            }
        }
    }

    for structure in structures {
        let slots = structure
            .get(keys::WORK_SLOTS)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for actor_id in slots.iter().filter_map(Value::as_str) {
            if !actor_ids.contains(actor_id) {
                reports.push(CorruptionReport::new(CorruptionKind::DanglingWorkSlotActor {
                    structure_id: id_of(structure).unwrap_or("<unknown>").to_string(),
                    actor_id: actor_id.to_string(),
                }));
            }
        }
    }

    reports
}
