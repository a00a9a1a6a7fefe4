// ---------------------------------------------------------------------------
// Version detection for tagged and untagged (legacy) save documents
// ---------------------------------------------------------------------------
//
// An explicit `version` field is authoritative.  Documents written before
// explicit tagging are recognised by an ordered list of structural
// heuristics; the first match wins.  A heuristic only matches when it can
// also confirm that none of the fields introduced by later versions are
// present, so a damaged modern save that lost its tag is reported as
// undetectable instead of being mistaken for a legacy save.

use bevy::log::debug;
use serde_json::Value;

use crate::save_types::{keys, Document, OLDEST_SUPPORTED_VERSION};

/// Fields that only exist from some version after the oldest one.  Their
/// presence rules out every legacy heuristic.
pub const VERSION_GATED_FIELDS: [&str; 5] = [
    keys::ACTORS,
    keys::NEXT_ACTOR_ID,
    keys::ZONES,
    keys::TECHNOLOGY,
    keys::MIGRATIONS,
];

/// A structural test identifying one untagged legacy version.
pub struct VersionHeuristic {
    pub name: &'static str,
    pub version: u32,
    pub matches: fn(&Document) -> bool,
}

/// Heuristics in evaluation order.
pub const LEGACY_HEURISTICS: &[VersionHeuristic] = &[VersionHeuristic {
    name: "structures roster with no version-gated fields",
    version: OLDEST_SUPPORTED_VERSION,
    matches: is_untagged_structures_only,
}];

fn is_untagged_structures_only(doc: &Document) -> bool {
    doc.get(keys::STRUCTURES).is_some_and(Value::is_array)
        && VERSION_GATED_FIELDS
            .iter()
            .all(|field| !doc.contains_key(field))
}

/// Parse an explicit version tag. Only positive integers are valid.
pub fn parse_version_tag(value: &Value) -> Option<u32> {
    value
        .as_u64()
        .filter(|&v| v >= 1)
        .and_then(|v| u32::try_from(v).ok())
}

/// Determine the version of `doc`.
///
/// Returns `None` when the document carries a malformed tag or when no
/// heuristic recognises an untagged document; callers must treat that as
/// `VersionUndetectable` and never fall back to a default.
pub fn detect_version(doc: &Document) -> Option<u32> {
    if let Some(tag) = doc.version_field() {
        let parsed = parse_version_tag(tag);
        if parsed.is_none() {
            debug!("Version detection: malformed version tag {tag}");
        }
        return parsed;
    }

    let heuristic = LEGACY_HEURISTICS.iter().find(|h| (h.matches)(doc))?;
    debug!(
        "Version detection: untagged save matched '{}' -> v{}",
        heuristic.name, heuristic.version
    );
    Some(heuristic.version)
}
