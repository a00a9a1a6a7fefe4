// ---------------------------------------------------------------------------
// Schema validation: version-specific structural checks
// ---------------------------------------------------------------------------
//
// Validation never stops at the first problem: every section contributes
// every violation it finds, each prefixed with the path of the offending
// field.  A document that passes for version V has every field V requires
// present and correctly typed.

use std::collections::HashSet;
use std::fmt::Display;

use serde_json::{Map, Value};

use crate::save_error::SaveError;
use crate::save_types::{
    json_type_name, keys, Document, MigrationRecord, StructureKind, ValidationResult,
    ACTORS_SINCE, ACTOR_ROLES, CURRENT_SAVE_VERSION, EXPLICIT_TAG_SINCE, MORALE_RANGE,
    STRUCTURE_STATUSES, TECHNOLOGY_SINCE, WORK_SLOTS_SINCE, ZONES_SINCE,
};
use crate::version_detect::{detect_version, parse_version_tag};

/// Accumulates violation messages.
#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn push(&mut self, path: impl Display, message: impl Display) {
        self.0.push(format!("{path}: {message}"));
    }

    fn wrong_type(&mut self, path: impl Display, expected: &str, found: &Value) {
        self.push(
            path,
            format_args!("expected {expected}, found {}", json_type_name(found)),
        );
    }
}

/// One block of the document and the version it first appears in.
struct SchemaSection {
    name: &'static str,
    since: u32,
    check: fn(&Document, u32, &mut Violations),
}

const SECTIONS: &[SchemaSection] = &[
    SchemaSection {
        name: "header",
        since: 1,
        check: check_header,
    },
    SchemaSection {
        name: "resources",
        since: 1,
        check: check_resources,
    },
    SchemaSection {
        name: "structures",
        since: 1,
        check: check_structures,
    },
    SchemaSection {
        name: "actors",
        since: ACTORS_SINCE,
        check: check_actors,
    },
    SchemaSection {
        name: "zones",
        since: ZONES_SINCE,
        check: check_zones,
    },
    SchemaSection {
        name: "technology",
        since: TECHNOLOGY_SINCE,
        check: check_technology,
    },
    SchemaSection {
        name: "migrations",
        since: 1,
        check: check_migrations,
    },
];

/// Validate `doc` against the schema of its own version.
///
/// A document whose version cannot be determined, or that is newer than
/// this build, fails without any section being checked.
pub fn validate(doc: &Document) -> ValidationResult {
    match detect_version(doc) {
        None => ValidationResult::from_errors(vec![format!(
            "{}: {}",
            keys::VERSION,
            SaveError::VersionUndetectable
        )]),
        Some(version) => validate_as(doc, version),
    }
}

/// Validate `doc` against the schema of `version`.
pub fn validate_as(doc: &Document, version: u32) -> ValidationResult {
    if version > CURRENT_SAVE_VERSION {
        let err = SaveError::UnsupportedFutureVersion {
            found: version,
            supported: CURRENT_SAVE_VERSION,
        };
        return ValidationResult::from_errors(vec![format!("{}: {err}", keys::VERSION)]);
    }

    let mut violations = Violations::default();
    for section in SECTIONS.iter().filter(|s| version >= s.since) {
        let before = violations.0.len();
        (section.check)(doc, version, &mut violations);
        if violations.0.len() > before {
            bevy::log::debug!(
                "Validation of v{} section `{}` found {} problem(s)",
                version,
                section.name,
                violations.0.len() - before
            );
        }
    }
    ValidationResult::from_errors(violations.0)
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Fetch a required array, reporting when it is absent or mistyped.
fn required_array<'a>(doc: &'a Document, key: &str, out: &mut Violations) -> &'a [Value] {
    match doc.get(key) {
        None => {
            out.push(key, "missing");
            &[]
        }
        Some(Value::Array(items)) => items,
        Some(other) => {
            out.wrong_type(key, "array", other);
            &[]
        }
    }
}

fn entity_object<'a>(
    path: &str,
    value: &'a Value,
    out: &mut Violations,
) -> Option<&'a Map<String, Value>> {
    let object = value.as_object();
    if object.is_none() {
        out.wrong_type(path, "object", value);
    }
    object
}

/// Check `id` is a string and not already seen.
fn check_id<'a>(
    path: &str,
    entity: &'a Map<String, Value>,
    seen: &mut HashSet<&'a str>,
    out: &mut Violations,
) {
    match entity.get(keys::ID) {
        None => out.push(format_args!("{path}.{}", keys::ID), "missing"),
        Some(Value::String(id)) => {
            if !seen.insert(id.as_str()) {
                out.push(format_args!("{path}.{}", keys::ID), format_args!("duplicate id {id:?}"));
            }
        }
        Some(other) => out.wrong_type(format_args!("{path}.{}", keys::ID), "string", other),
    }
}

fn check_enum(
    path: &str,
    entity: &Map<String, Value>,
    key: &str,
    allowed: &[&str],
    out: &mut Violations,
) {
    match entity.get(key) {
        None => out.push(format_args!("{path}.{key}"), "missing"),
        Some(Value::String(tag)) if allowed.contains(&tag.as_str()) => {}
        Some(Value::String(tag)) => out.push(
            format_args!("{path}.{key}"),
            format_args!("unknown value {tag:?}, expected one of {}", allowed.join(", ")),
        ),
        Some(other) => out.wrong_type(format_args!("{path}.{key}"), "string", other),
    }
}

/// Fetch a required number.  Reports and returns `None` when absent or
/// not numeric.
fn required_number(
    path: &str,
    entity: &Map<String, Value>,
    key: &str,
    out: &mut Violations,
) -> Option<f64> {
    match entity.get(key) {
        None => {
            out.push(format_args!("{path}.{key}"), "missing");
            None
        }
        Some(value) => {
            let number = value.as_f64();
            if number.is_none() {
                out.wrong_type(format_args!("{path}.{key}"), "number", value);
            }
            number
        }
    }
}

fn check_non_negative_integer(path: impl Display, value: Option<&Value>, out: &mut Violations) {
    match value {
        None => out.push(path, "missing"),
        Some(v) if v.is_u64() => {}
        Some(v) => out.push(
            path,
            format_args!("expected a non-negative integer, found {v}"),
        ),
    }
}

fn check_position(path: &str, entity: &Map<String, Value>, key: &str, out: &mut Violations) {
    let path = format!("{path}.{key}");
    match entity.get(key) {
        None => out.push(&path, "missing"),
        Some(Value::Object(position)) => {
            for axis in keys::AXES {
                match position.get(axis) {
                    None => out.push(format_args!("{path}.{axis}"), "missing"),
                    Some(v) if v.is_number() => {}
                    Some(v) => out.wrong_type(format_args!("{path}.{axis}"), "number", v),
                }
            }
        }
        Some(other) => out.wrong_type(&path, "object", other),
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

fn check_header(doc: &Document, version: u32, out: &mut Violations) {
    if version >= EXPLICIT_TAG_SINCE {
        match doc.version_field() {
            None => out.push(keys::VERSION, "missing"),
            Some(tag) => match parse_version_tag(tag) {
                Some(found) if found == version => {}
                Some(found) => out.push(
                    keys::VERSION,
                    format_args!(
                        "document is tagged v{found} but is being validated as v{version}"
                    ),
                ),
                None => out.push(
                    keys::VERSION,
                    format_args!("expected a positive integer, found {tag}"),
                ),
            },
        }
    }

    let required = version >= ACTORS_SINCE;
    let map = doc.as_map();
    match map.get(keys::TIMESTAMP) {
        None if !required => {}
        value => check_non_negative_integer(keys::TIMESTAMP, value, out),
    }
    match map.get(keys::TIER) {
        None if !required => {}
        value => check_non_negative_integer(keys::TIER, value, out),
    }
    match map.get(keys::PLAYTIME) {
        None if !required => {}
        None => out.push(keys::PLAYTIME, "missing"),
        Some(v) => match v.as_f64() {
            Some(secs) if secs >= 0.0 => {}
            Some(secs) => out.push(keys::PLAYTIME, format_args!("must be >= 0, found {secs}")),
            None => out.wrong_type(keys::PLAYTIME, "number", v),
        },
    }
}

fn check_resources(doc: &Document, _version: u32, out: &mut Violations) {
    match doc.get(keys::RESOURCES) {
        None => out.push(keys::RESOURCES, "missing"),
        Some(Value::Object(ledger)) => {
            for (name, amount) in ledger {
                if !amount.is_number() {
                    out.wrong_type(format_args!("{}.{name}", keys::RESOURCES), "number", amount);
                }
            }
        }
        Some(other) => out.wrong_type(keys::RESOURCES, "object", other),
    }
}

fn check_structures(doc: &Document, version: u32, out: &mut Violations) {
    let mut seen = HashSet::new();
    for (index, value) in required_array(doc, keys::STRUCTURES, out).iter().enumerate() {
        let path = format!("{}[{index}]", keys::STRUCTURES);
        let Some(structure) = entity_object(&path, value, out) else {
            continue;
        };

        check_id(&path, structure, &mut seen, out);

        match structure.get(keys::TYPE) {
            None => out.push(format_args!("{path}.{}", keys::TYPE), "missing"),
            Some(Value::String(tag)) if StructureKind::from_tag(tag).is_some() => {}
            Some(Value::String(tag)) => out.push(
                format_args!("{path}.{}", keys::TYPE),
                format_args!("unknown structure type {tag:?}"),
            ),
            Some(other) => out.wrong_type(format_args!("{path}.{}", keys::TYPE), "string", other),
        }

        check_position(&path, structure, keys::POSITION, out);
        check_enum(&path, structure, keys::STATUS, &STRUCTURE_STATUSES, out);

        if let Some(progress) = required_number(&path, structure, keys::PROGRESS, out) {
            if progress < 0.0 {
                out.push(
                    format_args!("{path}.{}", keys::PROGRESS),
                    format_args!("must be >= 0, found {progress}"),
                );
            }
        }

        if version >= WORK_SLOTS_SINCE {
            let slots_path = format!("{path}.{}", keys::WORK_SLOTS);
            match structure.get(keys::WORK_SLOTS) {
                None => out.push(&slots_path, "missing"),
                Some(Value::Array(slots)) => {
                    for (slot, occupant) in slots.iter().enumerate() {
                        if !(occupant.is_null() || occupant.is_string()) {
                            out.wrong_type(
                                format_args!("{slots_path}[{slot}]"),
                                "null or actor id",
                                occupant,
                            );
                        }
                    }
                }
                Some(other) => out.wrong_type(&slots_path, "array", other),
            }
        }
    }
}

fn check_actors(doc: &Document, _version: u32, out: &mut Violations) {
    let mut seen = HashSet::new();
    for (index, value) in required_array(doc, keys::ACTORS, out).iter().enumerate() {
        let path = format!("{}[{index}]", keys::ACTORS);
        let Some(actor) = entity_object(&path, value, out) else {
            continue;
        };

        check_id(&path, actor, &mut seen, out);

        match actor.get(keys::NAME) {
            None => out.push(format_args!("{path}.{}", keys::NAME), "missing"),
            Some(Value::String(name)) if !name.trim().is_empty() => {}
            Some(Value::String(_)) => {
                out.push(format_args!("{path}.{}", keys::NAME), "must not be empty")
            }
            Some(other) => out.wrong_type(format_args!("{path}.{}", keys::NAME), "string", other),
        }

        check_enum(&path, actor, keys::ROLE, &ACTOR_ROLES, out);

        if let Some(morale) = required_number(&path, actor, keys::MORALE, out) {
            if !MORALE_RANGE.contains(&morale) {
                out.push(
                    format_args!("{path}.{}", keys::MORALE),
                    format_args!(
                        "must be within [{}, {}], found {morale}",
                        MORALE_RANGE.start(),
                        MORALE_RANGE.end()
                    ),
                );
            }
        }

        match actor.get(keys::SKILLS) {
            None => out.push(format_args!("{path}.{}", keys::SKILLS), "missing"),
            Some(Value::Object(_)) => {}
            Some(other) => out.wrong_type(format_args!("{path}.{}", keys::SKILLS), "object", other),
        }

        match actor.get(keys::ASSIGNED_STRUCTURE) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(other) => out.wrong_type(
                format_args!("{path}.{}", keys::ASSIGNED_STRUCTURE),
                "null or structure id",
                other,
            ),
        }
    }

    check_non_negative_integer(keys::NEXT_ACTOR_ID, doc.get(keys::NEXT_ACTOR_ID), out);
}

fn check_zones(doc: &Document, _version: u32, out: &mut Violations) {
    let mut seen = HashSet::new();
    for (index, value) in required_array(doc, keys::ZONES, out).iter().enumerate() {
        let path = format!("{}[{index}]", keys::ZONES);
        let Some(zone) = entity_object(&path, value, out) else {
            continue;
        };

        check_id(&path, zone, &mut seen, out);
        check_position(&path, zone, keys::CENTER, out);

        let radius = required_number(&path, zone, keys::RADIUS, out);
        if let Some(r) = radius.filter(|r| *r <= 0.0) {
            out.push(
                format_args!("{path}.{}", keys::RADIUS),
                format_args!("must be > 0, found {r}"),
            );
        }
        let max_radius = required_number(&path, zone, keys::MAX_RADIUS, out);
        if let (Some(r), Some(max)) = (radius, max_radius) {
            if max < r {
                out.push(
                    format_args!("{path}.{}", keys::MAX_RADIUS),
                    format_args!("must be >= radius {r}, found {max}"),
                );
            }
        }

        check_non_negative_integer(
            format_args!("{path}.{}", keys::EXPANSIONS),
            zone.get(keys::EXPANSIONS),
            out,
        );

        let ids_path = format!("{path}.{}", keys::STRUCTURE_IDS);
        match zone.get(keys::STRUCTURE_IDS) {
            None => out.push(&ids_path, "missing"),
            Some(Value::Array(ids)) => {
                for (i, id) in ids.iter().enumerate() {
                    if !id.is_string() {
                        out.wrong_type(format_args!("{ids_path}[{i}]"), "string", id);
                    }
                }
            }
            Some(other) => out.wrong_type(&ids_path, "array", other),
        }

        match zone.get(keys::STATS) {
            None => out.push(format_args!("{path}.{}", keys::STATS), "missing"),
            Some(Value::Object(_)) => {}
            Some(other) => out.wrong_type(format_args!("{path}.{}", keys::STATS), "object", other),
        }
    }
}

fn check_technology(doc: &Document, _version: u32, out: &mut Violations) {
    let technology = match doc.get(keys::TECHNOLOGY) {
        None => {
            out.push(keys::TECHNOLOGY, "missing");
            return;
        }
        Some(Value::Object(technology)) => technology,
        Some(other) => {
            out.wrong_type(keys::TECHNOLOGY, "object", other);
            return;
        }
    };
    let path = keys::TECHNOLOGY;

    match technology.get(keys::UNLOCKED) {
        None => out.push(format_args!("{path}.{}", keys::UNLOCKED), "missing"),
        Some(Value::Array(unlocked)) => {
            for (i, entry) in unlocked.iter().enumerate() {
                if !entry.is_string() {
                    out.wrong_type(format_args!("{path}.{}[{i}]", keys::UNLOCKED), "string", entry);
                }
            }
        }
        Some(other) => out.wrong_type(format_args!("{path}.{}", keys::UNLOCKED), "array", other),
    }

    if let Some(points) = required_number(path, technology, keys::RESEARCH_POINTS, out) {
        if points < 0.0 {
            out.push(
                format_args!("{path}.{}", keys::RESEARCH_POINTS),
                format_args!("must be >= 0, found {points}"),
            );
        }
    }

    match technology.get(keys::ACTIVE) {
        None => out.push(format_args!("{path}.{}", keys::ACTIVE), "missing"),
        Some(Value::Null) | Some(Value::String(_)) => {}
        Some(other) => {
            out.wrong_type(format_args!("{path}.{}", keys::ACTIVE), "null or string", other)
        }
    }
}

fn check_migrations(doc: &Document, _version: u32, out: &mut Violations) {
    match doc.get(keys::MIGRATIONS) {
        None => {}
        Some(Value::Array(history)) => {
            for (i, entry) in history.iter().enumerate() {
                if let Err(e) = serde_json::from_value::<MigrationRecord>(entry.clone()) {
                    out.push(format_args!("{}[{i}]", keys::MIGRATIONS), e);
                }
            }
        }
        Some(other) => out.wrong_type(keys::MIGRATIONS, "array", other),
    }
}
