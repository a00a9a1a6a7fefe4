// ---------------------------------------------------------------------------
// Document: the opaque, version-shaped save tree
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::records::MigrationRecord;
use crate::save_error::SaveError;

/// Top-level field names shared by every stage of the pipeline.
pub mod keys {
    pub const VERSION: &str = "version";
    pub const TIMESTAMP: &str = "timestamp";
    pub const PLAYTIME: &str = "playtime";
    pub const TIER: &str = "tier";
    pub const STRUCTURES: &str = "structures";
    pub const RESOURCES: &str = "resources";
    pub const ACTORS: &str = "actors";
    pub const NEXT_ACTOR_ID: &str = "next_actor_id";
    pub const ZONES: &str = "zones";
    pub const TECHNOLOGY: &str = "technology";
    pub const MIGRATIONS: &str = "migrations";

    // Per-entity fields.
    pub const ID: &str = "id";
    pub const TYPE: &str = "type";
    pub const POSITION: &str = "position";
    pub const STATUS: &str = "status";
    pub const PROGRESS: &str = "progress";
    pub const WORK_SLOTS: &str = "work_slots";
    pub const NAME: &str = "name";
    pub const ROLE: &str = "role";
    pub const MORALE: &str = "morale";
    pub const SKILLS: &str = "skills";
    pub const ASSIGNED_STRUCTURE: &str = "assigned_structure";
    pub const CENTER: &str = "center";
    pub const RADIUS: &str = "radius";
    pub const MAX_RADIUS: &str = "max_radius";
    pub const EXPANSIONS: &str = "expansions";
    pub const STRUCTURE_IDS: &str = "structure_ids";
    pub const STATS: &str = "stats";
    pub const UNLOCKED: &str = "unlocked";
    pub const RESEARCH_POINTS: &str = "research_points";
    pub const ACTIVE: &str = "active";

    /// Axes every position object must carry.
    pub const AXES: [&str; 3] = ["x", "y", "z"];
}

/// One persisted save state.
///
/// The shape of the tree is defined by its `version`; the engine never
/// assumes a fixed struct layout so that fields written by newer builds (or
/// fields it does not know about) pass through untouched.
///
/// Cloning is a full structural copy: a clone shares no mutable state with
/// the original.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// An empty document (no fields at all).
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Raw `version` field, if present (it may be malformed).
    pub fn version_field(&self) -> Option<&Value> {
        self.0.get(keys::VERSION)
    }

    pub fn set_version(&mut self, version: u32) {
        self.0.insert(keys::VERSION.to_string(), Value::from(version));
    }

    /// Items of a top-level array field; empty when the field is absent or
    /// not an array.
    pub fn array(&self, key: &str) -> &[Value] {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn structures(&self) -> &[Value] {
        self.array(keys::STRUCTURES)
    }

    pub fn actors(&self) -> &[Value] {
        self.array(keys::ACTORS)
    }

    pub fn zones(&self) -> &[Value] {
        self.array(keys::ZONES)
    }

    pub fn resources(&self) -> Option<&Map<String, Value>> {
        self.0.get(keys::RESOURCES).and_then(Value::as_object)
    }

    /// Parsed migration history. Malformed entries are skipped; the
    /// validator reports them separately.
    pub fn migration_history(&self) -> Vec<MigrationRecord> {
        self.array(keys::MIGRATIONS)
            .iter()
            .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
            .collect()
    }

    /// Append one record to the `migrations` list, creating the list when
    /// it does not exist yet. Existing entries are never touched.
    pub fn push_migration(&mut self, record: &MigrationRecord) -> Result<(), String> {
        let entry = serde_json::to_value(record).map_err(|e| e.to_string())?;
        match self
            .0
            .entry(keys::MIGRATIONS.to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(history) => {
                history.push(entry);
                Ok(())
            }
            other => Err(format!(
                "`{}` must be an array, found {}",
                keys::MIGRATIONS,
                json_type_name(other)
            )),
        }
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Document {
    type Error = SaveError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SaveError::Decode(format!(
                "save document must be a JSON object, found {}",
                json_type_name(&other)
            ))),
        }
    }
}

/// Human-readable JSON type name, used in validation messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_try_from_rejects_non_object() {
        let err = Document::try_from(json!([1, 2, 3])).unwrap_err();
        assert!(format!("{err}").contains("array"), "got: {err}");
    }

    #[test]
    fn test_array_accessor_tolerates_missing_and_wrong_types() {
        let doc = Document::try_from(json!({"structures": "oops"})).unwrap();
        assert!(doc.structures().is_empty());
        assert!(doc.actors().is_empty());
    }

    #[test]
    fn test_push_migration_appends_without_rewriting() {
        let mut doc = Document::try_from(json!({
            "migrations": [{"from": 1, "to": 2, "timestamp": 5, "action": "first"}]
        }))
        .unwrap();
        let record = MigrationRecord {
            from_version: 2,
            to_version: 3,
            timestamp: 9,
            action: "second".to_string(),
        };
        doc.push_migration(&record).unwrap();

        let history = doc.migration_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, "first");
        assert_eq!(history[1], record);
    }

    #[test]
    fn test_push_migration_rejects_scalar_history() {
        let mut doc = Document::try_from(json!({"migrations": 3})).unwrap();
        let record = MigrationRecord {
            from_version: 1,
            to_version: 2,
            timestamp: 0,
            action: "x".to_string(),
        };
        let err = doc.push_migration(&record).unwrap_err();
        assert!(err.contains("must be an array"), "got: {err}");
    }
}
