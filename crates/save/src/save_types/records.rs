// ---------------------------------------------------------------------------
// Records produced by the pipeline: migration history, validation results
// ---------------------------------------------------------------------------

use std::fmt;

use serde::{Deserialize, Serialize};

/// One entry of a document's `migrations` list.
///
/// Appended by the migration engine after every successful step and never
/// rewritten afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    #[serde(rename = "from")]
    pub from_version: u32,
    #[serde(rename = "to")]
    pub to_version: u32,
    /// Milliseconds since the Unix epoch at which the step ran.
    pub timestamp: u64,
    pub action: String,
}

/// Why a single migration step could not produce its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError {
    /// Path of the offending field, e.g. `structures[3].type`.
    pub path: String,
    pub reason: String,
}

impl StepError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Outcome of structural validation. `errors` is always the complete list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}
