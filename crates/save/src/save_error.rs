// ---------------------------------------------------------------------------
// SaveError: typed errors for every stage of the save/load pipeline
// ---------------------------------------------------------------------------

use std::fmt;

use crate::backup::BackupId;
use crate::corruption::CorruptionReport;
use crate::save_types::StepError;

/// Errors that can occur while loading, migrating, saving or rolling back.
///
/// Every variant carries enough context to identify the failing document
/// and step; callers turn it into a user-facing reason with `Display`.
#[derive(Debug)]
pub enum SaveError {
    /// Storage I/O error (file not found, permission denied, disk full, ...).
    Io(std::io::Error),
    /// Document or metadata encoding failed.
    Encode(String),
    /// Bytes could not be decoded into a document (bad header, checksum
    /// mismatch, invalid JSON, non-object root).
    Decode(String),
    /// No save data was available (empty slot, nothing active to save).
    NoData(String),
    /// Neither an explicit version nor any legacy heuristic identified the
    /// document's version.
    VersionUndetectable,
    /// The document was written by a newer build.
    UnsupportedFutureVersion { found: u32, supported: u32 },
    /// No migration step is registered for `from -> from + 1`.
    MigrationChainGap(u32),
    /// The step starting at `version` failed. `backup` is the snapshot taken
    /// just before the step, if one was taken.
    MigrationStepFailed {
        version: u32,
        cause: StepError,
        backup: Option<BackupId>,
    },
    /// Structural validation failed; every violation is listed.
    ValidationFailed(Vec<String>),
    /// Hard corruption was found; every hard report is listed.
    CorruptionUnrecoverable(Vec<CorruptionReport>),
    /// A pre-migration snapshot could not be written.
    BackupWriteFailed { version: u32, cause: String },
    /// No backup exists for the requested version.
    RollbackNotFound(u32),
}

/// Failure of the load pipeline.
pub type LoadError = SaveError;
/// Failure of a migration chain.
pub type MigrationError = SaveError;
/// Failure of a rollback request.
pub type RollbackError = SaveError;

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "I/O error: {e}"),
            SaveError::Encode(msg) => write!(f, "Encoding error: {msg}"),
            SaveError::Decode(msg) => write!(f, "Decoding error: {msg}"),
            SaveError::NoData(what) => write!(f, "No save data available: {what}"),
            SaveError::VersionUndetectable => write!(
                f,
                "Save version could not be determined: no valid version tag and the \
                 layout matches no known legacy format"
            ),
            SaveError::UnsupportedFutureVersion { found, supported } => write!(
                f,
                "Save is v{found}, but this build only supports up to v{supported}"
            ),
            SaveError::MigrationChainGap(v) => {
                write!(f, "No migration registered from v{v} to v{}", v + 1)
            }
            SaveError::MigrationStepFailed {
                version,
                cause,
                backup,
            } => {
                write!(
                    f,
                    "Migration from v{version} to v{} failed at {cause}",
                    version + 1
                )?;
                if let Some(id) = backup {
                    write!(f, " (pre-migration backup #{})", id.sequence)?;
                }
                Ok(())
            }
            SaveError::ValidationFailed(errors) => {
                write!(f, "Save failed validation ({} problem(s))", errors.len())?;
                for error in errors {
                    write!(f, "; {error}")?;
                }
                Ok(())
            }
            SaveError::CorruptionUnrecoverable(reports) => {
                write!(
                    f,
                    "Save is corrupted beyond automatic repair ({} issue(s))",
                    reports.len()
                )?;
                for report in reports {
                    write!(f, "; {}", report.description)?;
                }
                Ok(())
            }
            SaveError::BackupWriteFailed { version, cause } => {
                write!(f, "Failed to write v{version} backup: {cause}")
            }
            SaveError::RollbackNotFound(v) => write!(f, "No backup found for v{v}"),
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SaveError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<serde_json::Error> for SaveError {
    fn from(e: serde_json::Error) -> Self {
        SaveError::Decode(e.to_string())
    }
}

impl From<bitcode::Error> for SaveError {
    fn from(e: bitcode::Error) -> Self {
        SaveError::Decode(e.to_string())
    }
}
