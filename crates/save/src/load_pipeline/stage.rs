use std::fmt;

use crate::backup::BackupId;
use crate::corruption::CorruptionReport;
use crate::save_error::SaveError;
use crate::save_types::Document;

/// Why a load ended in [`LoadStage::Rejected`].  The full error, with its
/// context, is what the load returns; this is its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Io,
    Encode,
    Decode,
    NoData,
    VersionUndetectable,
    UnsupportedFutureVersion(u32),
    MigrationChainGap(u32),
    MigrationStepFailed(u32),
    ValidationFailed,
    CorruptionUnrecoverable,
    BackupWriteFailed(u32),
    RollbackNotFound(u32),
}

impl From<&SaveError> for RejectReason {
    fn from(err: &SaveError) -> Self {
        match err {
            SaveError::Io(_) => RejectReason::Io,
            SaveError::Encode(_) => RejectReason::Encode,
            SaveError::Decode(_) => RejectReason::Decode,
            SaveError::NoData(_) => RejectReason::NoData,
            SaveError::VersionUndetectable => RejectReason::VersionUndetectable,
            SaveError::UnsupportedFutureVersion { found, .. } => {
                RejectReason::UnsupportedFutureVersion(*found)
            }
            SaveError::MigrationChainGap(v) => RejectReason::MigrationChainGap(*v),
            SaveError::MigrationStepFailed { version, .. } => {
                RejectReason::MigrationStepFailed(*version)
            }
            SaveError::ValidationFailed(_) => RejectReason::ValidationFailed,
            SaveError::CorruptionUnrecoverable(_) => RejectReason::CorruptionUnrecoverable,
            SaveError::BackupWriteFailed { version, .. } => {
                RejectReason::BackupWriteFailed(*version)
            }
            SaveError::RollbackNotFound(v) => RejectReason::RollbackNotFound(*v),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Io => write!(f, "I/O error"),
            RejectReason::Encode => write!(f, "encode error"),
            RejectReason::Decode => write!(f, "decode error"),
            RejectReason::NoData => write!(f, "no data"),
            RejectReason::VersionUndetectable => write!(f, "version undetectable"),
            RejectReason::UnsupportedFutureVersion(v) => write!(f, "future version v{v}"),
            RejectReason::MigrationChainGap(v) => write!(f, "no migration from v{v}"),
            RejectReason::MigrationStepFailed(v) => write!(f, "migration from v{v} failed"),
            RejectReason::ValidationFailed => write!(f, "validation failed"),
            RejectReason::CorruptionUnrecoverable => write!(f, "unrecoverable corruption"),
            RejectReason::BackupWriteFailed(v) => write!(f, "v{v} backup write failed"),
            RejectReason::RollbackNotFound(v) => write!(f, "no v{v} backup"),
        }
    }
}

/// States of a single load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Received,
    VersionDetected(u32),
    Migrating { from: u32, to: u32 },
    Validating,
    Recovering,
    Committed,
    Rejected(RejectReason),
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStage::Received => write!(f, "received"),
            LoadStage::VersionDetected(v) => write!(f, "version detected (v{v})"),
            LoadStage::Migrating { from, to } => write!(f, "migrating v{from} -> v{to}"),
            LoadStage::Validating => write!(f, "validating"),
            LoadStage::Recovering => write!(f, "recovering"),
            LoadStage::Committed => write!(f, "committed"),
            LoadStage::Rejected(reason) => write!(f, "rejected ({reason})"),
        }
    }
}

/// Everything a committed load produced.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// The committed document, at the current version.
    pub document: Document,
    /// The version the input was detected as.
    pub original_version: u32,
    pub steps_applied: u32,
    pub step_descriptions: Vec<&'static str>,
    /// Pre-migration snapshots written during this load.
    pub backups: Vec<BackupId>,
    /// Soft findings that were repaired.
    pub recovered: Vec<CorruptionReport>,
    /// Advisory findings; logged, left as they are.
    pub advisories: Vec<CorruptionReport>,
    /// States visited, in order, ending in `Committed`.
    pub stages: Vec<LoadStage>,
}

impl LoadReport {
    pub fn was_migrated(&self) -> bool {
        self.steps_applied > 0
    }
}
