// ---------------------------------------------------------------------------
// Migration engine: runs the registry chain over a document
// ---------------------------------------------------------------------------

use std::sync::Arc;

use bevy::log::info;

use crate::backup::{BackupId, BackupManager};
use crate::clock::{Clock, SystemClock};
use crate::save_error::{MigrationError, SaveError};
use crate::save_migrate::build_migration_registry;
use crate::save_migrate_registry::MigrationRegistry;
use crate::save_types::{Document, MigrationRecord, StepError};

/// Result of running the migration chain on a document.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    /// The migrated document (equal to the input when no step ran).
    pub document: Document,
    /// The version the document was originally at.
    pub original_version: u32,
    /// The version the document is now at.
    pub final_version: u32,
    /// Number of migration steps that were applied.
    pub steps_applied: u32,
    /// Descriptions of each step that was applied, in order.
    pub step_descriptions: Vec<&'static str>,
    /// Snapshots taken before each step, in order.
    pub backups: Vec<BackupId>,
}

/// Applies registered steps one version at a time.
pub struct MigrationEngine {
    registry: MigrationRegistry,
    clock: Arc<dyn Clock>,
}

impl Default for MigrationEngine {
    fn default() -> Self {
        Self::new(build_migration_registry(), Arc::new(SystemClock))
    }
}

impl MigrationEngine {
    pub fn new(registry: MigrationRegistry, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Carry `doc` from `from_version` to `to_version` without taking
    /// backups.  The input is never modified.
    ///
    /// # Errors
    ///
    /// - `UnsupportedFutureVersion` if `from_version > to_version`
    /// - `MigrationChainGap(v)` if no step is registered for some `v`
    /// - `MigrationStepFailed` if a step rejects its input
    pub fn migrate(
        &self,
        doc: &Document,
        from_version: u32,
        to_version: u32,
    ) -> Result<Document, MigrationError> {
        self.run_chain(doc, from_version, to_version, |_, _| Ok(None))
            .map(|report| report.document)
    }

    /// Like [`migrate`](Self::migrate), returning a detailed report.
    pub fn migrate_with_report(
        &self,
        doc: &Document,
        from_version: u32,
        to_version: u32,
    ) -> Result<MigrationReport, MigrationError> {
        self.run_chain(doc, from_version, to_version, |_, _| Ok(None))
    }

    /// Carry `doc` forward, snapshotting it into `backups` immediately
    /// before every step, keyed by the pre-step version.
    pub fn migrate_with_backups(
        &self,
        doc: &Document,
        from_version: u32,
        to_version: u32,
        backups: &BackupManager,
    ) -> Result<MigrationReport, MigrationError> {
        self.run_chain(doc, from_version, to_version, |input, version| {
            backups.snapshot_at(input, version).map(Some)
        })
    }

    fn run_chain(
        &self,
        doc: &Document,
        from_version: u32,
        to_version: u32,
        mut before_step: impl FnMut(&Document, u32) -> Result<Option<BackupId>, SaveError>,
    ) -> Result<MigrationReport, MigrationError> {
        if from_version > to_version {
            return Err(SaveError::UnsupportedFutureVersion {
                found: from_version,
                supported: to_version,
            });
        }

        let mut report = MigrationReport {
            document: doc.clone(),
            original_version: from_version,
            final_version: from_version,
            steps_applied: 0,
            step_descriptions: Vec::new(),
            backups: Vec::new(),
        };
        if from_version == to_version {
            return Ok(report);
        }

        // Resolve the whole chain first so a gap fails before any backup is
        // written or any step runs.
        let steps = (from_version..to_version)
            .map(|v| self.registry.step(v).ok_or(SaveError::MigrationChainGap(v)))
            .collect::<Result<Vec<_>, _>>()?;

        let migrated_at = self.clock.now_millis();
        for step in steps {
            let version = step.from_version;
            let backup = before_step(&report.document, version)?;
            report.backups.extend(backup);

            let step_failed = |cause: StepError| SaveError::MigrationStepFailed {
                version,
                cause,
                backup,
            };
            let mut next = (step.migrate_fn)(&report.document).map_err(step_failed)?;
            next.set_version(step.to_version());
            next.push_migration(&MigrationRecord {
                from_version: version,
                to_version: step.to_version(),
                timestamp: migrated_at,
                action: step.description.to_string(),
            })
            .map_err(|reason| step_failed(StepError::new("migrations", reason)))?;

            info!(
                "Migrated save v{} -> v{}: {}",
                version,
                step.to_version(),
                step.description
            );
            report.document = next;
            report.final_version = step.to_version();
            report.steps_applied += 1;
            report.step_descriptions.push(step.description);
        }

        Ok(report)
    }
}
