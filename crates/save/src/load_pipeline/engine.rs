use std::sync::Arc;

use bevy::log::{debug, error, info};

use super::stage::{LoadReport, LoadStage, RejectReason};
use crate::backup::{BackupId, BackupManager};
use crate::clock::{Clock, SystemClock};
use crate::corruption::{detect_corruption, CorruptionReport, Severity};
use crate::corruption_recovery::recover;
use crate::migration_engine::MigrationEngine;
use crate::save_codec::{decode_document, encode_document};
use crate::save_config::SaveConfig;
use crate::save_error::{LoadError, RollbackError, SaveError};
use crate::save_migrate::build_migration_registry;
use crate::save_types::{Document, CURRENT_SAVE_VERSION};
use crate::save_validate::validate_as;
use crate::storage::Storage;
use crate::version_detect::detect_version;

/// Stage trail of the load in progress.
struct StageTrail(Vec<LoadStage>);

impl StageTrail {
    fn received() -> Self {
        let mut trail = StageTrail(Vec::new());
        trail.enter(LoadStage::Received);
        trail
    }

    fn enter(&mut self, stage: LoadStage) {
        debug!("Load stage: {}", stage);
        self.0.push(stage);
    }

    /// Close the trail with `Rejected` and log every stage visited.
    fn reject<T>(&mut self, err: SaveError) -> Result<T, SaveError> {
        self.enter(LoadStage::Rejected(RejectReason::from(&err)));
        let stages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        error!("Load rejected: {} [{}]", err, stages.join(" -> "));
        Err(err)
    }
}

/// Entry point for loading, saving and rolling back documents.
pub struct SaveEngine {
    migrations: MigrationEngine,
    backups: BackupManager,
    config: SaveConfig,
    clock: Arc<dyn Clock>,
}

impl SaveEngine {
    /// Engine writing backups into `storage` under `config.backup_prefix`.
    pub fn new(storage: Arc<dyn Storage>, config: SaveConfig) -> Self {
        Self::with_clock(storage, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        storage: Arc<dyn Storage>,
        config: SaveConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let migrations = MigrationEngine::new(build_migration_registry(), clock.clone());
        let backups = BackupManager::new(storage, config.backup_prefix.clone(), clock.clone())
            .with_compression(config.compress);
        Self::from_parts(migrations, backups, config, clock)
    }

    pub fn from_parts(
        migrations: MigrationEngine,
        backups: BackupManager,
        config: SaveConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            migrations,
            backups,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn migrations(&self) -> &MigrationEngine {
        &self.migrations
    }

    /// Decode, migrate, validate and recover `bytes` into a current-version
    /// document.
    pub fn load(&self, bytes: &[u8]) -> Result<Document, LoadError> {
        self.load_with_report(bytes).map(|report| report.document)
    }

    /// Like [`load`](Self::load), returning the full report.
    pub fn load_with_report(&self, bytes: &[u8]) -> Result<LoadReport, LoadError> {
        let mut trail = StageTrail::received();
        match decode_document(bytes) {
            Ok(doc) => self.run(doc, trail),
            Err(e) => trail.reject(e),
        }
    }

    /// Run an already-decoded document through the pipeline.
    pub fn load_document(&self, doc: Document) -> Result<LoadReport, LoadError> {
        self.run(doc, StageTrail::received())
    }

    fn run(&self, doc: Document, mut trail: StageTrail) -> Result<LoadReport, LoadError> {
        let Some(version) = detect_version(&doc) else {
            return trail.reject(SaveError::VersionUndetectable);
        };
        trail.enter(LoadStage::VersionDetected(version));

        if version > CURRENT_SAVE_VERSION {
            return trail.reject(SaveError::UnsupportedFutureVersion {
                found: version,
                supported: CURRENT_SAVE_VERSION,
            });
        }

        let mut report = LoadReport {
            document: doc,
            original_version: version,
            steps_applied: 0,
            step_descriptions: Vec::new(),
            backups: Vec::new(),
            recovered: Vec::new(),
            advisories: Vec::new(),
            stages: Vec::new(),
        };

        if version < CURRENT_SAVE_VERSION {
            trail.enter(LoadStage::Migrating {
                from: version,
                to: CURRENT_SAVE_VERSION,
            });
            let migrated = match self.migrations.migrate_with_backups(
                &report.document,
                version,
                CURRENT_SAVE_VERSION,
                &self.backups,
            ) {
                Ok(migrated) => migrated,
                Err(e) => return trail.reject(e),
            };
            report.document = migrated.document;
            report.steps_applied = migrated.steps_applied;
            report.step_descriptions = migrated.step_descriptions;
            report.backups = migrated.backups;
        }

        trail.enter(LoadStage::Validating);
        let validation = validate_as(&report.document, CURRENT_SAVE_VERSION);
        if !validation.is_valid {
            return trail.reject(SaveError::ValidationFailed(validation.errors));
        }

        let findings = detect_corruption(&report.document);
        let (advisories, repairs): (Vec<CorruptionReport>, Vec<CorruptionReport>) = findings
            .into_iter()
            .partition(|r| r.severity == Severity::Advisory);
        for advisory in &advisories {
            info!("Save advisory: {}", advisory.description);
        }

        if !repairs.is_empty() {
            trail.enter(LoadStage::Recovering);
            report.document = match recover(report.document, &repairs) {
                Ok(fixed) => fixed,
                Err(e) => return trail.reject(e),
            };
            let revalidation = validate_as(&report.document, CURRENT_SAVE_VERSION);
            if !revalidation.is_valid {
                return trail.reject(SaveError::ValidationFailed(revalidation.errors));
            }
            report.recovered = repairs;
        }
        report.advisories = advisories;

        trail.enter(LoadStage::Committed);
        info!(
            "Loaded save v{} as v{} ({} step(s), {} repair(s))",
            report.original_version,
            CURRENT_SAVE_VERSION,
            report.steps_applied,
            report.recovered.len()
        );
        report.stages = trail.0;
        Ok(report)
    }

    /// Encode a current-version document for storage.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` if `doc` is not a valid current-version document;
    /// only committed state is ever written.
    pub fn save(&self, doc: &Document) -> Result<Vec<u8>, SaveError> {
        let validation = validate_as(doc, CURRENT_SAVE_VERSION);
        if !validation.is_valid {
            return Err(SaveError::ValidationFailed(validation.errors));
        }
        let bytes = encode_document(doc, self.config.compress, self.clock.now_millis())?;
        debug!("Encoded v{} save ({} bytes)", CURRENT_SAVE_VERSION, bytes.len());
        Ok(bytes)
    }

    /// Snapshots taken of documents at `version`, oldest first.
    pub fn list_backups(&self, version: u32) -> Result<Vec<BackupId>, SaveError> {
        self.backups.list(version)
    }

    /// The most recent pre-migration snapshot of `version`.  Never
    /// triggered automatically.
    pub fn rollback(&self, version: u32) -> Result<Document, RollbackError> {
        let doc = self.backups.restore(version)?;
        info!("Rolled back to v{} backup", version);
        Ok(doc)
    }

    /// Apply the configured retention policy to the backup store.
    pub fn prune_backups(&self) -> Result<Vec<BackupId>, SaveError> {
        self.backups.prune(self.config.retention_policy())
    }
}
