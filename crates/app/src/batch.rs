//! Bulk migration of a save directory.
//!
//! Every `.sav` file outside the backup prefix is loaded through the full
//! pipeline and, when that changed it, written back at the current version.
//! Files are processed in parallel on a Bevy `TaskPool`; each file's
//! backups go under its own prefix so they line up with what the game's
//! `SavePlugin` rolls back to.

use std::path::PathBuf;
use std::sync::Arc;

use bevy::log::{error, info, warn};
use bevy::tasks::TaskPool;

use hearth_save::{
    slot_backup_prefix, Clock, MemoryStorage, SaveConfig, SaveEngine, SaveError, Storage,
    SLOT_DIR, SLOT_EXTENSION,
};

/// Name of the optional persisted `SaveConfig` in the save directory.
pub const CONFIG_FILE: &str = "save_config.bin";

pub const USAGE: &str = "usage: hearth-migrate <save-dir> [--dry-run] [--prune] [--no-compress]";

/// Command line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub dir: PathBuf,
    /// Load and report, but write nothing (backups go to scratch memory).
    pub dry_run: bool,
    /// Apply the retention policy to each file's backups afterwards.
    pub prune: bool,
    /// Force uncompressed output regardless of the persisted config.
    pub no_compress: bool,
}

impl BatchOptions {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut dir = None;
        let mut dry_run = false;
        let mut prune = false;
        let mut no_compress = false;

        for arg in args {
            match arg.as_str() {
                "--dry-run" => dry_run = true,
                "--prune" => prune = true,
                "--no-compress" => no_compress = true,
                flag if flag.starts_with("--") => return Err(format!("unknown flag {flag}")),
                path => {
                    if dir.replace(PathBuf::from(path)).is_some() {
                        return Err("more than one save directory given".to_string());
                    }
                }
            }
        }

        Ok(Self {
            dir: dir.ok_or_else(|| "missing save directory".to_string())?,
            dry_run,
            prune,
            no_compress,
        })
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Upgraded (and, unless dry-running, rewritten).
    Migrated {
        from: u32,
        steps: u32,
        repairs: usize,
    },
    /// Already current; rewritten only if soft corruption was repaired.
    Current { repairs: usize },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub name: String,
    pub outcome: FileOutcome,
}

/// Namespace for backups of save files that are not slots.
const FILE_BACKUP_NAMESPACE: &str = "files";

/// Backup key of a save file: the slot name for `slots/<slot>.sav`, else
/// `files/<path>` with the extension dropped.  Slot names never contain `/`,
/// so the two kinds of key cannot collide.
fn backup_key(name: &str) -> String {
    let stem = name.strip_suffix(SLOT_EXTENSION).unwrap_or(name);
    match stem
        .strip_prefix(SLOT_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
    {
        Some(slot) if !slot.contains('/') => slot.to_string(),
        _ => format!("{FILE_BACKUP_NAMESPACE}/{stem}"),
    }
}

/// Save files in `storage`, skipping anything under the backup prefix.
pub fn find_save_files(
    storage: &dyn Storage,
    config: &SaveConfig,
) -> Result<Vec<String>, SaveError> {
    Ok(storage
        .list("")?
        .into_iter()
        .filter(|name| {
            name.ends_with(SLOT_EXTENSION) && !name.starts_with(&config.backup_prefix)
        })
        .collect())
}

fn migrate_file(
    storage: &Arc<dyn Storage>,
    name: &str,
    config: &SaveConfig,
    clock: &Arc<dyn Clock>,
    options: &BatchOptions,
) -> Result<FileOutcome, SaveError> {
    let config = SaveConfig {
        backup_prefix: slot_backup_prefix(config, &backup_key(name)),
        ..config.clone()
    };
    let backup_store: Arc<dyn Storage> = if options.dry_run {
        Arc::new(MemoryStorage::new())
    } else {
        storage.clone()
    };
    let engine = SaveEngine::with_clock(backup_store, config, clock.clone());

    let bytes = storage
        .read(name)?
        .ok_or_else(|| SaveError::NoData(format!("{name} disappeared")))?;
    let report = engine.load_with_report(&bytes)?;
    let repairs = report.recovered.len();

    if !options.dry_run && (report.was_migrated() || repairs > 0) {
        let out = engine.save(&report.document)?;
        storage.write(name, &out)?;
    }
    if options.prune && !options.dry_run {
        let removed = engine.prune_backups()?;
        if !removed.is_empty() {
            info!("{}: pruned {} old backup(s)", name, removed.len());
        }
    }

    Ok(if report.was_migrated() {
        FileOutcome::Migrated {
            from: report.original_version,
            steps: report.steps_applied,
            repairs,
        }
    } else {
        FileOutcome::Current { repairs }
    })
}

/// Migrate every save file in `storage`, in parallel.  Reports are sorted by
/// file name.
pub fn migrate_directory(
    storage: Arc<dyn Storage>,
    config: &SaveConfig,
    clock: Arc<dyn Clock>,
    options: &BatchOptions,
) -> Result<Vec<FileReport>, SaveError> {
    let names = find_save_files(storage.as_ref(), config)?;
    info!("Found {} save file(s)", names.len());

    let pool = TaskPool::new();
    let mut reports = pool.scope(|scope| {
        for name in &names {
            let storage = &storage;
            let clock = &clock;
            scope.spawn(async move {
                let outcome = match migrate_file(storage, name, config, clock, options) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!("{}: {}", name, e);
                        FileOutcome::Failed(e.to_string())
                    }
                };
                FileReport {
                    name: name.clone(),
                    outcome,
                }
            });
        }
    });
    reports.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(reports)
}

/// Persisted settings from the save directory, or defaults.
pub fn load_config(storage: &dyn Storage) -> SaveConfig {
    match storage.read(CONFIG_FILE) {
        Ok(Some(bytes)) => SaveConfig::decode_or_default(&bytes),
        Ok(None) => SaveConfig::default(),
        Err(e) => {
            warn!("Could not read {}: {}, using defaults", CONFIG_FILE, e);
            SaveConfig::default()
        }
    }
}
