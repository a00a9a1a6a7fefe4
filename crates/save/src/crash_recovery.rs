//! Crash recovery on startup.
//!
//! An interrupted `atomic_write` leaves a `.tmp` sibling behind. On startup
//! the save root is scanned for such leftovers, they are removed, and when
//! any were found every slot file is re-validated by header checksum so the
//! host can tell the player which slots survived.
//!
//! The result is published as the `CrashRecoveryState` resource.

use bevy::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::atomic_write::TMP_SUFFIX;
use crate::file_header::{unwrap_header, UnwrapResult};
use crate::save_plugin::{SaveStore, SLOT_DIR, SLOT_EXTENSION};

// =============================================================================
// Resources
// =============================================================================

/// Outcome of the startup crash scan.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct CrashRecoveryState {
    /// Whether crash artifacts (`.tmp` files) were found.
    pub detected: bool,
    /// Number of `.tmp` files that were removed.
    pub tmp_files_cleaned: usize,
    /// Slots whose files passed header validation, sorted by name.
    pub valid_slots: Vec<String>,
    /// Slots whose files failed header validation, sorted by name.
    pub corrupted_slots: Vec<String>,
}

// =============================================================================
// Core Logic
// =============================================================================

/// Every `.tmp` file under `root`, recursively.
pub(crate) fn find_tmp_files(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    collect_tmp_files(root, &mut found);
    found.sort();
    found
}

fn collect_tmp_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tmp_files(&path, out);
        } else if path.to_string_lossy().ends_with(TMP_SUFFIX) {
            out.push(path);
        }
    }
}

/// Removes the given `.tmp` files, returning how many were removed.
pub(crate) fn clean_tmp_files(tmp_files: &[PathBuf]) -> usize {
    let mut cleaned = 0;
    for path in tmp_files {
        match fs::remove_file(path) {
            Ok(()) => {
                info!("Crash recovery: cleaned up tmp file: {}", path.display());
                cleaned += 1;
            }
            Err(e) => {
                warn!(
                    "Crash recovery: failed to remove tmp file {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }
    cleaned
}

/// Whether `path` holds a readable save: a header whose checksum matches,
/// or a headerless legacy payload.
pub(crate) fn validate_save_file(path: &Path) -> bool {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(_) => return false,
    };

    if bytes.is_empty() {
        return false;
    }

    matches!(
        unwrap_header(&bytes),
        Ok(UnwrapResult::WithHeader { .. }) | Ok(UnwrapResult::Legacy(_))
    )
}

/// Validates every slot file under `root`, returning `(valid, corrupted)`
/// slot names.
pub(crate) fn scan_slots(root: &Path) -> (Vec<String>, Vec<String>) {
    let mut valid = Vec::new();
    let mut corrupted = Vec::new();

    let Ok(entries) = fs::read_dir(root.join(SLOT_DIR)) else {
        return (valid, corrupted);
    };
    for entry in entries.flatten() {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(slot) = file_name.strip_suffix(SLOT_EXTENSION) else {
            continue;
        };
        if validate_save_file(&entry.path()) {
            valid.push(slot.to_string());
        } else {
            warn!("Crash recovery: slot '{}' is corrupted", slot);
            corrupted.push(slot.to_string());
        }
    }
    valid.sort();
    corrupted.sort();
    (valid, corrupted)
}

/// Full startup scan of a save root: clean `.tmp` leftovers and, if any
/// were found, validate the slots.
pub(crate) fn perform_crash_recovery_scan(root: &Path) -> CrashRecoveryState {
    let tmp_files = find_tmp_files(root);
    let detected = !tmp_files.is_empty();
    let tmp_files_cleaned = clean_tmp_files(&tmp_files);

    if !detected {
        return CrashRecoveryState::default();
    }

    info!(
        "Crash recovery: detected {} tmp file(s) under {}, scanning slots...",
        tmp_files.len(),
        root.display()
    );
    let (valid_slots, corrupted_slots) = scan_slots(root);
    if valid_slots.is_empty() {
        warn!("Crash recovery: no valid slot found");
    } else {
        info!(
            "Crash recovery: {} valid slot(s), {} corrupted",
            valid_slots.len(),
            corrupted_slots.len()
        );
    }

    CrashRecoveryState {
        detected,
        tmp_files_cleaned,
        valid_slots,
        corrupted_slots,
    }
}

// =============================================================================
// Bevy Systems
// =============================================================================

/// Scans the on-disk save root, if the store has one.
fn crash_recovery_startup(mut commands: Commands, store: Res<SaveStore>) {
    if let Some(root) = store.root() {
        commands.insert_resource(perform_crash_recovery_scan(root));
    }
}

// =============================================================================
// Plugin
// =============================================================================

/// Runs the crash scan once on startup.
pub(crate) struct CrashRecoveryPlugin;

impl Plugin for CrashRecoveryPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CrashRecoveryState>()
            .add_systems(Startup, crash_recovery_startup);
    }
}

// =============================================================================
// Tests
// =============================================================================
