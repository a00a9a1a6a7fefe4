use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bevy::prelude::*;

use crate::clock::{Clock, SystemClock};
use crate::load_pipeline::{LoadReport, SaveEngine};
use crate::save_config::SaveConfig;
use crate::save_error::SaveError;
use crate::save_types::Document;
use crate::storage::{MemoryStorage, Storage};

/// Directory (storage prefix) holding slot files.
pub const SLOT_DIR: &str = "slots";

/// File extension of a slot file.
pub const SLOT_EXTENSION: &str = ".sav";

/// Save root used when the host does not insert its own `SaveStore`.
pub const DEFAULT_SAVE_ROOT: &str = "saves";

/// Storage name of a slot's file, e.g. `slots/main.sav`.
pub fn slot_file_name(slot: &str) -> Result<String, SaveError> {
    let invalid = slot.is_empty()
        || slot == "."
        || slot.contains("..")
        || slot.chars().any(|c| matches!(c, '/' | '\\') || c.is_control());
    if invalid {
        return Err(SaveError::Io(std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("invalid slot name {slot:?}"),
        )));
    }
    Ok(format!("{SLOT_DIR}/{slot}{SLOT_EXTENSION}"))
}

/// Backup prefix scoping snapshots to one slot, e.g. `backups/main/`.
pub fn slot_backup_prefix(config: &SaveConfig, slot: &str) -> String {
    format!("{}{}/", config.backup_prefix, slot)
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Where slots and their backups live.  Each slot gets its own backup
/// prefix so rolling back one slot never restores another slot's snapshot.
#[derive(Resource, Clone)]
pub struct SaveStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    root: Option<PathBuf>,
}

impl SaveStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            clock: Arc::new(SystemClock),
            root: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Slots and backups stored as files under `root`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn on_disk(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            storage: Arc::new(crate::storage::FileStorage::new(root.clone())),
            clock: Arc::new(SystemClock),
            root: Some(root),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Directory backing the store, if it is on disk.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Engine whose backups are scoped to `slot`.
    pub fn engine_for(&self, slot: &str, config: &SaveConfig) -> Result<SaveEngine, SaveError> {
        slot_file_name(slot)?;
        let config = SaveConfig {
            backup_prefix: slot_backup_prefix(config, slot),
            ..config.clone()
        };
        Ok(SaveEngine::with_clock(
            self.storage.clone(),
            config,
            self.clock.clone(),
        ))
    }

    /// Read `slot` and run it through the load pipeline.
    pub fn load_slot(&self, slot: &str, config: &SaveConfig) -> Result<LoadReport, SaveError> {
        let name = slot_file_name(slot)?;
        let engine = self.engine_for(slot, config)?;
        let bytes = self
            .storage
            .read(&name)?
            .ok_or_else(|| SaveError::NoData(format!("slot '{slot}' is empty")))?;
        engine.load_with_report(&bytes)
    }

    /// Encode `doc` and write it to `slot`.  Returns the bytes written.
    pub fn save_slot(
        &self,
        slot: &str,
        doc: &Document,
        config: &SaveConfig,
    ) -> Result<usize, SaveError> {
        let name = slot_file_name(slot)?;
        let bytes = self.engine_for(slot, config)?.save(doc)?;
        self.storage.write(&name, &bytes)?;
        Ok(bytes.len())
    }

    /// Write the latest `version` snapshot of `slot` back over the slot
    /// file, byte for byte, and return the restored document.
    pub fn rollback_slot(
        &self,
        slot: &str,
        version: u32,
        config: &SaveConfig,
    ) -> Result<Document, SaveError> {
        let name = slot_file_name(slot)?;
        let engine = self.engine_for(slot, config)?;
        let ids = engine.list_backups(version)?;
        let id = ids.last().ok_or(SaveError::RollbackNotFound(version))?;
        let raw = engine.backups().read_raw(id)?;
        let doc = engine.backups().restore_id(id)?;
        self.storage.write(&name, &raw)?;
        info!("Slot '{}' rolled back to v{} backup #{}", slot, version, id.sequence);
        Ok(doc)
    }
}

/// The committed document the game is running on.  Only reached by
/// documents that passed the full load pipeline.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct ActiveDocument {
    pub slot: Option<String>,
    pub document: Option<Document>,
}

/// Running tally of save operations, for UI.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct SaveStatus {
    pub last: Option<SaveOutcomeEvent>,
    pub loads: u32,
    pub saves: u32,
    pub rollbacks: u32,
    pub failures: u32,
}

impl SaveStatus {
    fn record(&mut self, outcome: &SaveOutcomeEvent) {
        match outcome {
            SaveOutcomeEvent::Loaded { .. } => self.loads += 1,
            SaveOutcomeEvent::Saved { .. } => self.saves += 1,
            SaveOutcomeEvent::RolledBack { .. } => self.rollbacks += 1,
            SaveOutcomeEvent::Failed { .. } => self.failures += 1,
        }
        self.last = Some(outcome.clone());
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Event, Debug, Clone)]
pub struct LoadGameEvent {
    pub slot: String,
}

#[derive(Event, Debug, Clone)]
pub struct SaveGameEvent {
    pub slot: String,
}

/// Restore the latest pre-migration snapshot of `version` into `slot`.
#[derive(Event, Debug, Clone)]
pub struct RollbackEvent {
    pub slot: String,
    pub version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOperation {
    Load,
    Save,
    Rollback,
}

/// Result of every load, save and rollback request.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum SaveOutcomeEvent {
    Loaded {
        slot: String,
        original_version: u32,
        steps_applied: u32,
        repairs: usize,
    },
    Saved {
        slot: String,
        bytes: usize,
    },
    RolledBack {
        slot: String,
        version: u32,
    },
    Failed {
        slot: String,
        operation: SaveOperation,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<LoadGameEvent>()
            .add_event::<SaveGameEvent>()
            .add_event::<RollbackEvent>()
            .add_event::<SaveOutcomeEvent>()
            .init_resource::<SaveConfig>()
            .init_resource::<ActiveDocument>()
            .init_resource::<SaveStatus>();

        if !app.world().contains_resource::<SaveStore>() {
            #[cfg(not(target_arch = "wasm32"))]
            app.insert_resource(SaveStore::on_disk(DEFAULT_SAVE_ROOT));
            #[cfg(target_arch = "wasm32")]
            app.insert_resource(SaveStore::in_memory());
        }

        #[cfg(not(target_arch = "wasm32"))]
        app.add_plugins(crate::crash_recovery::CrashRecoveryPlugin);

        // Loads first so a save in the same frame writes the fresh document.
        app.add_systems(
            Update,
            (handle_load_events, handle_save_events, handle_rollback_events).chain(),
        );
    }
}

// ---------------------------------------------------------------------------
// Event handling systems
// ---------------------------------------------------------------------------

fn publish(
    outcome: SaveOutcomeEvent,
    status: &mut SaveStatus,
    outcomes: &mut EventWriter<SaveOutcomeEvent>,
) {
    status.record(&outcome);
    outcomes.send(outcome);
}

fn failure(slot: &str, operation: SaveOperation, err: SaveError) -> SaveOutcomeEvent {
    error!("{:?} of slot '{}' failed: {}", operation, slot, err);
    SaveOutcomeEvent::Failed {
        slot: slot.to_string(),
        operation,
        reason: err.to_string(),
    }
}

fn handle_load_events(
    mut events: EventReader<LoadGameEvent>,
    store: Res<SaveStore>,
    config: Res<SaveConfig>,
    mut active: ResMut<ActiveDocument>,
    mut status: ResMut<SaveStatus>,
    mut outcomes: EventWriter<SaveOutcomeEvent>,
) {
    for event in events.read() {
        let outcome = match store.load_slot(&event.slot, &config) {
            Ok(report) => {
                let outcome = SaveOutcomeEvent::Loaded {
                    slot: event.slot.clone(),
                    original_version: report.original_version,
                    steps_applied: report.steps_applied,
                    repairs: report.recovered.len(),
                };
                active.slot = Some(event.slot.clone());
                active.document = Some(report.document);
                outcome
            }
            Err(e) => failure(&event.slot, SaveOperation::Load, e),
        };
        publish(outcome, &mut status, &mut outcomes);
    }
}

fn handle_save_events(
    mut events: EventReader<SaveGameEvent>,
    store: Res<SaveStore>,
    config: Res<SaveConfig>,
    mut active: ResMut<ActiveDocument>,
    mut status: ResMut<SaveStatus>,
    mut outcomes: EventWriter<SaveOutcomeEvent>,
) {
    for event in events.read() {
        let result = match active.document.as_ref() {
            Some(doc) => store.save_slot(&event.slot, doc, &config),
            None => Err(SaveError::NoData("no active document to save".to_string())),
        };
        let outcome = match result {
            Ok(bytes) => {
                info!("Saved slot '{}' ({} bytes)", event.slot, bytes);
                active.slot = Some(event.slot.clone());
                SaveOutcomeEvent::Saved {
                    slot: event.slot.clone(),
                    bytes,
                }
            }
            Err(e) => failure(&event.slot, SaveOperation::Save, e),
        };
        publish(outcome, &mut status, &mut outcomes);
    }
}

fn handle_rollback_events(
    mut events: EventReader<RollbackEvent>,
    store: Res<SaveStore>,
    config: Res<SaveConfig>,
    mut status: ResMut<SaveStatus>,
    mut outcomes: EventWriter<SaveOutcomeEvent>,
) {
    for event in events.read() {
        let outcome = match store.rollback_slot(&event.slot, event.version, &config) {
            Ok(_) => SaveOutcomeEvent::RolledBack {
                slot: event.slot.clone(),
                version: event.version,
            },
            Err(e) => failure(&event.slot, SaveOperation::Rollback, e),
        };
        publish(outcome, &mut status, &mut outcomes);
    }
}
