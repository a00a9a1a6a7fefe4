//! Hearth save engine: versioned save documents, the migration chain that
//! upgrades them, validation, corruption recovery and pre-migration backups.

#[cfg(not(target_arch = "wasm32"))]
mod atomic_write;
pub mod backup;
pub mod clock;
pub mod corruption;
pub mod corruption_recovery;
#[cfg(not(target_arch = "wasm32"))]
mod crash_recovery;
pub mod file_header;
pub mod load_pipeline;
pub mod migration_engine;
pub mod save_codec;
pub mod save_config;
pub mod save_error;
pub mod save_metadata;
pub mod save_migrate;
pub mod save_migrate_registry;
mod save_plugin;
pub mod save_types;
pub mod save_validate;
pub mod storage;
pub mod version_detect;

#[cfg(not(target_arch = "wasm32"))]
pub use atomic_write::atomic_write;
pub use backup::{BackupId, BackupManager};
pub use clock::{Clock, FixedClock, SystemClock};
#[cfg(not(target_arch = "wasm32"))]
pub use crash_recovery::CrashRecoveryState;
pub use load_pipeline::{LoadReport, LoadStage, RejectReason, SaveEngine};
pub use save_config::SaveConfig;
pub use save_error::{LoadError, MigrationError, RollbackError, SaveError};
pub use save_plugin::{
    slot_backup_prefix, slot_file_name, ActiveDocument, LoadGameEvent, RollbackEvent,
    SaveGameEvent, SaveOperation, SaveOutcomeEvent, SavePlugin, SaveStatus, SaveStore, SLOT_DIR,
    SLOT_EXTENSION,
};
pub use save_types::{Document, CURRENT_SAVE_VERSION, OLDEST_SUPPORTED_VERSION};
#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
pub use storage::{MemoryStorage, Storage};
