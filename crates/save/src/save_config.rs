//! Engine settings: payload compression and backup retention.
//!
//! `SaveConfig` is a Bevy resource so a host can tweak it at runtime, and
//! it persists with bitcode so the batch tool and the game share one file.

use bevy::prelude::*;

/// Default number of snapshots kept per source version.
pub const DEFAULT_MAX_BACKUPS_PER_VERSION: u32 = 5;

/// Default maximum snapshot age: 30 days.
pub const DEFAULT_MAX_BACKUP_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// Default storage prefix for backup blobs.
pub const DEFAULT_BACKUP_PREFIX: &str = "backups/";

/// Settings for the save engine.
#[derive(Resource, Debug, Clone, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct SaveConfig {
    /// LZ4-compress document payloads on save and backup.
    pub compress: bool,
    /// Snapshots kept per version when pruning. 0 keeps everything.
    pub max_backups_per_version: u32,
    /// Snapshots older than this are pruned. 0 disables the age limit.
    pub max_backup_age_secs: u64,
    /// Storage name prefix under which backups are written.
    pub backup_prefix: String,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            compress: true,
            max_backups_per_version: DEFAULT_MAX_BACKUPS_PER_VERSION,
            max_backup_age_secs: DEFAULT_MAX_BACKUP_AGE_SECS,
            backup_prefix: DEFAULT_BACKUP_PREFIX.to_string(),
        }
    }
}

/// Which snapshots survive a prune.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionPolicy {
    pub max_per_version: Option<usize>,
    pub max_age_millis: Option<u64>,
}

impl SaveConfig {
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_per_version: (self.max_backups_per_version > 0)
                .then_some(self.max_backups_per_version as usize),
            max_age_millis: (self.max_backup_age_secs > 0)
                .then(|| self.max_backup_age_secs.saturating_mul(1000)),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        bitcode::encode(self)
    }

    /// Decode persisted settings, falling back to defaults on damage.
    pub fn decode_or_default(bytes: &[u8]) -> Self {
        match bitcode::decode(bytes) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "SaveConfig: failed to decode {} bytes, falling back to default: {}",
                    bytes.len(),
                    e
                );
                Self::default()
            }
        }
    }
}
