// ---------------------------------------------------------------------------
// Backup manager: immutable pre-migration snapshots keyed by version
// ---------------------------------------------------------------------------
//
// Every snapshot is one atomic `Storage::write` of a headered, checksummed
// blob named
//
//   {prefix}v{version:04}-{sequence:012}-{timestamp}.bak
//
// so a listing sorted by name is sorted by version and then by creation
// order.  Snapshots are never rewritten; restore only reads.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use bevy::log::{debug, info};

use crate::clock::Clock;
use crate::save_codec::{decode_document, encode_document};
use crate::save_config::RetentionPolicy;
use crate::save_error::{RollbackError, SaveError};
use crate::save_types::Document;
use crate::storage::Storage;
use crate::version_detect::detect_version;

const BACKUP_SUFFIX: &str = ".bak";

/// Identifies one snapshot.  Ordered by creation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackupId {
    /// Monotonic per storage; later snapshots have larger sequences.
    pub sequence: u64,
    /// Version of the document captured in the snapshot.
    pub version: u32,
    /// Milliseconds since the Unix epoch when the snapshot was taken.
    pub timestamp: u64,
}

impl BackupId {
    fn storage_name(&self, prefix: &str) -> String {
        format!(
            "{prefix}v{:04}-{:012}-{}{BACKUP_SUFFIX}",
            self.version, self.sequence, self.timestamp
        )
    }

    fn parse(prefix: &str, name: &str) -> Option<Self> {
        let stem = name
            .strip_prefix(prefix)?
            .strip_suffix(BACKUP_SUFFIX)?
            .strip_prefix('v')?;
        let mut parts = stem.split('-');
        let version = parts.next()?.parse().ok()?;
        let sequence = parts.next()?.parse().ok()?;
        let timestamp = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            sequence,
            version,
            timestamp,
        })
    }
}

/// Writes, lists, restores and prunes snapshots in a [`Storage`].
pub struct BackupManager {
    storage: Arc<dyn Storage>,
    prefix: String,
    clock: Arc<dyn Clock>,
    compress: bool,
    next_sequence: Mutex<Option<u64>>,
}

impl BackupManager {
    pub fn new(
        storage: Arc<dyn Storage>,
        prefix: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
            clock,
            compress: true,
            next_sequence: Mutex::new(None),
        }
    }

    /// Whether snapshot payloads are LZ4 compressed (default `true`).
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Snapshot `doc` under its own detected version.
    pub fn snapshot(&self, doc: &Document) -> Result<BackupId, SaveError> {
        let version = detect_version(doc).ok_or(SaveError::VersionUndetectable)?;
        self.snapshot_at(doc, version)
    }

    /// Snapshot `doc` under `version`.
    ///
    /// # Errors
    ///
    /// `BackupWriteFailed` if the blob cannot be encoded or written.
    pub fn snapshot_at(&self, doc: &Document, version: u32) -> Result<BackupId, SaveError> {
        let write_failed = |cause: String| SaveError::BackupWriteFailed { version, cause };

        let timestamp = self.clock.now_millis();
        let bytes = encode_document(doc, self.compress, timestamp)
            .map_err(|e| write_failed(e.to_string()))?;

        let mut next = self
            .next_sequence
            .lock()
            .map_err(|_| write_failed("backup sequence lock poisoned".to_string()))?;
        let sequence = match *next {
            Some(seq) => seq,
            None => self
                .list_all()
                .map_err(|e| write_failed(e.to_string()))?
                .last()
                .map_or(0, |id| id.sequence + 1),
        };

        let id = BackupId {
            sequence,
            version,
            timestamp,
        };
        self.storage
            .write(&id.storage_name(&self.prefix), &bytes)
            .map_err(|e| write_failed(e.to_string()))?;
        *next = Some(sequence + 1);

        info!(
            "Backup #{} written for v{} ({} bytes)",
            id.sequence,
            id.version,
            bytes.len()
        );
        Ok(id)
    }

    /// Every snapshot, oldest first.
    pub fn list_all(&self) -> Result<Vec<BackupId>, SaveError> {
        let mut ids: Vec<BackupId> = self
            .storage
            .list(&self.prefix)?
            .iter()
            .filter_map(|name| BackupId::parse(&self.prefix, name))
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Snapshots taken of documents at `version`, oldest first.
    pub fn list(&self, version: u32) -> Result<Vec<BackupId>, SaveError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|id| id.version == version)
            .collect())
    }

    /// The most recent snapshot for `version`.
    ///
    /// # Errors
    ///
    /// `RollbackNotFound(version)` if there is none.
    pub fn restore(&self, version: u32) -> Result<Document, RollbackError> {
        let latest = self
            .list(version)?
            .pop()
            .ok_or(SaveError::RollbackNotFound(version))?;
        self.restore_id(&latest)
    }

    /// A specific snapshot.
    pub fn restore_id(&self, id: &BackupId) -> Result<Document, RollbackError> {
        let bytes = self.read_raw(id)?;
        debug!("Restoring backup #{} (v{})", id.sequence, id.version);
        decode_document(&bytes)
    }

    /// The stored blob for `id`, exactly as written.
    pub fn read_raw(&self, id: &BackupId) -> Result<Vec<u8>, RollbackError> {
        self.storage
            .read(&id.storage_name(&self.prefix))?
            .ok_or(SaveError::RollbackNotFound(id.version))
    }

    /// Delete snapshots outside `policy`.  Returns what was removed.
    ///
    /// Age is checked first; the count limit then keeps the newest
    /// `max_per_version` survivors of each version.
    pub fn prune(&self, policy: RetentionPolicy) -> Result<Vec<BackupId>, SaveError> {
        let now = self.clock.now_millis();
        let mut by_version: BTreeMap<u32, Vec<BackupId>> = BTreeMap::new();
        let mut doomed = Vec::new();

        for id in self.list_all()? {
            let expired = policy
                .max_age_millis
                .is_some_and(|max_age| now.saturating_sub(id.timestamp) > max_age);
            if expired {
                doomed.push(id);
            } else {
                by_version.entry(id.version).or_default().push(id);
            }
        }

        if let Some(keep) = policy.max_per_version {
            for ids in by_version.values() {
                let excess = ids.len().saturating_sub(keep);
                doomed.extend_from_slice(&ids[..excess]);
            }
        }

        doomed.sort();
        for id in &doomed {
            self.storage.delete(&id.storage_name(&self.prefix))?;
        }
        if !doomed.is_empty() {
            info!("Pruned {} backup(s)", doomed.len());
        }
        Ok(doomed)
    }
}
