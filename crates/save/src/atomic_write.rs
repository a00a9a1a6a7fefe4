//! Atomic file write using the write-rename pattern.
//!
//! Writes data to a temporary file (`{path}.tmp`), calls `sync_all()` to
//! ensure bytes are flushed to persistent storage, then atomically renames
//! the temp file to the final path.  A crash during the write leaves either
//! the previous file or the new one, never a half-written file under the
//! final name.  Both live saves and backup snapshots go through here.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Suffix of in-flight temp files.  Anything carrying it after startup is a
/// crash artifact.
pub const TMP_SUFFIX: &str = ".tmp";

/// Temp path used while writing `path`.
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

/// Atomically writes `data` to `path` using the write-rename pattern.
///
/// 1. Write to `{path}.tmp`
/// 2. `sync_all()` to flush to disk
/// 3. `rename` temp to final path (atomic on POSIX; near-atomic on Windows)
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp_path = tmp_path_for(path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    fs::rename(&tmp_path, path)?;

    Ok(())
}
