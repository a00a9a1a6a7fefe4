// ---------------------------------------------------------------------------
// Storage: the byte store the engine reads saves from and writes backups to
// ---------------------------------------------------------------------------
//
// The engine never touches a file system, browser store or network
// directly.  The host hands it something implementing `Storage`; every
// `write` must be atomic (the full value or nothing becomes visible).

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::save_error::SaveError;

/// Named blob store supplied by the host environment.
pub trait Storage: Send + Sync {
    /// Read a blob. `Ok(None)` means no blob with that name exists.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, SaveError>;

    /// Atomically create or replace a blob.
    fn write(&self, name: &str, data: &[u8]) -> Result<(), SaveError>;

    /// Names of all blobs starting with `prefix`, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>, SaveError>;

    /// Remove a blob. Removing a missing blob is not an error.
    fn delete(&self, name: &str) -> Result<(), SaveError>;
}

/// In-process storage, used by tests and tooling.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> SaveError {
        SaveError::Io(std::io::Error::other("memory storage lock poisoned"))
    }
}

impl Storage for MemoryStorage {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, SaveError> {
        let blobs = self.blobs.read().map_err(|_| Self::poisoned())?;
        Ok(blobs.get(name).cloned())
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<(), SaveError> {
        let mut blobs = self.blobs.write().map_err(|_| Self::poisoned())?;
        blobs.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, SaveError> {
        let blobs = self.blobs.read().map_err(|_| Self::poisoned())?;
        Ok(blobs
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn delete(&self, name: &str) -> Result<(), SaveError> {
        let mut blobs = self.blobs.write().map_err(|_| Self::poisoned())?;
        blobs.remove(name);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file_storage::FileStorage;

#[cfg(not(target_arch = "wasm32"))]
mod file_storage {
    use std::fs;
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    use super::Storage;
    use crate::atomic_write::{atomic_write, TMP_SUFFIX};
    use crate::save_error::SaveError;

    /// Directory-backed storage.  Blob names map to paths relative to the
    /// root; `/` in a name creates subdirectories.
    #[derive(Debug, Clone)]
    pub struct FileStorage {
        root: PathBuf,
    }

    impl FileStorage {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        pub fn root(&self) -> &Path {
            &self.root
        }

        fn path_of(&self, name: &str) -> Result<PathBuf, SaveError> {
            if name.is_empty() || name.split('/').any(|part| part.is_empty() || part == "..") {
                return Err(SaveError::Io(std::io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("invalid storage name {name:?}"),
                )));
            }
            Ok(self.root.join(name))
        }

        fn collect(
            &self,
            dir: &Path,
            relative: &str,
            out: &mut Vec<String>,
        ) -> std::io::Result<()> {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(e),
            };
            for entry in entries {
                let entry = entry?;
                let file_name = entry.file_name().to_string_lossy().into_owned();
                let name = if relative.is_empty() {
                    file_name
                } else {
                    format!("{relative}/{file_name}")
                };
                if entry.file_type()?.is_dir() {
                    self.collect(&entry.path(), &name, out)?;
                } else if !name.ends_with(TMP_SUFFIX) {
                    out.push(name);
                }
            }
            Ok(())
        }
    }

    impl Storage for FileStorage {
        fn read(&self, name: &str) -> Result<Option<Vec<u8>>, SaveError> {
            match fs::read(self.path_of(name)?) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        fn write(&self, name: &str, data: &[u8]) -> Result<(), SaveError> {
            atomic_write(&self.path_of(name)?, data)?;
            Ok(())
        }

        fn list(&self, prefix: &str) -> Result<Vec<String>, SaveError> {
            let mut names = Vec::new();
            self.collect(&self.root, "", &mut names)?;
            names.retain(|name| name.starts_with(prefix));
            names.sort();
            Ok(names)
        }

        fn delete(&self, name: &str) -> Result<(), SaveError> {
            match fs::remove_file(self.path_of(name)?) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(storage: &dyn Storage) {
        assert_eq!(storage.read("slots/a.sav").unwrap(), None);

        storage.write("slots/a.sav", b"first").unwrap();
        storage.write("slots/b.sav", b"second").unwrap();
        storage.write("backups/v0001.bak", b"snap").unwrap();

        assert_eq!(storage.read("slots/a.sav").unwrap(), Some(b"first".to_vec()));
        assert_eq!(
            storage.list("slots/").unwrap(),
            vec!["slots/a.sav".to_string(), "slots/b.sav".to_string()]
        );

        storage.write("slots/a.sav", b"replaced").unwrap();
        assert_eq!(storage.read("slots/a.sav").unwrap(), Some(b"replaced".to_vec()));

        storage.delete("slots/a.sav").unwrap();
        storage.delete("slots/a.sav").unwrap();
        assert_eq!(storage.read("slots/a.sav").unwrap(), None);
        assert_eq!(storage.list("").unwrap().len(), 2);
    }

    #[test]
    fn test_memory_storage_contract() {
        exercise(&MemoryStorage::new());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_file_storage_contract() {
        let dir = crate::atomic_write::tests::test_dir("file_storage_contract");
        exercise(&FileStorage::new(&dir));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_file_storage_hides_tmp_files_and_rejects_escapes() {
        let dir = crate::atomic_write::tests::test_dir("file_storage_tmp");
        let storage = FileStorage::new(&dir);
        std::fs::write(dir.join("slot.sav.tmp"), b"partial").unwrap();
        assert!(storage.list("").unwrap().is_empty());
        assert!(storage.read("../escape").is_err());
        assert!(storage.write("a//b", b"x").is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
