use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::{StorageError, StorageMedium};

/// Medium persisted as a single JSON object on disk.
///
/// Every operation re-reads the file under an `fs2` lock held on a sibling
/// `.lock` file, so several shell processes can share one storage file.
/// Writes go to a `.tmp` sibling that is renamed over the data file; a
/// failed write leaves the previous contents intact. A missing or corrupt
/// file reads as empty; the next write replaces it.
#[derive(Debug, Clone)]
pub struct FileMedium {
    path: PathBuf,
}

type Entries = BTreeMap<String, String>;

impl FileMedium {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.local/share/mfe-shell/storage.json` or the platform equivalent.
    pub fn default_path() -> PathBuf {
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        data_dir.join("mfe-shell").join("storage.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("storage"));
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn open_lock(&self) -> Result<File, StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.sibling(".lock"))
            .map_err(|e| self.io_error(e))
    }

    /// Current file contents; a missing file is empty.
    fn load(&self) -> Result<String, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn read(&self) -> Result<Entries, StorageError> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }

        let lock = self.open_lock()?;
        FileExt::lock_shared(&lock).map_err(|e| self.io_error(e))?;
        let content = self.load();
        let _ = FileExt::unlock(&lock);

        Ok(self.parse(&content?))
    }

    fn update<R>(&self, apply: impl FnOnce(&mut Entries) -> R) -> Result<R, StorageError> {
        let lock = self.open_lock()?;
        FileExt::lock_exclusive(&lock).map_err(|e| self.io_error(e))?;

        let result = self.rewrite(apply);
        let _ = FileExt::unlock(&lock);
        result
    }

    fn rewrite<R>(&self, apply: impl FnOnce(&mut Entries) -> R) -> Result<R, StorageError> {
        let mut entries = self.parse(&self.load()?);
        let result = apply(&mut entries);

        let encoded = serde_json::to_string_pretty(&entries).map_err(|source| {
            StorageError::Encode {
                key: self.path.display().to_string(),
                source,
            }
        })?;

        let temp = self.sibling(".tmp");
        let written = File::create(&temp).and_then(|mut file| {
            file.write_all(encoded.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|_| fs::rename(&temp, &self.path)) {
            let _ = fs::remove_file(&temp);
            return Err(self.io_error(e));
        }
        Ok(result)
    }

    fn parse(&self, content: &str) -> Entries {
        if content.trim().is_empty() {
            return Entries::new();
        }
        match serde_json::from_str(content) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Storage file is corrupt, treating as empty"
                );
                Entries::new()
            }
        }
    }
}

impl StorageMedium for FileMedium {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.update(|entries| entries.clear())
    }

    fn key_at(&self, index: usize) -> Result<Option<String>, StorageError> {
        Ok(self.read()?.into_keys().nth(index))
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.read()?.len())
    }
}
