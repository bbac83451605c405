//! Persisted key/value storage shared by every mounted module.
//!
//! The medium underneath (memory, a JSON file, a disabled store) is allowed
//! to fail. [`StorageService`] turns it into a total interface: failures are
//! logged and reported to callers as "value absent" or a no-op.

mod file;
mod medium;

use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use file::FileMedium;
pub use medium::{DisabledMedium, MemoryMedium};

/// Well-known storage keys. Once published, do not rename.
pub mod keys {
    /// Active locale code, stored as a bare string.
    pub const SELECTED_LANGUAGE: &str = "selectedLanguage";
    /// Id of the selected theme, stored as a bare string.
    pub const SELECTED_THEME_ID: &str = "selectedThemeId";
    /// JSON array of `{ id, themeConfig }` records.
    pub const CUSTOM_THEMES: &str = "customThemes";
    /// Signed-in identity as a JSON object; absent when signed out.
    pub const AUTH_IDENTITY: &str = "authIdentity";
}

/// Errors raised by a storage medium.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage is disabled")]
    Disabled,

    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    #[error("Storage I/O failed on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A fallible key/value medium scoped to one origin.
///
/// Implementations report every failure; [`StorageService`] decides what
/// callers see.
pub trait StorageMedium: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
    /// Key at `index` in the medium's iteration order.
    fn key_at(&self, index: usize) -> Result<Option<String>, StorageError>;
    fn count(&self) -> Result<usize, StorageError>;
}

/// Total, failure-swallowing view over a [`StorageMedium`].
///
/// Cheap to clone; clones share the same medium.
#[derive(Clone)]
pub struct StorageService {
    medium: Arc<dyn StorageMedium>,
}

impl StorageService {
    pub fn new(medium: Arc<dyn StorageMedium>) -> Self {
        Self { medium }
    }

    /// Unbounded in-process storage.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryMedium::new()))
    }

    /// Storage backed by a JSON document at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileMedium::new(path)))
    }

    /// Storage where every operation fails (and is swallowed).
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledMedium))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self.medium.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Storage read failed");
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        if let Err(e) = self.medium.set(key, value) {
            tracing::warn!(key = %key, error = %e, "Storage write failed");
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.medium.remove(key) {
            tracing::warn!(key = %key, error = %e, "Storage remove failed");
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.medium.clear() {
            tracing::warn!(error = %e, "Storage clear failed");
        }
    }

    pub fn key_at(&self, index: usize) -> Option<String> {
        match self.medium.key_at(index) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(index, error = %e, "Storage key lookup failed");
                None
            }
        }
    }

    pub fn count(&self) -> usize {
        match self.medium.count() {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Storage count failed");
                0
            }
        }
    }

    /// Read and decode a JSON value. Absent and corrupt values both yield `None`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Stored value is not valid JSON, ignoring");
                None
            }
        }
    }

    /// Encode `value` as JSON and store it.
    ///
    /// Only encoding failures are returned; medium failures are swallowed
    /// like every other write.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.set(key, &raw);
        Ok(())
    }
}

impl Default for StorageService {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_disabled_storage_is_total() {
        let storage = StorageService::disabled();
        storage.set("a", "1");
        storage.remove("a");
        storage.clear();
        assert_eq!(storage.get("a"), None);
        assert_eq!(storage.key_at(0), None);
        assert_eq!(storage.count(), 0);
    }

    #[test]
    fn test_quota_failure_leaves_previous_value() {
        let storage = StorageService::new(Arc::new(MemoryMedium::with_quota(8)));
        storage.set("k", "abc");
        storage.set("k", "this value is far too long");
        assert_eq!(storage.get("k").as_deref(), Some("abc"));
    }

    #[test]
    fn test_get_json_treats_corrupt_value_as_absent() {
        let storage = StorageService::in_memory();
        storage.set(keys::CUSTOM_THEMES, "[{not json");
        assert_eq!(storage.get_json::<serde_json::Value>(keys::CUSTOM_THEMES), None);
    }

    #[test]
    fn test_set_json_round_trips() {
        let storage = StorageService::in_memory();
        storage
            .set_json("themes", &json!([{"id": "a"}]))
            .unwrap();
        assert_eq!(
            storage.get_json::<serde_json::Value>("themes"),
            Some(json!([{"id": "a"}]))
        );
    }

    #[test]
    fn test_key_at_follows_sorted_order() {
        let storage = StorageService::in_memory();
        storage.set("b", "2");
        storage.set("a", "1");
        assert_eq!(storage.count(), 2);
        assert_eq!(storage.key_at(0).as_deref(), Some("a"));
        assert_eq!(storage.key_at(1).as_deref(), Some("b"));
        assert_eq!(storage.key_at(2), None);
    }
}
