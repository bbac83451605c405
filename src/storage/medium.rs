use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::{StorageError, StorageMedium};

/// In-process medium. Keys iterate in sorted order.
///
/// An optional quota bounds the total size of keys plus values in bytes,
/// mirroring the limit browsers put on local storage.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    entries: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            quota: Some(quota),
        }
    }
}

fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

impl StorageMedium for MemoryMedium {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();

        if let Some(quota) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| entry_size(k, v))
                .sum();
            let needed = used + entry_size(key, value);
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.entries.lock().clear();
        Ok(())
    }

    fn key_at(&self, index: usize) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().keys().nth(index).cloned())
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.entries.lock().len())
    }
}

/// Medium that refuses every operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMedium;

impl StorageMedium for DisabledMedium {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Disabled)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Disabled)
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Disabled)
    }

    fn clear(&self) -> Result<(), StorageError> {
        Err(StorageError::Disabled)
    }

    fn key_at(&self, _index: usize) -> Result<Option<String>, StorageError> {
        Err(StorageError::Disabled)
    }

    fn count(&self) -> Result<usize, StorageError> {
        Err(StorageError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_counts_replaced_entry_once() {
        let medium = MemoryMedium::with_quota(6);
        medium.set("k", "12345").unwrap();
        // Replacing the value must not count the old one.
        medium.set("k", "54321").unwrap();
        assert!(matches!(
            medium.set("k2", "x"),
            Err(StorageError::QuotaExceeded { .. })
        ));
    }

    #[test]
    fn test_disabled_medium_errors() {
        assert!(matches!(DisabledMedium.get("x"), Err(StorageError::Disabled)));
        assert!(matches!(DisabledMedium.count(), Err(StorageError::Disabled)));
    }
}
