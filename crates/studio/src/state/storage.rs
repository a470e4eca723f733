//! Model collection persistence

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use shared::Model;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored models are unreadable: {0}")]
    Format(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store holding the whole collection under one key
pub trait ModelStorage: Send + Sync {
    /// `Ok(None)` when nothing was ever stored under `key`
    fn get(&self, key: &str) -> Result<Option<Vec<Model>>, StorageError>;

    fn set(&self, key: &str, models: &[Model]) -> Result<(), StorageError>;
}

/// One pretty-printed JSON file per key inside a data directory
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl ModelStorage for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<Model>>, StorageError> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn set(&self, key: &str, models: &[Model]) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(models)?;
        // write-then-rename so a crash never leaves a truncated collection
        let tmp = self.path(&format!("{key}.tmp"));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, self.path(key))?;
        Ok(())
    }
}

/// In-process storage, used by tests and as a fallback
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Vec<Model>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_models(key: &str, models: Vec<Model>) -> Self {
        let storage = Self::default();
        storage
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), models);
        storage
    }

    /// What is currently stored under `key`
    pub fn stored(&self, key: &str) -> Option<Vec<Model>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl ModelStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<Model>>, StorageError> {
        Ok(self.stored(key))
    }

    fn set(&self, key: &str, models: &[Model]) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), models.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("models"));
        assert!(storage.get("graphite_models").unwrap().is_none());

        let models = vec![fixtures::bracket_model()];
        storage.set("graphite_models", &models).unwrap();
        assert_eq!(storage.get("graphite_models").unwrap(), Some(models));
        assert!(!dir.path().join("models/graphite_models.tmp.json").exists());
    }

    #[test]
    fn test_file_storage_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("graphite_models.json"), "{not json").unwrap();
        let storage = JsonFileStorage::new(dir.path());
        assert!(matches!(
            storage.get("graphite_models"),
            Err(StorageError::Format(_))
        ));
    }

    #[test]
    fn test_memory_storage_keys_are_separate() {
        let storage = MemoryStorage::with_models("a", vec![fixtures::bracket_model()]);
        assert_eq!(storage.get("a").unwrap().map(|m| m.len()), Some(1));
        assert!(storage.get("b").unwrap().is_none());
    }
}
