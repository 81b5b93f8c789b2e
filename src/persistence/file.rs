//! JSON file backend (native only)

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{MemoryStore, Persistence};

/// Failures reading or writing the store file
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt store file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Store persisted as a JSON object, rewritten on every `set`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: MemoryStore,
}

impl JsonFileStore {
    /// Open the store, starting empty if the file does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemoryStore::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        log::info!("Opened store {}", path.display());
        Ok(Self { path, values })
    }

    /// Open the store, falling back to an empty one if the file is unreadable
    pub fn open_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::open(path).unwrap_or_else(|e| {
            log::warn!("{e}; starting with an empty store");
            Self {
                path: path.to_path_buf(),
                values: MemoryStore::new(),
            }
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current values to disk
    pub fn save(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.values).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl Persistence for JsonFileStore {
    fn get(&self, key: &str) -> i32 {
        self.values.get(key)
    }

    fn set(&mut self, key: &str, value: i32) {
        self.values.set(key, value);
        if let Err(e) = self.save() {
            log::warn!("{e}");
        }
    }
}
