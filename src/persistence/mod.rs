//! Integer key/value persistence
//!
//! Only two counters survive between sessions: the best score and the index
//! of the level to load next. Backends:
//! - [`MemoryStore`]: in-process, used by tests and as a fallback
//! - [`JsonFileStore`]: a JSON object on disk (native)
//! - [`LocalStorageStore`]: browser LocalStorage (wasm32)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[cfg(not(target_arch = "wasm32"))]
mod file;
#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(not(target_arch = "wasm32"))]
pub use file::{JsonFileStore, StoreError};
#[cfg(target_arch = "wasm32")]
pub use web::LocalStorageStore;

/// Key of the best score slot
pub const BEST_SCORE_KEY: &str = "BestScore";
/// Key of the next level index slot
pub const CURRENT_LEVEL_KEY: &str = "currentLevel";

/// Integer slots keyed by name
///
/// Missing keys read as 0.
pub trait Persistence {
    fn get(&self, key: &str) -> i32;
    fn set(&mut self, key: &str, value: i32);
}

/// In-memory store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    values: BTreeMap<String, i32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: i32) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }
}

impl Persistence for MemoryStore {
    fn get(&self, key: &str) -> i32 {
        self.values.get(key).copied().unwrap_or(0)
    }

    fn set(&mut self, key: &str, value: i32) {
        self.values.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_read_zero() {
        let mut store = MemoryStore::new().with(BEST_SCORE_KEY, 12);
        assert_eq!(store.get(BEST_SCORE_KEY), 12);
        assert_eq!(store.get(CURRENT_LEVEL_KEY), 0);
        store.set(CURRENT_LEVEL_KEY, 2);
        assert_eq!(store.get(CURRENT_LEVEL_KEY), 2);
    }
}
