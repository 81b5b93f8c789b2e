//! Browser LocalStorage backend (wasm32 only)

use super::Persistence;

/// Store backed by `window.localStorage`, one entry per key
#[derive(Debug, Clone, Default)]
pub struct LocalStorageStore {
    prefix: String,
}

impl LocalStorageStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl Persistence for LocalStorageStore {
    fn get(&self, key: &str) -> i32 {
        Self::storage()
            .and_then(|s| s.get_item(&self.full_key(key)).ok().flatten())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    fn set(&mut self, key: &str, value: i32) {
        let Some(storage) = Self::storage() else {
            log::warn!("LocalStorage unavailable, {} not saved", key);
            return;
        };
        if storage.set_item(&self.full_key(key), &value.to_string()).is_err() {
            log::warn!("Failed to save {} to LocalStorage", key);
        }
    }
}
