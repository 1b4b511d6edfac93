//! Key-value settings used to remember the last save and export directories.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::warn;

use crate::error::Result;

/// Directory a new package was last saved into.
pub const LAST_SAVE_DIR: &str = "last_save_dir";

/// Directory files were last exported into.
pub const LAST_EXPORT_DIR: &str = "last_export_dir";

/// Settings capability provided by the host. Writes are last-writer-wins.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Read a setting as a path, ignoring blank values.
pub fn get_dir(store: &dyn SettingsStore, key: &str) -> Option<PathBuf> {
    store
        .get(key)
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

/// Store a directory setting; failures are logged, never propagated.
pub fn remember_dir(store: &dyn SettingsStore, key: &str, dir: &Path) {
    if let Err(e) = store.set(key, &dir.to_string_lossy()) {
        warn!(key, dir = %dir.display(), error = %e, "failed to persist setting");
    }
}

/// Settings kept only in memory.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings persisted as a flat JSON object, written atomically on each change.
pub struct JsonSettingsStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonSettingsStore {
    /// Open the store at `path`; a missing file starts empty.
    pub fn open(path: PathBuf) -> Result<Self> {
        let values = plugport_common::fs::load_json_or_default(&path)?;
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Default location: `<data_dir>/settings.json`.
    pub fn default_path() -> PathBuf {
        plugport_config::data_dir().join("settings.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        plugport_common::fs::save_json_atomic(&self.path, &*values)?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_store_persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");

        let store = JsonSettingsStore::open(path.clone()).unwrap();
        assert_eq!(store.get(LAST_SAVE_DIR), None);
        store.set(LAST_SAVE_DIR, "/home/me/plugins").unwrap();

        let reopened = JsonSettingsStore::open(path).unwrap();
        assert_eq!(
            get_dir(&reopened, LAST_SAVE_DIR),
            Some(PathBuf::from("/home/me/plugins"))
        );
    }

    #[test]
    fn blank_dir_reads_as_unset() {
        let store = MemorySettingsStore::new();
        store.set(LAST_EXPORT_DIR, "  ").unwrap();
        assert_eq!(get_dir(&store, LAST_EXPORT_DIR), None);

        remember_dir(&store, LAST_EXPORT_DIR, Path::new("/tmp/out"));
        assert_eq!(get_dir(&store, LAST_EXPORT_DIR), Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn corrupt_file_fails_to_open() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, "[").unwrap();
        assert!(JsonSettingsStore::open(path).is_err());
    }
}
