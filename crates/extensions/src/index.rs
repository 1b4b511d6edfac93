//! On-disk index of registered extensions, so ids survive restarts.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    serde::{Deserialize, Serialize},
    tracing::warn,
};

use crate::{
    error::Result,
    observer::Subscription,
    registry::{ExtensionRecord, ExtensionRegistry},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexFile {
    pub version: u32,
    #[serde(default)]
    pub extensions: Vec<ExtensionRecord>,
}

impl Default for IndexFile {
    fn default() -> Self {
        Self {
            version: 1,
            extensions: Vec::new(),
        }
    }
}

/// Persistent index storage with atomic writes.
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default index path: `<data_dir>/extensions.json`.
    pub fn default_path() -> PathBuf {
        plugport_config::data_dir().join("extensions.json")
    }

    /// Load the index, returning an empty one if missing.
    pub fn load(&self) -> Result<IndexFile> {
        Ok(plugport_common::fs::load_json_or_default(&self.path)?)
    }

    pub fn save(&self, records: Vec<ExtensionRecord>) -> Result<()> {
        let file = IndexFile {
            extensions: records,
            ..Default::default()
        };
        plugport_common::fs::save_json_atomic(&self.path, &file)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restore `registry` from this index and keep the index in sync with
    /// every later change.
    pub fn attach(self: Arc<Self>, registry: &Arc<ExtensionRegistry>) -> Result<Subscription> {
        let index = self.load()?;
        registry.restore(index.extensions);

        let weak = Arc::downgrade(registry);
        let store = self;
        Ok(registry.observers().subscribe(move || {
            let Some(registry) = weak.upgrade() else {
                return Ok(());
            };
            store.save(registry.records()).map_err(|e| {
                warn!(path = %store.path.display(), error = %e, "failed to save extension index");
                anyhow::Error::from(e)
            })
        }))
    }
}
