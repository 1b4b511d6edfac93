use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use {
    serde::{Deserialize, Serialize},
    tracing::{debug, info},
};

use crate::{
    error::{Error, Result},
    manifest::Manifest,
    observer::ObserverHub,
};

/// Opaque, stable identifier minted when a manifest path is first registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionId(String);

impl ExtensionId {
    fn mint() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ExtensionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ExtensionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One registered extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    pub id: ExtensionId,
    pub manifest_path: PathBuf,
}

/// Outcome of [`ExtensionRegistry::add_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: ExtensionId,
    /// The path was already registered; `id` is the existing one.
    pub existed: bool,
}

#[derive(Default)]
struct RegistryState {
    records: Vec<ExtensionRecord>,
    by_path: HashMap<PathBuf, ExtensionId>,
}

/// In-memory mapping from extension id to manifest path.
///
/// Mutations complete (and release the lock) before observers run, so an
/// observer always sees the updated registry and may query it freely.
pub struct ExtensionRegistry {
    state: Mutex<RegistryState>,
    observers: Arc<ObserverHub>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            observers: Arc::new(ObserverHub::new()),
        }
    }

    /// The hub notified after every add or remove.
    pub fn observers(&self) -> &Arc<ObserverHub> {
        &self.observers
    }

    /// Load previously persisted records without notifying observers.
    ///
    /// Records whose id or path is already present are skipped. Returns the
    /// number of records restored.
    pub fn restore(&self, records: impl IntoIterator<Item = ExtensionRecord>) -> usize {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut restored = 0;
        for record in records {
            if state.by_path.contains_key(&record.manifest_path)
                || state.records.iter().any(|r| r.id == record.id)
            {
                debug!(id = %record.id, path = %record.manifest_path.display(), "skipping duplicate record");
                continue;
            }
            state
                .by_path
                .insert(record.manifest_path.clone(), record.id.clone());
            state.records.push(record);
            restored += 1;
        }
        restored
    }

    /// Register a manifest path, or return the id it already has.
    ///
    /// Observers are notified only when a new record is created.
    pub fn add_path(&self, manifest_path: impl Into<PathBuf>) -> Registration {
        let manifest_path = manifest_path.into();
        let id = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(id) = state.by_path.get(&manifest_path) {
                return Registration {
                    id: id.clone(),
                    existed: true,
                };
            }
            let id = ExtensionId::mint();
            state.by_path.insert(manifest_path.clone(), id.clone());
            state.records.push(ExtensionRecord {
                id: id.clone(),
                manifest_path: manifest_path.clone(),
            });
            id
        };

        info!(%id, path = %manifest_path.display(), "extension registered");
        self.observers.notify();
        Registration { id, existed: false }
    }

    /// Remove an extension. Unknown ids are ignored and notify nobody.
    ///
    /// Returns whether a record was removed.
    pub fn remove(&self, id: &ExtensionId) -> bool {
        let removed = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match state.records.iter().position(|r| &r.id == id) {
                Some(index) => {
                    let record = state.records.remove(index);
                    state.by_path.remove(&record.manifest_path);
                    Some(record)
                },
                None => None,
            }
        };

        match removed {
            Some(record) => {
                info!(%id, path = %record.manifest_path.display(), "extension removed");
                self.observers.notify();
                true
            },
            None => {
                debug!(%id, "remove ignored, id not registered");
                false
            },
        }
    }

    pub fn get_path(&self, id: &ExtensionId) -> Result<PathBuf> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .records
            .iter()
            .find(|r| &r.id == id)
            .map(|r| r.manifest_path.clone())
            .ok_or_else(|| Error::UnknownId(id.clone()))
    }

    pub fn id_for_path(&self, manifest_path: &Path) -> Option<ExtensionId> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.by_path.get(manifest_path).cloned()
    }

    /// All ids in registration order.
    pub fn ids(&self) -> Vec<ExtensionId> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.records.iter().map(|r| r.id.clone()).collect()
    }

    /// All records in registration order.
    pub fn records(&self) -> Vec<ExtensionRecord> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.records.clone()
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read and parse the manifest for `id` from disk.
    pub async fn load_manifest(&self, id: &ExtensionId) -> Result<Manifest> {
        let path = self.get_path(id)?;
        Manifest::load(&path).await
    }

    /// Read the entry script declared by the manifest for `id`.
    pub async fn load_source(&self, id: &ExtensionId) -> Result<String> {
        let manifest_path = self.get_path(id)?;
        let manifest = Manifest::load(&manifest_path).await?;
        let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
        let source_path = base.join(manifest.entry_point());
        tokio::fs::read_to_string(&source_path)
            .await
            .map_err(|source| Error::SourceRead {
                path: source_path,
                source,
            })
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
