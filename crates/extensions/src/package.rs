//! Validated, prompt-driven creation of a new plugin package on disk.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    futures::future::join_all,
    tracing::{info, warn},
};

use crate::{
    error::{Context, Error, Result},
    manifest::{MANIFEST_FILE_NAME, Manifest},
    prompt::{PromptService, SaveDialogOptions},
    registry::{ExtensionId, ExtensionRegistry},
    sanitize::{ExtensionAllowList, require_sanitized},
    settings::{LAST_SAVE_DIR, SettingsStore, get_dir, remember_dir},
};

/// An in-memory file waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl PendingFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Writes a new package directory and registers its manifest.
pub struct PackageWriter {
    registry: Arc<ExtensionRegistry>,
    prompt: Arc<dyn PromptService>,
    settings: Arc<dyn SettingsStore>,
    allow_list: ExtensionAllowList,
}

impl PackageWriter {
    pub fn new(
        registry: Arc<ExtensionRegistry>,
        prompt: Arc<dyn PromptService>,
        settings: Arc<dyn SettingsStore>,
        allow_list: ExtensionAllowList,
    ) -> Self {
        Self {
            registry,
            prompt,
            settings,
            allow_list,
        }
    }

    /// Validate `files`, ask where to save them, write them and register the
    /// result.
    ///
    /// Returns `Ok(None)` when the user cancels the save prompt. Nothing is
    /// written unless every file name and the manifest are valid and the
    /// destination does not exist yet. Individual write failures after that
    /// point are logged and skipped.
    pub async fn write_new_package(
        &self,
        mut files: Vec<PendingFile>,
        dir_name: &str,
    ) -> Result<Option<ExtensionId>> {
        let mut names = HashSet::new();
        for file in &files {
            self.allow_list
                .validate_file_name(&file.name)
                .map_err(|e| Error::invalid_file(&file.name, e))?;
            if !names.insert(file.name.as_str()) {
                return Err(Error::invalid_file(
                    &file.name,
                    Error::message("duplicate file name in package"),
                ));
            }
        }

        let manifest_index = files
            .iter()
            .position(|f| f.name == MANIFEST_FILE_NAME)
            .ok_or(Error::NoManifest {
                expected: MANIFEST_FILE_NAME,
            })?;
        let manifest_text = std::str::from_utf8(&files[manifest_index].content).map_err(|_| {
            Error::ManifestShape {
                origin: MANIFEST_FILE_NAME.to_string(),
                reason: "manifest is not valid UTF-8".to_string(),
            }
        })?;
        let mut manifest = Manifest::parse_authored(manifest_text, MANIFEST_FILE_NAME)?;

        require_sanitized(dir_name)?;
        let suggestion = match get_dir(self.settings.as_ref(), LAST_SAVE_DIR) {
            Some(last) => last.join(dir_name),
            None => PathBuf::from(dir_name),
        };
        let Some(chosen) = self
            .prompt
            .show_save(SaveDialogOptions {
                title: Some("Save extension".to_string()),
                default_path: Some(suggestion),
            })
            .await?
        else {
            info!("package save cancelled");
            return Ok(None);
        };
        let destination = std::path::absolute(&chosen)
            .with_context(|| format!("failed to resolve {}", chosen.display()))?;

        let leaf = leaf_name(&destination).ok_or_else(|| Error::InvalidDirectory {
            path: destination.clone(),
        })?;
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            remember_dir(self.settings.as_ref(), LAST_SAVE_DIR, parent);
        }

        if !manifest.has_name() {
            manifest.name = Some(leaf);
            files[manifest_index].content = manifest.to_pretty_json()?.into_bytes();
        }

        if tokio::fs::try_exists(&destination).await? {
            return Err(Error::DestinationExists { path: destination });
        }

        tokio::fs::create_dir_all(&destination).await?;
        let writes = files.iter().map(|file| {
            let path = destination.join(&file.name);
            async move {
                if let Err(e) = write_file_atomic(&path, &file.content).await {
                    warn!(path = %path.display(), error = %e, "failed to write package file, skipping");
                    return false;
                }
                true
            }
        });
        let written = join_all(writes).await.into_iter().filter(|ok| *ok).count();

        let manifest_path = destination.join(MANIFEST_FILE_NAME);
        let registration = self.registry.add_path(&manifest_path);
        if registration.existed {
            return Err(Error::UnexpectedDuplicate {
                id: registration.id,
                path: manifest_path,
            });
        }

        info!(
            id = %registration.id,
            path = %destination.display(),
            written,
            total = files.len(),
            "package written"
        );
        Ok(Some(registration.id))
    }
}

fn leaf_name(destination: &Path) -> Option<String> {
    destination
        .file_name()
        .map(|name| name.to_string_lossy().trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Write `content` to a sibling temp file, then rename it over `path`.
pub(crate) async fn write_file_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()));

    tokio::fs::write(&temp, content).await?;
    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e);
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_name_rejects_root_and_blank() {
        assert_eq!(leaf_name(Path::new("/")), None);
        assert_eq!(leaf_name(Path::new("/plugins/..")), None);
        assert_eq!(leaf_name(Path::new("/plugins/demo")).as_deref(), Some("demo"));
    }

    #[tokio::test]
    async fn atomic_write_replaces_and_leaves_no_temp() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.js");
        write_file_atomic(&path, b"one").await.unwrap();
        write_file_atomic(&path, b"two").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn atomic_write_into_missing_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing/index.js");
        assert!(write_file_atomic(&path, b"x").await.is_err());
    }
}
