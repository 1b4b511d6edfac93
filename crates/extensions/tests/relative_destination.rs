//! Package destinations given relative to the working directory.
//!
//! Kept in its own test binary: it changes the process working directory.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{path::PathBuf, sync::Arc};

use {
    async_trait::async_trait,
    plugport_config::ExtensionsConfig,
    plugport_extensions::{
        ExtensionRegistry, ExtensionService, LAST_SAVE_DIR, MemorySettingsStore, MessageOptions,
        OpenDialogOptions, PendingFile, PromptService, Result, SaveDialogOptions, SettingsStore,
    },
};

/// Accepts whatever path is suggested, like a terminal run with `--yes`.
struct AcceptSuggestion;

#[async_trait]
impl PromptService for AcceptSuggestion {
    async fn show_open(&self, options: OpenDialogOptions) -> Result<Option<Vec<PathBuf>>> {
        Ok(options.default_path.map(|p| vec![p]))
    }

    async fn show_save(&self, options: SaveDialogOptions) -> Result<Option<PathBuf>> {
        Ok(options.default_path)
    }

    async fn show_message(&self, _options: MessageOptions) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn relative_save_path_is_registered_absolute() {
    let tmp = tempfile::tempdir().unwrap();
    let cwd = std::fs::canonicalize(tmp.path()).unwrap();
    std::env::set_current_dir(&cwd).unwrap();

    let settings = Arc::new(MemorySettingsStore::new());
    let registry = Arc::new(ExtensionRegistry::new());
    let service = ExtensionService::new(
        Arc::clone(&registry),
        Arc::new(AcceptSuggestion),
        settings.clone(),
        ExtensionsConfig::default(),
    );

    let id = service
        .write_new_package(vec![PendingFile::new("manifest.json", "{}")], "myplug")
        .await
        .unwrap()
        .unwrap();

    let path = registry.get_path(&id).unwrap();
    assert!(path.is_absolute());
    assert_eq!(path, cwd.join("myplug").join("manifest.json"));
    assert_eq!(
        settings.get(LAST_SAVE_DIR),
        Some(cwd.to_string_lossy().into_owned())
    );

    let summary = service
        .import_extensions(&[PathBuf::from("myplug")], 1)
        .await
        .unwrap();
    assert!(summary.added.is_empty());
    assert_eq!(summary.existed, vec![id]);
    assert_eq!(service.list_extension_ids().len(), 1);
}
