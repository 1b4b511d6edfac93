//! Command surface exposed to the host UI.

use std::{path::PathBuf, sync::Arc};

use {plugport_config::ExtensionsConfig, tracing::info};

use crate::{
    error::Result,
    export::{ExportReport, ExportWriter},
    manifest::Manifest,
    observer::Subscription,
    package::{PackageWriter, PendingFile},
    prompt::{OpenDialogOptions, PromptService},
    registry::{ExtensionId, ExtensionRegistry},
    sanitize::ExtensionAllowList,
    scanner::{ImportSummary, ManifestScanner},
    settings::SettingsStore,
};

/// Wires the registry, scanner and writers together behind one handle.
pub struct ExtensionService {
    registry: Arc<ExtensionRegistry>,
    scanner: ManifestScanner,
    packages: PackageWriter,
    exports: ExportWriter,
    prompt: Arc<dyn PromptService>,
    config: ExtensionsConfig,
}

impl ExtensionService {
    pub fn new(
        registry: Arc<ExtensionRegistry>,
        prompt: Arc<dyn PromptService>,
        settings: Arc<dyn SettingsStore>,
        config: ExtensionsConfig,
    ) -> Self {
        let allow_list = ExtensionAllowList::new(&config.allowed_extensions);
        Self {
            scanner: ManifestScanner::new(Arc::clone(&registry)),
            packages: PackageWriter::new(
                Arc::clone(&registry),
                Arc::clone(&prompt),
                Arc::clone(&settings),
                allow_list,
            ),
            exports: ExportWriter::new(Arc::clone(&prompt), settings),
            registry,
            prompt,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.registry
    }

    pub async fn import_extensions(&self, paths: &[PathBuf], depth: usize) -> Result<ImportSummary> {
        self.scanner.import(paths, depth).await
    }

    /// Import the configured search paths with the configured depth.
    pub async fn import_search_paths(&self) -> Result<ImportSummary> {
        let roots: Vec<PathBuf> = self
            .config
            .search_paths
            .iter()
            .map(PathBuf::from)
            .collect();
        if roots.is_empty() {
            return Ok(ImportSummary::default());
        }
        self.scanner.import(&roots, self.config.depth).await
    }

    /// Let the user pick files or folders, then import them.
    ///
    /// Returns `Ok(None)` when the picker is cancelled.
    pub async fn import_with_dialog(&self) -> Result<Option<ImportSummary>> {
        let picked = self
            .prompt
            .show_open(OpenDialogOptions {
                title: Some("Import extensions".to_string()),
                directories: true,
                files: true,
                multiple: true,
                ..Default::default()
            })
            .await?;
        match picked {
            Some(paths) if !paths.is_empty() => {
                Ok(Some(self.scanner.import(&paths, self.config.depth).await?))
            },
            _ => {
                info!("import cancelled");
                Ok(None)
            },
        }
    }

    pub fn list_extension_ids(&self) -> Vec<ExtensionId> {
        self.registry.ids()
    }

    pub async fn get_manifest(&self, id: &ExtensionId) -> Result<Manifest> {
        self.registry.load_manifest(id).await
    }

    /// Unregister `id`. Unknown ids are ignored.
    pub fn remove_extension(&self, id: &ExtensionId) {
        self.registry.remove(id);
    }

    pub async fn get_extension_source(&self, id: &ExtensionId) -> Result<String> {
        self.registry.load_source(id).await
    }

    pub async fn write_new_package(
        &self,
        files: Vec<PendingFile>,
        dir_name: &str,
    ) -> Result<Option<ExtensionId>> {
        self.packages.write_new_package(files, dir_name).await
    }

    pub async fn export_files(&self, files: Vec<PendingFile>) -> Result<ExportReport> {
        self.exports.export_files(files).await
    }

    /// Call `callback` after every registry change until the returned
    /// subscription is unsubscribed.
    pub fn observe_manifest_changes<F>(&self, callback: F) -> Subscription
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.registry.observers().subscribe(callback)
    }
}
