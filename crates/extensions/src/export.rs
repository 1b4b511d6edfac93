//! Best-effort export of arbitrary files to a user-chosen location.

use std::{
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use {
    futures::future::join_all,
    serde::Serialize,
    tracing::{info, warn},
};

use crate::{
    error::{Error, Result},
    package::{PendingFile, write_file_atomic},
    prompt::{MessageKind, MessageOptions, OpenDialogOptions, PromptService, SaveDialogOptions},
    settings::{LAST_EXPORT_DIR, SettingsStore, get_dir, remember_dir},
};

/// What an export wrote. Empty when the user cancelled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<String>,
}

pub struct ExportWriter {
    prompt: Arc<dyn PromptService>,
    settings: Arc<dyn SettingsStore>,
}

impl ExportWriter {
    pub fn new(prompt: Arc<dyn PromptService>, settings: Arc<dyn SettingsStore>) -> Self {
        Self { prompt, settings }
    }

    /// Ask for a destination and write every file there.
    ///
    /// A single file with a plain name gets a save prompt; anything else gets
    /// a directory prompt and keeps its relative layout. Each failing file is
    /// reported through an error dialog and the rest are still written.
    pub async fn export_files(&self, files: Vec<PendingFile>) -> Result<ExportReport> {
        if files.is_empty() {
            return Ok(ExportReport::default());
        }

        let last_dir = get_dir(self.settings.as_ref(), LAST_EXPORT_DIR);
        let single = match files.as_slice() {
            [only] if !has_separator(&only.name) => Some(only),
            _ => None,
        };

        let (export_dir, targets) = match single {
            Some(file) => {
                let suggestion = match &last_dir {
                    Some(dir) => dir.join(&file.name),
                    None => PathBuf::from(&file.name),
                };
                let Some(mut path) = self
                    .prompt
                    .show_save(SaveDialogOptions {
                        title: Some("Export file".to_string()),
                        default_path: Some(suggestion),
                    })
                    .await?
                else {
                    return Ok(ExportReport::default());
                };
                if path.extension().is_none()
                    && let Some(ext) = Path::new(&file.name).extension()
                {
                    path.set_extension(ext);
                }
                let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                (dir, vec![(file, Ok(path))])
            },
            None => {
                let picked = self
                    .prompt
                    .show_open(OpenDialogOptions {
                        title: Some("Export to folder".to_string()),
                        default_path: last_dir,
                        directories: true,
                        create_directory: true,
                        ..Default::default()
                    })
                    .await?;
                let Some(dir) = picked.and_then(|paths| paths.into_iter().next()) else {
                    return Ok(ExportReport::default());
                };
                let targets = files
                    .iter()
                    .map(|file| (file, join_relative(&dir, &file.name)))
                    .collect();
                (dir, targets)
            },
        };

        let results = join_all(
            targets
                .into_iter()
                .map(|(file, target)| self.export_one(file, target)),
        )
        .await;

        let mut report = ExportReport::default();
        for (file, result) in files.iter().zip(results) {
            match result {
                Some(path) => report.written.push(path),
                None => report.failed.push(file.name.clone()),
            }
        }

        if !export_dir.as_os_str().is_empty() {
            remember_dir(self.settings.as_ref(), LAST_EXPORT_DIR, &export_dir);
        }
        info!(
            written = report.written.len(),
            failed = report.failed.len(),
            dir = %export_dir.display(),
            "export finished"
        );
        Ok(report)
    }

    async fn export_one(&self, file: &PendingFile, target: Result<PathBuf>) -> Option<PathBuf> {
        let outcome = match target {
            Ok(path) => write_with_parents(&path, &file.content)
                .await
                .map(|()| path),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(file = %file.name, error = %e, "export failed");
                let shown = self
                    .prompt
                    .show_message(MessageOptions {
                        kind: MessageKind::Error,
                        title: "Export failed".to_string(),
                        message: format!("Could not export {}.", file.name),
                        detail: Some(format!(
                            "{e}\nThe remaining files will still be exported."
                        )),
                    })
                    .await;
                if let Err(e) = shown {
                    warn!(error = %e, "failed to show export error");
                }
                None
            },
        }
    }
}

fn has_separator(name: &str) -> bool {
    name.contains(['/', '\\'])
}

/// Join a `/`- or `\`-separated relative name onto `dir`, refusing anything
/// that could leave it.
fn join_relative(dir: &Path, name: &str) -> Result<PathBuf> {
    let mut path = dir.to_path_buf();
    let mut pushed = false;
    for part in name.split(['/', '\\']).filter(|p| !p.is_empty() && *p != ".") {
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(segment)), None) => path.push(segment),
            _ => return Err(Error::invalid_name(name)),
        }
        pushed = true;
    }
    if !pushed || name.starts_with(['/', '\\']) {
        return Err(Error::invalid_name(name));
    }
    Ok(path)
}

async fn write_with_parents(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    write_file_atomic(path, content).await?;
    Ok(())
}
