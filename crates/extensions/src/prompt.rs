//! Host dialog capability injected into the writers.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;

/// Options for an open (pick existing paths) dialog.
#[derive(Debug, Clone, Default)]
pub struct OpenDialogOptions {
    pub title: Option<String>,
    pub default_path: Option<PathBuf>,
    /// Allow picking directories.
    pub directories: bool,
    /// Allow picking files.
    pub files: bool,
    pub multiple: bool,
    /// Offer to create the directory if it does not exist yet.
    pub create_directory: bool,
}

/// Options for a save (choose a new path) dialog.
#[derive(Debug, Clone, Default)]
pub struct SaveDialogOptions {
    pub title: Option<String>,
    pub default_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct MessageOptions {
    pub kind: MessageKind,
    pub title: String,
    pub message: String,
    pub detail: Option<String>,
}

/// Native file-picker and message-box service provided by the host.
///
/// `Ok(None)` from a picker means the user cancelled.
#[async_trait]
pub trait PromptService: Send + Sync {
    async fn show_open(&self, options: OpenDialogOptions) -> Result<Option<Vec<PathBuf>>>;

    async fn show_save(&self, options: SaveDialogOptions) -> Result<Option<PathBuf>>;

    async fn show_message(&self, options: MessageOptions) -> Result<()>;
}
