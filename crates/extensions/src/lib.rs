//! Extension discovery, registration and packaging.
//!
//! Extensions are directories holding a `manifest.json`. The
//! [`ManifestScanner`] finds them under user-picked roots, the
//! [`ExtensionRegistry`] hands out stable ids for their manifest paths, and the
//! [`PackageWriter`] creates new ones on disk. Every registry change is
//! broadcast through the registry's [`ObserverHub`].

pub mod error;
pub mod export;
pub mod index;
pub mod manifest;
pub mod observer;
pub mod package;
pub mod prompt;
pub mod registry;
pub mod sanitize;
pub mod scanner;
pub mod service;
pub mod settings;

#[cfg(feature = "file-watcher")]
pub mod watcher;

pub use {
    error::{Error, Result},
    export::{ExportReport, ExportWriter},
    index::IndexStore,
    manifest::{MANIFEST_FILE_NAME, Manifest},
    observer::{ObserverHub, ObserverId, Subscription},
    package::{PackageWriter, PendingFile},
    prompt::{
        MessageKind, MessageOptions, OpenDialogOptions, PromptService, SaveDialogOptions,
    },
    registry::{ExtensionId, ExtensionRecord, ExtensionRegistry, Registration},
    sanitize::{ExtensionAllowList, sanitize_name},
    scanner::{ImportSummary, ManifestScanner},
    service::ExtensionService,
    settings::{JsonSettingsStore, LAST_EXPORT_DIR, LAST_SAVE_DIR, MemorySettingsStore, SettingsStore},
};
