use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::registry::ExtensionId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid name `{name}`")]
    InvalidName { name: String },

    #[error("file extension not allowed: `{name}`")]
    DisallowedExtension { name: String },

    #[error("manifest must be named exactly `{expected}`: {path}")]
    ManifestNaming {
        path: PathBuf,
        expected: &'static str,
    },

    #[error("package does not contain a `{expected}`")]
    NoManifest { expected: &'static str },

    #[error("invalid manifest JSON in {origin}: {source}")]
    ManifestParse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid manifest in {origin}: {reason}")]
    ManifestShape { origin: String, reason: String },

    #[error("manifest must not declare the reserved `{field}` field")]
    ReservedField { field: &'static str },

    #[error("invalid destination directory: {path}")]
    InvalidDirectory { path: PathBuf },

    #[error("destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    #[error("extension {id} was already registered for new destination {path}")]
    UnexpectedDuplicate { id: ExtensionId, path: PathBuf },

    #[error("unknown extension id `{0}`")]
    UnknownId(ExtensionId),

    #[error("failed to read manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read extension source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid file `{name}`: {reason}")]
    InvalidFile {
        name: String,
        #[source]
        reason: Box<Error>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] plugport_common::Error),

    #[error("{message}")]
    Message { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    #[must_use]
    pub fn invalid_file(name: impl Into<String>, reason: Error) -> Self {
        Self::InvalidFile {
            name: name.into(),
            reason: Box::new(reason),
        }
    }

    #[must_use]
    pub fn manifest_read(path: &Path, source: std::io::Error) -> Self {
        Self::ManifestRead {
            path: path.to_path_buf(),
            source,
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// True for failures caused by user input that can be fixed and retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidName { .. }
                | Self::DisallowedExtension { .. }
                | Self::ManifestNaming { .. }
                | Self::NoManifest { .. }
                | Self::ManifestParse { .. }
                | Self::ManifestShape { .. }
                | Self::ReservedField { .. }
                | Self::InvalidDirectory { .. }
                | Self::DestinationExists { .. }
                | Self::InvalidFile { .. }
        )
    }
}

impl plugport_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

plugport_common::impl_context!();
