//! Filesystem watcher for registered manifests.
//!
//! Watches the directories holding registered `manifest.json` files and sends
//! the changed manifest paths through a channel, debounced.

use std::{path::PathBuf, time::Duration};

use {
    notify_debouncer_full::{
        DebounceEventResult, Debouncer, RecommendedCache, new_debouncer,
        notify::{EventKind, RecommendedWatcher, RecursiveMode},
    },
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    manifest::MANIFEST_FILE_NAME,
};

const DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestWatchEvent {
    /// A manifest was created, modified, or deleted.
    Changed(PathBuf),
}

/// Debounced watcher over manifest directories. Events stop when dropped.
pub struct ManifestWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl ManifestWatcher {
    /// Start watching the directories containing `manifests`.
    pub fn start(
        manifests: &[PathBuf],
    ) -> Result<(Self, mpsc::UnboundedReceiver<ManifestWatchEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let debouncer = new_debouncer(DEBOUNCE, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    for event in events {
                        if !matches!(
                            event.kind,
                            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                        ) {
                            continue;
                        }
                        for path in &event.paths {
                            if path.file_name().is_some_and(|n| n == MANIFEST_FILE_NAME) {
                                debug!(path = %path.display(), "manifest watcher event");
                                let _ = tx.send(ManifestWatchEvent::Changed(path.clone()));
                            }
                        }
                    }
                },
                Err(errors) => {
                    for e in errors {
                        warn!(error = %e, "manifest watcher error");
                    }
                },
            }
        })
        .map_err(|e| Error::external("failed to start manifest watcher", e))?;

        let mut watcher = Self {
            _debouncer: debouncer,
        };

        let mut dirs: Vec<PathBuf> = manifests
            .iter()
            .filter_map(|m| m.parent().map(PathBuf::from))
            .collect();
        dirs.sort();
        dirs.dedup();

        for dir in &dirs {
            if !dir.exists() {
                debug!(dir = %dir.display(), "manifest watcher: directory missing, skipped");
                continue;
            }
            watcher
                ._debouncer
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|e| Error::external(format!("failed to watch {}", dir.display()), e))?;
            info!(dir = %dir.display(), "manifest watcher: watching directory");
        }

        Ok((watcher, rx))
    }
}
