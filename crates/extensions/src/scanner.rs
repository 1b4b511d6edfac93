//! Bounded-depth discovery of `manifest.json` files.
//!
//! Traversal runs level by level over an explicit work-list. Every entry of a
//! level is stat'ed and listed concurrently; the first failure aborts the
//! whole scan before anything is registered.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    futures::future::try_join_all,
    serde::Serialize,
    tracing::{debug, info},
};

use crate::{
    error::{Context, Error, Result},
    manifest::MANIFEST_FILE_NAME,
    registry::{ExtensionId, ExtensionRegistry},
    sanitize::HIDDEN_PREFIX,
};

/// Ids produced by one import, split by whether they were new.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub added: Vec<ExtensionId>,
    pub existed: Vec<ExtensionId>,
}

impl ImportSummary {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.existed.is_empty()
    }
}

/// One pending entry of the traversal.
#[derive(Debug)]
struct Visit {
    path: PathBuf,
    /// Directory levels still allowed below this entry; `None` means a
    /// directory here is not listed.
    remaining: Option<usize>,
    top_level: bool,
}

enum Outcome {
    Manifest(PathBuf),
    Descend(Vec<Visit>),
    Skip,
}

/// Finds manifests under user-picked roots and registers them.
pub struct ManifestScanner {
    registry: Arc<ExtensionRegistry>,
}

impl ManifestScanner {
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self { registry }
    }

    /// Discover manifests under `roots` and register each one.
    ///
    /// A directory root is listed together with up to `depth` levels of
    /// subdirectories; a manifest directly inside the deepest listed
    /// directory is still found. A root that is a plain file must itself be
    /// a manifest.
    pub async fn import(&self, roots: &[PathBuf], depth: usize) -> Result<ImportSummary> {
        let manifests = discover(roots, depth).await?;

        let mut summary = ImportSummary::default();
        for path in manifests {
            let registration = self.registry.add_path(path);
            if registration.existed {
                if !summary.existed.contains(&registration.id)
                    && !summary.added.contains(&registration.id)
                {
                    summary.existed.push(registration.id);
                }
            } else {
                summary.added.push(registration.id);
            }
        }

        info!(
            added = summary.added.len(),
            existed = summary.existed.len(),
            "import finished"
        );
        Ok(summary)
    }
}

/// Walk `roots` and return every manifest path found, without duplicates.
pub async fn discover(roots: &[PathBuf], depth: usize) -> Result<Vec<PathBuf>> {
    let mut frontier = roots
        .iter()
        .map(|root| {
            let path = std::path::absolute(root)
                .with_context(|| format!("failed to resolve {}", root.display()))?;
            Ok(Visit {
                path,
                remaining: Some(depth),
                top_level: true,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    let mut found = Vec::new();

    while !frontier.is_empty() {
        debug!(entries = frontier.len(), "scanning level");
        let outcomes = try_join_all(frontier.into_iter().map(visit)).await?;

        frontier = Vec::new();
        for outcome in outcomes {
            match outcome {
                Outcome::Manifest(path) => {
                    if seen.insert(path.clone()) {
                        found.push(path);
                    }
                },
                Outcome::Descend(children) => frontier.extend(children),
                Outcome::Skip => {},
            }
        }
    }

    Ok(found)
}

async fn visit(entry: Visit) -> Result<Outcome> {
    let metadata = tokio::fs::metadata(&entry.path)
        .await
        .with_context(|| format!("failed to stat {}", entry.path.display()))?;

    if metadata.is_dir() {
        let Some(remaining) = entry.remaining else {
            return Ok(Outcome::Skip);
        };
        let children = list_visible(&entry.path).await?;
        return Ok(Outcome::Descend(
            children
                .into_iter()
                .map(|path| Visit {
                    path,
                    remaining: remaining.checked_sub(1),
                    top_level: false,
                })
                .collect(),
        ));
    }

    if is_manifest_name(&entry.path) {
        return Ok(Outcome::Manifest(entry.path));
    }

    if entry.top_level {
        return Err(Error::ManifestNaming {
            path: entry.path,
            expected: MANIFEST_FILE_NAME,
        });
    }

    Ok(Outcome::Skip)
}

async fn list_visible(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to list {}", dir.display()))?;

    let mut children = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed to list {}", dir.display()))?
    {
        if entry.file_name().to_string_lossy().starts_with(HIDDEN_PREFIX) {
            continue;
        }
        children.push(entry.path());
    }
    Ok(children)
}

fn is_manifest_name(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name == MANIFEST_FILE_NAME)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn touch_manifest(dir: &Path) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(MANIFEST_FILE_NAME);
        std::fs::write(&path, r#"{"name":"x"}"#).unwrap();
        path
    }

    fn sorted(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
        paths.sort();
        paths
    }

    #[tokio::test]
    async fn finds_manifests_within_depth() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("plugins");
        let a = touch_manifest(&root.join("a"));
        let b = touch_manifest(&root.join("b/x"));

        let found = discover(std::slice::from_ref(&root), 2).await.unwrap();
        assert_eq!(sorted(found), sorted(vec![a, b]));
    }

    #[tokio::test]
    async fn manifests_below_depth_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("plugins");
        let shallow = touch_manifest(&root.join("a"));
        touch_manifest(&root.join("b/x/y"));

        let found = discover(std::slice::from_ref(&root), 1).await.unwrap();
        assert_eq!(found, vec![shallow]);
    }

    #[tokio::test]
    async fn depth_zero_only_checks_the_root_itself() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("plugins");
        touch_manifest(&root.join("a"));

        let found = discover(std::slice::from_ref(&root), 0).await.unwrap();
        assert!(found.is_empty());

        let own = touch_manifest(&root);
        let found = discover(std::slice::from_ref(&root), 0).await.unwrap();
        assert_eq!(found, vec![own]);
    }

    #[tokio::test]
    async fn hidden_entries_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("plugins");
        touch_manifest(&root.join(".cache"));
        let visible = touch_manifest(&root.join("visible"));

        let found = discover(std::slice::from_ref(&root), 3).await.unwrap();
        assert_eq!(found, vec![visible]);
    }

    #[tokio::test]
    async fn top_level_file_must_be_a_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let stray = tmp.path().join("plugin.json");
        std::fs::write(&stray, "{}").unwrap();

        let err = discover(&[stray], 3).await.unwrap_err();
        assert!(matches!(err, Error::ManifestNaming { expected: "manifest.json", .. }));
    }

    #[tokio::test]
    async fn top_level_manifest_file_is_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = touch_manifest(&tmp.path().join("single"));
        let found = discover(std::slice::from_ref(&manifest), 0).await.unwrap();
        assert_eq!(found, vec![manifest]);
    }

    #[tokio::test]
    async fn nested_non_manifest_files_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("plugins");
        std::fs::create_dir_all(root.join("a")).unwrap();
        std::fs::write(root.join("a/readme.md"), "hi").unwrap();

        let found = discover(&[root], 2).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn missing_root_fails_the_scan() {
        let tmp = tempfile::tempdir().unwrap();
        let err = discover(&[tmp.path().join("nope")], 1).await.unwrap_err();
        assert!(matches!(err, Error::Message { .. }));
    }

    #[tokio::test]
    async fn import_splits_added_and_existed_without_duplicates() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("plugins");
        let a = touch_manifest(&root.join("a"));
        touch_manifest(&root.join("b"));

        let registry = Arc::new(ExtensionRegistry::new());
        let pre = registry.add_path(&a).id;
        let scanner = ManifestScanner::new(Arc::clone(&registry));

        // Overlapping roots reach `a` twice.
        let summary = scanner
            .import(&[root.clone(), root.join("a")], 2)
            .await
            .unwrap();
        assert_eq!(summary.existed, vec![pre]);
        assert_eq!(summary.added.len(), 1);
        assert_eq!(registry.len(), 2);

        let again = scanner.import(&[root], 2).await.unwrap();
        assert!(again.added.is_empty());
        assert_eq!(again.existed.len(), 2);
    }

    #[tokio::test]
    async fn failed_scan_registers_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("plugins");
        touch_manifest(&root.join("a"));
        let stray = tmp.path().join("notes.txt");
        std::fs::write(&stray, "x").unwrap();

        let registry = Arc::new(ExtensionRegistry::new());
        let scanner = ManifestScanner::new(Arc::clone(&registry));
        assert!(scanner.import(&[root, stray], 2).await.is_err());
        assert!(registry.is_empty());
    }
}
