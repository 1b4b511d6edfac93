//! Handlers for the extension subcommands.

use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result, bail},
    plugport_extensions::{ExtensionId, ExtensionService, PendingFile},
};

pub async fn handle_import(
    service: &ExtensionService,
    paths: Vec<PathBuf>,
    depth: Option<usize>,
    dialog: bool,
    default_depth: usize,
) -> Result<()> {
    let summary = if dialog {
        match service.import_with_dialog().await? {
            Some(summary) => summary,
            None => {
                println!("Import cancelled.");
                return Ok(());
            },
        }
    } else if paths.is_empty() {
        let summary = service.import_search_paths().await?;
        if summary.is_empty() {
            println!("No paths given and no search paths configured.");
            return Ok(());
        }
        summary
    } else {
        service
            .import_extensions(&paths, depth.unwrap_or(default_depth))
            .await?
    };

    for id in &summary.added {
        println!("  + {id}  {}", describe(service, id).await);
    }
    for id in &summary.existed {
        println!("  = {id}  {}", describe(service, id).await);
    }
    println!(
        "{} added, {} already registered",
        summary.added.len(),
        summary.existed.len()
    );
    Ok(())
}

pub async fn handle_list(service: &ExtensionService, json: bool) -> Result<()> {
    let records = service.registry().records();

    if json {
        let mut entries = Vec::with_capacity(records.len());
        for record in &records {
            let manifest = service.get_manifest(&record.id).await.ok();
            entries.push(serde_json::json!({
                "id": record.id,
                "path": record.manifest_path,
                "name": manifest.as_ref().and_then(|m| m.name.clone()),
                "version": manifest.as_ref().and_then(|m| m.version.clone()),
            }));
        }
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No extensions registered.");
        return Ok(());
    }
    for record in &records {
        println!(
            "  {}  {}  ({})",
            record.id,
            describe(service, &record.id).await,
            record.manifest_path.display()
        );
    }
    Ok(())
}

pub async fn handle_show(service: &ExtensionService, id: String) -> Result<()> {
    let id = ExtensionId::from(id);
    let manifest = service.get_manifest(&id).await?;
    println!("{}", manifest.to_pretty_json()?);
    Ok(())
}

pub async fn handle_source(service: &ExtensionService, id: String) -> Result<()> {
    let source = service.get_extension_source(&ExtensionId::from(id)).await?;
    print!("{source}");
    Ok(())
}

pub fn handle_remove(service: &ExtensionService, id: String) -> Result<()> {
    service.remove_extension(&ExtensionId::from(id.as_str()));
    println!("Removed {id}.");
    Ok(())
}

pub async fn handle_new(service: &ExtensionService, dir_name: String, files: Vec<PathBuf>) -> Result<()> {
    let mut pending = Vec::with_capacity(files.len());
    for path in &files {
        pending.push(read_pending(path, None).await?);
    }

    match service.write_new_package(pending, &dir_name).await? {
        Some(id) => println!("Created extension {id}."),
        None => println!("Cancelled."),
    }
    Ok(())
}

pub async fn handle_export(
    service: &ExtensionService,
    files: Vec<PathBuf>,
    base: Option<PathBuf>,
) -> Result<()> {
    let mut pending = Vec::with_capacity(files.len());
    for path in &files {
        pending.push(read_pending(path, base.as_deref()).await?);
    }

    let report = service.export_files(pending).await?;
    for path in &report.written {
        println!("  wrote {}", path.display());
    }
    if !report.failed.is_empty() {
        bail!("{} file(s) failed to export", report.failed.len());
    }
    Ok(())
}

#[cfg(feature = "file-watcher")]
pub async fn handle_watch(service: &ExtensionService) -> Result<()> {
    use {
        plugport_extensions::watcher::{ManifestWatchEvent, ManifestWatcher},
        tracing::debug,
    };

    let manifests: Vec<PathBuf> = service
        .registry()
        .records()
        .into_iter()
        .map(|r| r.manifest_path)
        .collect();
    if manifests.is_empty() {
        println!("No extensions registered.");
        return Ok(());
    }

    let (_watcher, mut rx) = ManifestWatcher::start(&manifests)?;
    println!("Watching {} manifest(s). Press Ctrl-C to stop.", manifests.len());

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(ManifestWatchEvent::Changed(path)) = event else {
                    break;
                };
                service.registry().observers().notify();
                match service.registry().id_for_path(&path) {
                    Some(id) => match service.get_manifest(&id).await {
                        Ok(manifest) => println!(
                            "  ~ {id}  {}",
                            manifest.name.as_deref().unwrap_or("(unnamed)")
                        ),
                        Err(e) => println!("  ! {id}  {e}"),
                    },
                    None => debug!(path = %path.display(), "change outside the registry"),
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

/// One-line label for an extension: its manifest name and version, or the
/// read error.
async fn describe(service: &ExtensionService, id: &ExtensionId) -> String {
    match service.get_manifest(id).await {
        Ok(manifest) => {
            let name = manifest.name.as_deref().unwrap_or("(unnamed)");
            match manifest.version.as_deref() {
                Some(version) => format!("{name} {version}"),
                None => name.to_string(),
            }
        },
        Err(e) => format!("<{e}>"),
    }
}

/// Read a file from disk as a pending file. With `base`, the name keeps the
/// path relative to it (using `/`); otherwise it is the bare file name.
async fn read_pending(path: &Path, base: Option<&Path>) -> Result<PendingFile> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(PendingFile::new(pending_name(path, base)?, content))
}

fn pending_name(path: &Path, base: Option<&Path>) -> Result<String> {
    if let Some(base) = base
        && let Ok(relative) = path.strip_prefix(base)
    {
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if !parts.is_empty() {
            return Ok(parts.join("/"));
        }
    }
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}
