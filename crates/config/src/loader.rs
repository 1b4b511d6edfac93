use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::PlugportConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "plugport.toml",
    "plugport.yaml",
    "plugport.yml",
    "plugport.json",
];

static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);
static DATA_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "plugport")
}

/// Override the config directory (e.g. from `--config-dir`).
pub fn set_config_dir(dir: PathBuf) {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = Some(dir);
}

pub fn clear_config_dir() {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = None;
}

/// Override the data directory (e.g. from `--data-dir`).
pub fn set_data_dir(dir: PathBuf) {
    *DATA_DIR_OVERRIDE.lock().unwrap_or_else(|e| e.into_inner()) = Some(dir);
}

pub fn clear_data_dir() {
    *DATA_DIR_OVERRIDE.lock().unwrap_or_else(|e| e.into_inner()) = None;
}

/// Returns the config directory: the override if set, else `~/.config/plugport/`.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
    {
        return Some(dir);
    }
    project_dirs().map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory holding the registry index and settings.
///
/// Falls back to `./.plugport` when no home directory can be resolved.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = DATA_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
    {
        return dir;
    }
    project_dirs()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".plugport"))
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<PlugportConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./plugport.{toml,yaml,yml,json}` (project-local)
/// 2. `<config_dir>/plugport.{toml,yaml,yml,json}` (user-global)
///
/// Returns `PlugportConfig::default()` if no config file is found or the
/// file fails to load.
pub fn discover_and_load() -> PlugportConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    PlugportConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plugport.toml")
}

/// Serialize `config` to TOML and write it to the resolved config path.
///
/// Creates parent directories if needed. Returns the path written to.
pub fn save_config(config: &PlugportConfig) -> Result<PathBuf> {
    let path = find_or_default_config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_str)?;
    debug!(path = %path.display(), "saved config");
    Ok(path)
}

fn parse_config(raw: &str, path: &Path) -> Result<PlugportConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        _ => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_each_supported_format() {
        let tmp = tempfile::tempdir().unwrap();

        let toml_path = tmp.path().join("plugport.toml");
        std::fs::write(&toml_path, "[extensions]\ndepth = 5\n").unwrap();
        assert_eq!(load_config(&toml_path).unwrap().extensions.depth, 5);

        let yaml_path = tmp.path().join("plugport.yaml");
        std::fs::write(&yaml_path, "extensions:\n  depth: 4\n").unwrap();
        assert_eq!(load_config(&yaml_path).unwrap().extensions.depth, 4);

        let json_path = tmp.path().join("plugport.json");
        std::fs::write(&json_path, r#"{"extensions":{"depth":2}}"#).unwrap();
        assert_eq!(load_config(&json_path).unwrap().extensions.depth, 2);
    }

    #[test]
    fn rejects_unknown_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("plugport.ini");
        std::fs::write(&path, "depth=1").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn reports_parse_errors_with_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("plugport.toml");
        std::fs::write(&path, "[extensions\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { ref path, .. } if path.ends_with("plugport.toml")));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_config(Path::new("/nonexistent/plugport.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn data_dir_override_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        set_data_dir(tmp.path().to_path_buf());
        assert_eq!(data_dir(), tmp.path());
        clear_data_dir();
        assert_ne!(data_dir(), tmp.path());
    }

    #[test]
    fn save_config_writes_into_config_dir_override() {
        let tmp = tempfile::tempdir().unwrap();
        set_config_dir(tmp.path().to_path_buf());

        let mut config = PlugportConfig::default();
        config.extensions.depth = 7;
        let path = save_config(&config).unwrap();
        assert_eq!(path, tmp.path().join("plugport.toml"));
        assert_eq!(find_or_default_config_path(), path);
        assert_eq!(load_config(&path).unwrap().extensions.depth, 7);

        clear_config_dir();
        assert_ne!(config_dir().as_deref(), Some(tmp.path()));
    }
}
