/// Config schema types for the plugport host.
use serde::{Deserialize, Serialize};

/// File extensions a plugin package may contain unless overridden in config.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "json", "js", "mjs", "cjs", "css", "html", "md", "txt", "png", "svg",
];

/// Default recursion budget for `import` when none is given.
pub const DEFAULT_SCAN_DEPTH: usize = 3;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlugportConfig {
    pub extensions: ExtensionsConfig,
}

/// Extension discovery and packaging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    /// Maximum directory depth walked when importing.
    pub depth: usize,
    /// Allow-list of file extensions accepted in new packages (without the dot).
    pub allowed_extensions: Vec<String>,
    /// Directories imported when `import` runs without explicit paths.
    pub search_paths: Vec<String>,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_SCAN_DEPTH,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
            search_paths: Vec::new(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: PlugportConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.extensions.depth, DEFAULT_SCAN_DEPTH);
        assert!(cfg.extensions.allowed_extensions.iter().any(|e| e == "json"));
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: PlugportConfig = toml::from_str("[extensions]\ndepth = 1\n").unwrap();
        assert_eq!(cfg.extensions.depth, 1);
        assert_eq!(
            cfg.extensions.allowed_extensions.len(),
            DEFAULT_ALLOWED_EXTENSIONS.len()
        );
        assert!(cfg.extensions.search_paths.is_empty());
    }
}
