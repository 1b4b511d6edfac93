//! Name validation for files and directories that end up on disk.
//!
//! A name is trusted only when it survives [`sanitize_name`] unchanged,
//! matches the conservative shape pattern, and (for files) carries an
//! allow-listed extension.

use std::{collections::HashSet, path::Path, sync::LazyLock};

use regex::Regex;

use crate::error::{Error, Result};

/// Entries whose name starts with this marker are skipped during scans.
pub const HIDDEN_PREFIX: char = '.';

const MAX_NAME_BYTES: usize = 255;

const UNSAFE_CHARS: &[char] = &['/', '\\', '<', '>', ':', '"', '|', '?', '*'];

const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[allow(clippy::expect_used)]
static FILE_NAME_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w-]+(?:\.[\w-]+)*\.[\w-]+$").expect("file name shape regex is valid")
});

/// Strip characters that are unsafe in a single filesystem entry name.
///
/// Returns an empty string for names that cannot be made safe (reserved
/// device names, names made only of dots or whitespace).
pub fn sanitize_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() && !UNSAFE_CHARS.contains(c))
        .collect();

    let trimmed = cleaned.trim().trim_end_matches(['.', ' ']);
    if trimmed.is_empty() || is_reserved_device_name(trimmed) {
        return String::new();
    }

    truncate_on_char_boundary(trimmed, MAX_NAME_BYTES).to_string()
}

fn is_reserved_device_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name);
    RESERVED_DEVICE_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Fail with [`Error::InvalidName`] unless `raw` is already sanitized.
pub fn require_sanitized(raw: &str) -> Result<()> {
    if raw.is_empty() || sanitize_name(raw) != raw {
        return Err(Error::invalid_name(raw));
    }
    Ok(())
}

/// Fail with [`Error::InvalidName`] unless `name` looks like `word(.word)*.ext`.
pub fn check_shape(name: &str) -> Result<()> {
    if FILE_NAME_SHAPE.is_match(name) {
        Ok(())
    } else {
        Err(Error::invalid_name(name))
    }
}

/// Lower-cased extension of `name` without the dot, if any.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// The set of file extensions accepted into a plugin package.
#[derive(Debug, Clone)]
pub struct ExtensionAllowList {
    allowed: HashSet<String>,
}

impl ExtensionAllowList {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn contains(&self, ext: &str) -> bool {
        self.allowed.contains(&ext.to_ascii_lowercase())
    }

    /// Fail with [`Error::DisallowedExtension`] unless the extension of `name` is listed.
    pub fn check(&self, name: &str) -> Result<()> {
        match extension_of(name) {
            Some(ext) if self.contains(&ext) => Ok(()),
            _ => Err(Error::DisallowedExtension {
                name: name.to_string(),
            }),
        }
    }

    /// Run every check a package file name must pass.
    pub fn validate_file_name(&self, name: &str) -> Result<()> {
        require_sanitized(name)?;
        check_shape(name)?;
        self.check(name)
    }
}

impl Default for ExtensionAllowList {
    fn default() -> Self {
        Self::new(plugport_config::DEFAULT_ALLOWED_EXTENSIONS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_plain_names() {
        assert_eq!(sanitize_name("manifest.json"), "manifest.json");
        assert_eq!(sanitize_name("my-plugin"), "my-plugin");
    }

    #[test]
    fn sanitize_strips_unsafe_characters() {
        assert_eq!(sanitize_name("../etc/passwd"), "..etcpasswd");
        assert_eq!(sanitize_name("a:b*c?.txt"), "abc.txt");
        assert_eq!(sanitize_name("tab\there"), "tabhere");
        assert_eq!(sanitize_name("  padded.  "), "padded");
    }

    #[test]
    fn sanitize_rejects_reserved_and_empty() {
        assert_eq!(sanitize_name("CON"), "");
        assert_eq!(sanitize_name("nul.txt"), "");
        assert_eq!(sanitize_name("..."), "");
        assert_eq!(sanitize_name(""), "");
    }

    #[test]
    fn sanitize_truncates_long_names() {
        let long = "é".repeat(200);
        let out = sanitize_name(&long);
        assert!(out.len() <= MAX_NAME_BYTES);
        assert!(long.starts_with(&out));
    }

    #[test]
    fn require_sanitized_detects_mismatch() {
        assert!(require_sanitized("index.js").is_ok());
        assert!(matches!(
            require_sanitized("sub/index.js"),
            Err(Error::InvalidName { .. })
        ));
        assert!(matches!(require_sanitized(""), Err(Error::InvalidName { .. })));
    }

    #[test]
    fn shape_requires_extension_segment() {
        assert!(check_shape("index.js").is_ok());
        assert!(check_shape("my-lib.min.js").is_ok());
        assert!(check_shape("README").is_err());
        assert!(check_shape("double..dot.js").is_err());
        assert!(check_shape(".hidden.js").is_err());
        assert!(check_shape("trailing.").is_err());
        assert!(check_shape("space name.js").is_err());
    }

    #[test]
    fn allow_list_is_case_insensitive() {
        let list = ExtensionAllowList::new(["json", ".JS"]);
        assert!(list.check("manifest.json").is_ok());
        assert!(list.check("Main.JS").is_ok());
        assert!(matches!(
            list.check("tool.exe"),
            Err(Error::DisallowedExtension { .. })
        ));
        assert!(list.check("noext").is_err());
    }

    #[test]
    fn validate_file_name_runs_all_checks() {
        let list = ExtensionAllowList::default();
        assert!(list.validate_file_name("style.css").is_ok());
        assert!(matches!(
            list.validate_file_name("a/b.css"),
            Err(Error::InvalidName { .. })
        ));
        assert!(matches!(
            list.validate_file_name("payload.sh"),
            Err(Error::DisallowedExtension { .. })
        ));
    }
}
