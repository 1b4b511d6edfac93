//! Small filesystem helpers shared by the JSON-backed stores.

use std::path::Path;

use {
    serde::{Serialize, de::DeserializeOwned},
    tracing::debug,
};

use crate::Result;

/// Load a JSON document, returning `T::default()` when the file is missing.
pub fn load_json_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Save a JSON document atomically via temp file + rename.
///
/// Parent directories are created as needed.
pub fn save_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_string_pretty(value)?;
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), "saved json document");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::collections::BTreeMap};

    #[test]
    fn missing_file_loads_default() {
        let tmp = tempfile::tempdir().unwrap();
        let loaded: BTreeMap<String, String> =
            load_json_or_default(&tmp.path().join("missing.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/doc.json");
        let mut doc = BTreeMap::new();
        doc.insert("k".to_string(), "v".to_string());

        save_json_atomic(&path, &doc).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded: BTreeMap<String, String> = load_json_or_default(&path).unwrap();
        assert_eq!(loaded.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        let res: Result<BTreeMap<String, String>> = load_json_or_default(&path);
        assert!(matches!(res, Err(crate::Error::Json(_))));
    }
}
