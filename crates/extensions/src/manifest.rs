//! Typed plugin manifest (`manifest.json`).

use std::path::Path;

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::error::{Error, Result};

/// File name every plugin package must use for its manifest.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Field reserved for host-generated provenance; authors may not set it.
pub const RESERVED_BUILD_FIELD: &str = "build";

/// Entry script used when a manifest does not declare `main`.
pub const DEFAULT_ENTRY_POINT: &str = "index.js";

/// A validated plugin manifest. Unrecognized fields are kept in `extra` so a
/// rewrite never drops author data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// Parse manifest text read from disk. `origin` names the source in errors.
    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let object = parse_object(text, origin)?;
        from_object(object, origin)
    }

    /// Parse a manifest supplied by an author for a new package.
    ///
    /// Same as [`Manifest::parse`] but rejects the reserved `build` field,
    /// whatever its value.
    pub fn parse_authored(text: &str, origin: &str) -> Result<Self> {
        let object = parse_object(text, origin)?;
        if object.contains_key(RESERVED_BUILD_FIELD) {
            return Err(Error::ReservedField {
                field: RESERVED_BUILD_FIELD,
            });
        }
        from_object(object, origin)
    }

    /// Read and parse the manifest at `path`. Never cached.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::manifest_read(path, e))?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Pretty JSON with two-space indentation, as written into packages.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Script path relative to the manifest's directory.
    pub fn entry_point(&self) -> &str {
        self.main
            .as_deref()
            .filter(|main| !main.trim().is_empty())
            .unwrap_or(DEFAULT_ENTRY_POINT)
    }

    /// Whether `name` is present and non-blank.
    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}

fn parse_object(text: &str, origin: &str) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(text).map_err(|source| Error::ManifestParse {
        origin: origin.to_string(),
        source,
    })?;
    match value {
        Value::Object(object) => Ok(object),
        other => Err(Error::ManifestShape {
            origin: origin.to_string(),
            reason: format!("expected a JSON object, found {}", json_kind(&other)),
        }),
    }
}

fn from_object(object: Map<String, Value>, origin: &str) -> Result<Manifest> {
    serde_json::from_value(Value::Object(object)).map_err(|e| Error::ManifestShape {
        origin: origin.to_string(),
        reason: e.to_string(),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
