//! Desired-state templates from application config files.
//!
//! Walks a JSON object and collects the keys a project still has to fill in:
//! every key whose value is the empty string. Nested objects contribute
//! `parent/child` keys. Keys are lower-cased.

use crate::models::paths::ProjectPath;
use crate::models::Parameter;
use crate::{Error, Result};
use serde_json::Value;
use std::path::Path;

/// Leaf keys never turned into parameters.
pub const IGNORED_KEYS: [&str; 3] = ["Environment", "AWSAccessKey", "AWSSecretKey"];

/// One key found in the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    /// Lower-cased, slash-joined key relative to the project prefix
    pub key: String,
    /// Empty unless values were requested
    pub value: String,
}

/// Collect template keys from a parsed JSON document.
///
/// With `include_values`, non-empty scalars are kept too, with their value.
/// Arrays and nulls are skipped.
pub fn extract_entries(document: &Value, include_values: bool) -> Result<Vec<TemplateEntry>> {
    let object = document.as_object().ok_or_else(|| {
        Error::InvalidInput("config template must be a JSON object".to_string())
    })?;
    let mut entries = Vec::new();
    collect(object, "", include_values, &mut entries);
    Ok(entries)
}

fn collect(
    object: &serde_json::Map<String, Value>,
    parent: &str,
    include_values: bool,
    entries: &mut Vec<TemplateEntry>,
) {
    for (key, value) in object {
        let path = if parent.is_empty() {
            key.clone()
        } else {
            format!("{}/{}", parent, key)
        };

        let scalar = match value {
            Value::Object(child) => {
                collect(child, &path, include_values, entries);
                continue;
            }
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(_) | Value::Null => continue,
        };

        if IGNORED_KEYS.contains(&key.as_str()) {
            continue;
        }
        if scalar.is_empty() || include_values {
            entries.push(TemplateEntry {
                key: path.to_lowercase(),
                value: scalar,
            });
        }
    }
}

/// Read and parse a JSON config file.
pub fn load_entries(path: &Path, include_values: bool) -> Result<Vec<TemplateEntry>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::InvalidInput(format!("cannot read {}: {}", path.display(), e))
    })?;
    let document: Value = serde_json::from_str(&content)?;
    extract_entries(&document, include_values)
}

/// Turn entries into `String` parameters under the project prefix.
pub fn template_rows(project: &ProjectPath, entries: &[TemplateEntry]) -> Vec<Parameter> {
    entries
        .iter()
        .map(|entry| Parameter::string(project.key(&entry.key), entry.value.clone()))
        .collect()
}
