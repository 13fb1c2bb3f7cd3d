//! KDL schema for config.kdl.
//!
//! ```kdl
//! backend "ssm"            // or "file", "memory"
//! region "eu-west-1"
//! endpoint "http://localhost:4566"
//! store-file "/tmp/params.json"
//! page-size 10
//! page-delay-ms 0
//! max-retries 3
//! retry-base-delay-ms 100
//! timeout-secs 30
//! output-format "human"    // or "json"
//! ```

use crate::storage::BackendType;
use kdl::KdlDocument;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Largest page the remote store accepts.
pub const MAX_PAGE_SIZE: u32 = 10;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings read from config.kdl. Every field is optional; unset fields fall
/// through to the environment or built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PargoloConfig {
    pub backend: Option<BackendType>,
    pub region: Option<String>,
    /// Remote endpoint override, e.g. a local emulator
    pub endpoint: Option<String>,
    /// JSON document used by the file backend
    pub store_file: Option<PathBuf>,
    pub page_size: Option<u32>,
    pub page_delay_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub output_format: Option<OutputFormat>,
}

fn string_arg<'d>(doc: &'d KdlDocument, name: &str) -> Option<&'d str> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|e| e.value().as_string())
}

fn integer_arg(doc: &KdlDocument, name: &str) -> Option<i128> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|e| e.value().as_integer())
}

impl PargoloConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(size) = self.page_size {
            if !(1..=MAX_PAGE_SIZE).contains(&size) {
                return Err(format!("page-size must be 1-{}, got {}", MAX_PAGE_SIZE, size));
            }
        }
        if self.timeout_secs == Some(0) {
            return Err("timeout-secs must be greater than 0".to_string());
        }
        if let Some(region) = &self.region {
            if region.trim().is_empty() {
                return Err("region must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes are ignored. Values of the wrong type or out of range
    /// are dropped with a warning.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = string_arg(doc, "backend") {
            config.backend = BackendType::parse(s);
            if config.backend.is_none() {
                tracing::warn!(value = s, "Ignoring unknown backend in config");
            }
        }
        config.region = string_arg(doc, "region").map(str::to_string);
        config.endpoint = string_arg(doc, "endpoint").map(str::to_string);
        config.store_file = string_arg(doc, "store-file").map(PathBuf::from);

        config.page_size = integer_setting(doc, "page-size");
        config.page_delay_ms = integer_setting(doc, "page-delay-ms");
        config.max_retries = integer_setting(doc, "max-retries");
        config.retry_base_delay_ms = integer_setting(doc, "retry-base-delay-ms");
        config.timeout_secs = integer_setting(doc, "timeout-secs");

        if let Some(s) = string_arg(doc, "output-format") {
            config.output_format = OutputFormat::parse(s);
        }

        config
    }
}

fn integer_setting<T: TryFrom<i128>>(doc: &KdlDocument, name: &str) -> Option<T> {
    let raw = integer_arg(doc, name)?;
    match T::try_from(raw) {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(setting = name, value = %raw, "Ignoring out-of-range config value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("HUMAN"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("invalid"), None);
    }

    #[test]
    fn test_config_from_kdl_empty() {
        let doc = KdlDocument::new();
        assert_eq!(PargoloConfig::from_kdl(&doc), PargoloConfig::default());
    }

    #[test]
    fn test_config_from_kdl_full() {
        let kdl = r#"
            backend "file"
            region "us-east-1"
            endpoint "http://localhost:4566"
            store-file "/tmp/params.json"
            page-size 5
            page-delay-ms 250
            max-retries 7
            retry-base-delay-ms 50
            timeout-secs 12
            output-format "human"
        "#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let config = PargoloConfig::from_kdl(&doc);

        assert_eq!(config.backend, Some(BackendType::File));
        assert_eq!(config.region.as_deref(), Some("us-east-1"));
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:4566"));
        assert_eq!(config.store_file, Some(PathBuf::from("/tmp/params.json")));
        assert_eq!(config.page_size, Some(5));
        assert_eq!(config.page_delay_ms, Some(250));
        assert_eq!(config.max_retries, Some(7));
        assert_eq!(config.retry_base_delay_ms, Some(50));
        assert_eq!(config.timeout_secs, Some(12));
        assert_eq!(config.output_format, Some(OutputFormat::Human));
    }

    #[test]
    fn test_config_from_kdl_drops_bad_values() {
        let kdl = r#"
            backend "redis"
            page-size -1
            output-format "yaml"
        "#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let config = PargoloConfig::from_kdl(&doc);
        assert_eq!(config, PargoloConfig::default());
    }

    #[test]
    fn test_config_validate() {
        assert!(PargoloConfig::default().validate().is_ok());

        let config = PargoloConfig {
            page_size: Some(50),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("page-size must be 1-10"));

        let config = PargoloConfig {
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
