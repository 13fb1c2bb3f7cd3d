//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`PARGOLO_*`, `AWS_REGION`)
//! 3. config.kdl (`$PARGOLO_CONFIG` or `~/.config/pargolo/config.kdl`)
//! 4. Built-in defaults

use crate::config::{OutputFormat, PargoloConfig};
use crate::storage::{BackendType, ListOptions, RetryPolicy};
use crate::{Error, Result};
use kdl::KdlDocument;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "PARGOLO_CONFIG";
pub const BACKEND_ENV: &str = "PARGOLO_BACKEND";
pub const REGION_ENV: &str = "PARGOLO_REGION";
pub const AWS_REGION_ENV: &str = "AWS_REGION";
pub const ENDPOINT_ENV: &str = "PARGOLO_ENDPOINT";
pub const STORE_FILE_ENV: &str = "PARGOLO_STORE_FILE";

pub const DEFAULT_REGION: &str = "eu-west-1";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    ConfigFile,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub backend: Resolved<BackendType>,
    pub region: Resolved<String>,
    pub endpoint: Option<Resolved<String>>,
    pub store_file: Option<Resolved<PathBuf>>,
    pub page_size: Resolved<u32>,
    pub page_delay_ms: Resolved<u64>,
    pub max_retries: Resolved<u32>,
    pub retry_base_delay_ms: Resolved<u64>,
    pub timeout_secs: Resolved<u64>,
    pub output_format: Resolved<OutputFormat>,
    /// config.kdl that was consulted, if one was found
    pub config_path: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            backend: Resolved::new(BackendType::default(), ValueSource::Default),
            region: Resolved::new(DEFAULT_REGION.to_string(), ValueSource::Default),
            endpoint: None,
            store_file: None,
            page_size: Resolved::new(DEFAULT_PAGE_SIZE, ValueSource::Default),
            page_delay_ms: Resolved::new(0, ValueSource::Default),
            max_retries: Resolved::new(retry.max_retries, ValueSource::Default),
            retry_base_delay_ms: Resolved::new(
                retry.base_delay.as_millis() as u64,
                ValueSource::Default,
            ),
            timeout_secs: Resolved::new(DEFAULT_TIMEOUT_SECS, ValueSource::Default),
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            config_path: None,
        }
    }
}

impl ResolvedConfig {
    pub fn backend(&self) -> BackendType {
        self.backend.value
    }

    pub fn region(&self) -> &str {
        &self.region.value
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|r| r.value.as_str())
    }

    pub fn store_file(&self) -> Option<&Path> {
        self.store_file.as_ref().map(|r| r.value.as_path())
    }

    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format.value
    }

    /// Per-request timeout for the remote store.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.value)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries.value,
            base_delay: Duration::from_millis(self.retry_base_delay_ms.value),
        }
    }

    /// Paging used by prefix listings.
    pub fn list_options(&self) -> ListOptions {
        ListOptions::new(self.page_size.value as usize)
            .with_page_delay(Duration::from_millis(self.page_delay_ms.value))
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend: Option<BackendType>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub store_file: Option<PathBuf>,
    pub page_size: Option<u32>,
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_store_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_file = Some(path.into());
        self
    }

    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Default location of config.kdl, honouring `PARGOLO_CONFIG`.
pub fn config_path<F: Fn(&str) -> Option<String>>(env: F) -> Option<PathBuf> {
    match env(CONFIG_PATH_ENV).filter(|v| !v.is_empty()) {
        Some(path) => Some(PathBuf::from(path)),
        None => dirs::config_dir().map(|d| d.join("pargolo").join("config.kdl")),
    }
}

/// Load config.kdl. A missing file is an empty config.
pub fn load_config_file(path: &Path) -> Result<PargoloConfig> {
    if !path.exists() {
        return Ok(PargoloConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let doc: KdlDocument = content
        .parse()
        .map_err(|e| Error::Config(format!("Failed to parse KDL in {}: {}", path.display(), e)))?;

    let config = PargoloConfig::from_kdl(&doc);
    config
        .validate()
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), "Loaded config file");
    Ok(config)
}

fn from_env<F: Fn(&str) -> Option<String>>(env: &F, name: &str) -> Option<(String, ValueSource)> {
    env(name)
        .filter(|v| !v.trim().is_empty())
        .map(|v| (v, ValueSource::EnvVar(name.to_string())))
}

/// Pick the first layer that has a value.
fn layered<T>(cli: Option<T>, env: Option<(T, ValueSource)>, file: Option<T>) -> Option<Resolved<T>> {
    if let Some(v) = cli {
        Some(Resolved::new(v, ValueSource::CliFlag))
    } else if let Some((v, source)) = env {
        Some(Resolved::new(v, source))
    } else {
        file.map(|v| Resolved::new(v, ValueSource::ConfigFile))
    }
}

/// Resolve configuration with full precedence chain.
///
/// `env` looks up environment variables; pass `|k| std::env::var(k).ok()`
/// in production.
pub fn resolve_config<F: Fn(&str) -> Option<String>>(
    file: &PargoloConfig,
    overrides: &ConfigOverrides,
    env: F,
) -> Result<ResolvedConfig> {
    file.validate().map_err(Error::Config)?;
    if let Some(size) = overrides.page_size {
        PargoloConfig {
            page_size: Some(size),
            ..Default::default()
        }
        .validate()
        .map_err(Error::Config)?;
    }

    let mut result = ResolvedConfig::default();

    let env_backend = match from_env(&env, BACKEND_ENV) {
        Some((raw, source)) => Some((
            BackendType::parse(&raw)
                .ok_or_else(|| Error::Config(format!("{}: unknown backend '{}'", BACKEND_ENV, raw)))?,
            source,
        )),
        None => None,
    };
    if let Some(r) = layered(overrides.backend, env_backend, file.backend) {
        result.backend = r;
    }

    let env_region = from_env(&env, REGION_ENV).or_else(|| from_env(&env, AWS_REGION_ENV));
    if let Some(r) = layered(overrides.region.clone(), env_region, file.region.clone()) {
        result.region = r;
    }

    result.endpoint = layered(
        overrides.endpoint.clone(),
        from_env(&env, ENDPOINT_ENV),
        file.endpoint.clone(),
    );

    result.store_file = layered(
        overrides.store_file.clone(),
        from_env(&env, STORE_FILE_ENV).map(|(v, s)| (PathBuf::from(v), s)),
        file.store_file.clone(),
    );

    if let Some(r) = layered(overrides.page_size, None, file.page_size) {
        result.page_size = r;
    }
    if let Some(r) = layered(None, None, file.page_delay_ms) {
        result.page_delay_ms = r;
    }
    if let Some(r) = layered(None, None, file.max_retries) {
        result.max_retries = r;
    }
    if let Some(r) = layered(None, None, file.retry_base_delay_ms) {
        result.retry_base_delay_ms = r;
    }
    if let Some(r) = layered(None, None, file.timeout_secs) {
        result.timeout_secs = r;
    }
    if let Some(r) = layered(
        overrides.output_format.clone(),
        None,
        file.output_format.clone(),
    ) {
        result.output_format = r;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_value_source_display() {
        assert_eq!(ValueSource::EnvVar("X".into()).to_string(), "env:X");
        assert_eq!(ValueSource::ConfigFile.to_string(), "config");
        assert_eq!(ValueSource::CliFlag.to_string(), "cli");
        assert_eq!(ValueSource::Default.to_string(), "default");
    }

    #[test]
    fn test_resolve_defaults() {
        let config =
            resolve_config(&PargoloConfig::default(), &ConfigOverrides::new(), |_| None).unwrap();
        assert_eq!(config.backend(), BackendType::Ssm);
        assert_eq!(config.region(), "eu-west-1");
        assert_eq!(config.region.source, ValueSource::Default);
        assert!(config.endpoint().is_none());
        assert_eq!(config.list_options(), ListOptions::new(10));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.output_format(), &OutputFormat::Json);
    }

    #[test]
    fn test_cli_beats_env_beats_file() {
        let file = PargoloConfig {
            region: Some("file-region".to_string()),
            backend: Some(BackendType::Memory),
            endpoint: Some("http://file:1".to_string()),
            ..Default::default()
        };
        let env = env_of(&[
            ("PARGOLO_REGION", "env-region"),
            ("PARGOLO_BACKEND", "file"),
        ]);
        let overrides = ConfigOverrides::new().with_region("cli-region");

        let config = resolve_config(&file, &overrides, env).unwrap();
        assert_eq!(config.region(), "cli-region");
        assert_eq!(config.region.source, ValueSource::CliFlag);
        assert_eq!(config.backend(), BackendType::File);
        assert_eq!(
            config.backend.source,
            ValueSource::EnvVar("PARGOLO_BACKEND".to_string())
        );
        assert_eq!(config.endpoint(), Some("http://file:1"));
        assert_eq!(config.endpoint.unwrap().source, ValueSource::ConfigFile);
    }

    #[test]
    fn test_aws_region_fallback() {
        let config = resolve_config(
            &PargoloConfig::default(),
            &ConfigOverrides::new(),
            env_of(&[("AWS_REGION", "ap-south-1")]),
        )
        .unwrap();
        assert_eq!(config.region(), "ap-south-1");

        let config = resolve_config(
            &PargoloConfig::default(),
            &ConfigOverrides::new(),
            env_of(&[("AWS_REGION", "ap-south-1"), ("PARGOLO_REGION", "us-east-2")]),
        )
        .unwrap();
        assert_eq!(config.region(), "us-east-2");
    }

    #[test]
    fn test_unknown_backend_in_env_is_error() {
        let result = resolve_config(
            &PargoloConfig::default(),
            &ConfigOverrides::new(),
            env_of(&[("PARGOLO_BACKEND", "redis")]),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_page_size_override_rejected() {
        let result = resolve_config(
            &PargoloConfig::default(),
            &ConfigOverrides::new().with_page_size(0),
            |_| None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_file_tuning_values() {
        let file = PargoloConfig {
            page_size: Some(5),
            page_delay_ms: Some(200),
            max_retries: Some(1),
            retry_base_delay_ms: Some(10),
            timeout_secs: Some(3),
            ..Default::default()
        };
        let config = resolve_config(&file, &ConfigOverrides::new(), |_| None).unwrap();
        assert_eq!(
            config.list_options(),
            ListOptions::new(5).with_page_delay(Duration::from_millis(200))
        );
        assert_eq!(config.retry_policy().max_retries, 1);
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.page_size.source, ValueSource::ConfigFile);
    }

    #[test]
    fn test_store_file_from_env() {
        let config = resolve_config(
            &PargoloConfig::default(),
            &ConfigOverrides::new(),
            env_of(&[("PARGOLO_STORE_FILE", "/tmp/p.json")]),
        )
        .unwrap();
        assert_eq!(config.store_file(), Some(Path::new("/tmp/p.json")));
    }

    #[test]
    fn test_config_path_env_override() {
        let path = config_path(env_of(&[("PARGOLO_CONFIG", "/etc/pargolo.kdl")]));
        assert_eq!(path, Some(PathBuf::from("/etc/pargolo.kdl")));
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.kdl");

        assert_eq!(load_config_file(&path).unwrap(), PargoloConfig::default());

        std::fs::write(&path, "backend \"memory\"\npage-size 3\n").unwrap();
        let config = load_config_file(&path).unwrap();
        assert_eq!(config.backend, Some(BackendType::Memory));
        assert_eq!(config.page_size, Some(3));

        std::fs::write(&path, "page-size 99\n").unwrap();
        assert!(matches!(load_config_file(&path), Err(Error::Config(_))));

        std::fs::write(&path, "backend {{{").unwrap();
        assert!(matches!(load_config_file(&path), Err(Error::Config(_))));
    }
}
