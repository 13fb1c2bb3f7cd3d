//! Command implementations for the pargolo CLI.
//!
//! Each command returns a result struct that renders as JSON or as
//! human-readable text:
//! - `search_by_path` / `search_by_value` - query the store
//! - `export` - snapshot one project plus the shared parameters it uses
//! - `validate` - classify a desired state without writing
//! - `upload` - write a desired state
//! - `initialize` - build a desired-state template from a JSON config
//! - `delete` - remove a parameter
//! - `config_show` - print the resolved settings

use crate::apply::{self, ApplyReport, ApplyStatus};
use crate::config::{Resolved, ResolvedConfig};
use crate::context::CallContext;
use crate::engine::{Reconciler, VerdictSummary};
use crate::index::ValueIndex;
use crate::loader;
use crate::models::paths::ProjectPath;
use crate::models::{DesiredState, Parameter, Verdict, VerdictKind};
use crate::resolve;
use crate::storage::{ListOptions, ParameterStore, list_by_prefix};
use crate::template;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json_of<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error":"{}"}}"#, e))
}

/// Aligned `type name value` table.
fn parameter_table(parameters: &[Parameter]) -> String {
    let type_width = parameters
        .iter()
        .map(|p| p.param_type.len())
        .max()
        .unwrap_or(0);
    let name_width = parameters.iter().map(|p| p.name.len()).max().unwrap_or(0);

    parameters
        .iter()
        .map(|p| {
            format!(
                "{:<tw$} {:<nw$} {}",
                p.param_type,
                p.name,
                p.value,
                tw = type_width,
                nw = name_width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ==================== Search ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Path,
    Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub mode: SearchMode,
    pub query: String,
    pub count: usize,
    pub parameters: Vec<Parameter>,
    /// References that could not be resolved and were left as-is
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
}

impl SearchResult {
    fn new(mode: SearchMode, query: &str, parameters: Vec<Parameter>) -> Self {
        Self {
            mode,
            query: query.to_string(),
            count: parameters.len(),
            parameters,
            unresolved: Vec::new(),
            output_file: None,
        }
    }

    fn write_to(mut self, output: Option<&Path>) -> Result<Self> {
        if let Some(path) = output {
            loader::write_parameters_csv_file(path, &self.parameters)?;
            self.output_file = Some(path.to_path_buf());
        }
        Ok(self)
    }
}

impl CommandResult for SearchResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if let Some(path) = &self.output_file {
            lines.push(format!(
                "Wrote {} parameter(s) to {}",
                self.count,
                path.display()
            ));
        } else if self.parameters.is_empty() {
            lines.push(match self.mode {
                SearchMode::Path => format!("No parameters under {}", self.query),
                SearchMode::Value => format!("No parameters with value {}", self.query),
            });
        } else {
            lines.push(parameter_table(&self.parameters));
        }
        for reference in &self.unresolved {
            lines.push(format!("warning: unresolved reference {}", reference));
        }
        lines.join("\n")
    }
}

/// List everything under `path`.
///
/// With `recursive`, reference values are replaced by the shared value they
/// point to. A reference whose target is missing is kept and reported.
pub fn search_by_path<S: ParameterStore + ?Sized>(
    store: &S,
    ctx: &CallContext,
    path: &str,
    recursive: bool,
    options: &ListOptions,
    output: Option<&Path>,
) -> Result<SearchResult> {
    let mut parameters = list_by_prefix(store, ctx, path, options)?.into_parameters();
    let mut unresolved = Vec::new();

    if recursive {
        for parameter in &mut parameters {
            if !resolve::is_reference(&parameter.value) {
                continue;
            }
            match resolve::dereference(store, ctx, &parameter.value) {
                Ok(value) => parameter.value = value,
                Err(e) if e.is_not_found() => {
                    tracing::warn!(name = %parameter.name, reference = %parameter.value, "Unresolved reference");
                    unresolved.push(parameter.value.clone());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    tracing::info!(path, count = parameters.len(), recursive, "Searched by path");
    let mut result = SearchResult::new(SearchMode::Path, path, parameters);
    result.unresolved = unresolved;
    result.write_to(output)
}

/// Find every parameter holding exactly `value`, optionally restricted to
/// names starting with `filter`.
pub fn search_by_value<S: ParameterStore + ?Sized>(
    store: &S,
    ctx: &CallContext,
    value: &str,
    filter: Option<&str>,
    options: &ListOptions,
    output: Option<&Path>,
) -> Result<SearchResult> {
    let mut index = ValueIndex::new(*options);
    let parameters = match index.find_by_value(store, ctx, value) {
        Ok(found) => found,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    let parameters: Vec<Parameter> = parameters
        .into_iter()
        .filter(|p| filter.is_none_or(|prefix| p.name.starts_with(prefix)))
        .collect();

    tracing::info!(count = parameters.len(), "Searched by value");
    SearchResult::new(SearchMode::Value, value, parameters).write_to(output)
}

// ==================== Export ====================

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub project_prefix: String,
    pub file: PathBuf,
    pub project_parameters: usize,
    pub common_parameters: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
}

impl CommandResult for ExportResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "Exported {} project and {} shared parameter(s) from {} to {}",
            self.project_parameters,
            self.common_parameters,
            self.project_prefix,
            self.file.display()
        );
        for reference in &self.unresolved {
            out.push_str(&format!("\nwarning: unresolved reference {}", reference));
        }
        out
    }
}

/// `export-<project>-<env>-<UTC timestamp>.csv`
pub fn export_file_name(project: &ProjectPath, at: DateTime<Utc>) -> String {
    format!(
        "export-{}-{}-{}.csv",
        project.project,
        project.env,
        at.format("%Y%m%d%H%M%S")
    )
}

/// Write the project's parameters followed by every shared parameter they
/// reference. Each shared parameter is written once.
pub fn export<S: ParameterStore + ?Sized>(
    store: &S,
    ctx: &CallContext,
    project: &ProjectPath,
    options: &ListOptions,
    output_dir: &Path,
    at: DateTime<Utc>,
) -> Result<ExportResult> {
    let prefix = project.prefix();
    let snapshot = list_by_prefix(store, ctx, &prefix, options)?;

    let references: BTreeSet<&str> = snapshot
        .iter()
        .map(|p| p.value.as_str())
        .filter(|v| resolve::is_reference(v))
        .filter(|v| !snapshot.contains(v))
        .collect();

    let mut shared = Vec::new();
    let mut unresolved = Vec::new();
    for reference in references {
        match store.get(ctx, reference) {
            Ok(parameter) => shared.push(parameter),
            Err(e) if e.is_not_found() => {
                tracing::warn!(reference, "Referenced shared parameter not found");
                unresolved.push(reference.to_string());
            }
            Err(e) => return Err(e.into()),
        }
    }

    let file = output_dir.join(export_file_name(project, at));
    loader::write_parameters_csv_file(&file, snapshot.iter().chain(shared.iter()))?;

    tracing::info!(
        prefix = %prefix,
        project = snapshot.len(),
        shared = shared.len(),
        file = %file.display(),
        "Exported project"
    );
    Ok(ExportResult {
        project_prefix: prefix,
        file,
        project_parameters: snapshot.len(),
        common_parameters: shared.len(),
        unresolved,
    })
}

// ==================== Validate ====================

#[derive(Debug, Clone, Serialize)]
pub struct ValidateResult {
    pub env: String,
    pub verdicts: Vec<Verdict>,
    pub summary: VerdictSummary,
    pub highest: Option<VerdictKind>,
}

impl ValidateResult {
    pub fn has_destructive(&self) -> bool {
        self.summary.destructive > 0
    }
}

impl CommandResult for ValidateResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut lines: Vec<String> = self.verdicts.iter().map(Verdict::to_audit_line).collect();
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!(
            "{} parameter(s): {} create, {} maintain, {} duplicate, {} overwrite, {} destructive",
            self.summary.total(),
            self.summary.create,
            self.summary.maintain,
            self.summary.duplicate,
            self.summary.overwrite,
            self.summary.destructive
        ));
        lines.join("\n")
    }
}

/// Classify `desired` against the store for environment `env`.
pub fn validate<S: ParameterStore + ?Sized>(
    store: &S,
    ctx: &CallContext,
    desired: &DesiredState,
    env: &str,
    options: &ListOptions,
) -> Result<ValidateResult> {
    let verdicts = Reconciler::with_options(store, ctx, env, *options).classify_all(desired)?;
    let summary = VerdictSummary::from_verdicts(&verdicts);
    tracing::info!(env, total = summary.total(), destructive = summary.destructive, "Validated desired state");
    Ok(ValidateResult {
        env: env.to_string(),
        highest: summary.highest(),
        summary,
        verdicts,
    })
}

// ==================== Upload ====================

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub overwrite: bool,
    /// Classify against this environment first and refuse destructive changes
    pub env: Option<String>,
    /// Upload even when the classification finds destructive changes
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub written: usize,
    pub failed: usize,
    #[serde(flatten)]
    pub report: ApplyReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdicts: Option<Vec<Verdict>>,
}

impl CommandResult for UploadResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for outcome in &self.report.outcomes {
            match outcome.status {
                ApplyStatus::Written => lines.push(format!("written  {}", outcome.name)),
                ApplyStatus::Failed => lines.push(format!(
                    "FAILED   {}: {}",
                    outcome.name,
                    outcome.error.as_deref().unwrap_or("unknown error")
                )),
            }
        }
        lines.push(format!(
            "Uploaded {} parameter(s), {} failed",
            self.written, self.failed
        ));
        lines.join("\n")
    }
}

/// Write `desired` to the store, one record at a time.
pub fn upload<S: ParameterStore + ?Sized>(
    store: &mut S,
    ctx: &CallContext,
    desired: &DesiredState,
    options: &UploadOptions,
    list_options: &ListOptions,
) -> Result<UploadResult> {
    let verdicts = match &options.env {
        Some(env) => {
            let verdicts = Reconciler::with_options(&*store, ctx, env, *list_options)
                .classify_all(desired)?;
            if options.force {
                if verdicts.iter().any(|v| v.kind == VerdictKind::Destructive) {
                    tracing::warn!("Uploading destructive changes to shared parameters (forced)");
                }
            } else {
                apply::ensure_not_destructive(&verdicts)?;
            }
            Some(verdicts)
        }
        None => None,
    };

    let report = apply::upload(store, ctx, desired, options.overwrite)?;
    Ok(UploadResult {
        written: report.written(),
        failed: report.failed(),
        report,
        verdicts,
    })
}

// ==================== Initialize ====================

#[derive(Debug, Clone, Serialize)]
pub struct InitializeResult {
    pub file: PathBuf,
    pub count: usize,
    pub keys: Vec<String>,
}

impl CommandResult for InitializeResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Wrote {} parameter(s) to {}",
            self.count,
            self.file.display()
        )
    }
}

/// Build a desired-state CSV from the keys of a JSON config file.
pub fn initialize(
    template_path: &Path,
    project: &ProjectPath,
    include_values: bool,
    output: &Path,
) -> Result<InitializeResult> {
    let entries = template::load_entries(template_path, include_values)?;
    let rows = template::template_rows(project, &entries);
    loader::write_parameters_csv_file(output, &rows)?;

    tracing::info!(count = rows.len(), file = %output.display(), "Initialized desired state");
    Ok(InitializeResult {
        file: output.to_path_buf(),
        count: rows.len(),
        keys: rows.into_iter().map(|p| p.name).collect(),
    })
}

// ==================== Delete ====================

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub name: String,
    pub deleted: bool,
}

impl CommandResult for DeleteResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted {}", self.name)
    }
}

pub fn delete<S: ParameterStore + ?Sized>(
    store: &mut S,
    ctx: &CallContext,
    name: &str,
) -> Result<DeleteResult> {
    store.delete(ctx, name)?;
    tracing::info!(name, "Deleted parameter");
    Ok(DeleteResult {
        name: name.to_string(),
        deleted: true,
    })
}

// ==================== Config ====================

#[derive(Debug, Clone, Serialize)]
pub struct SettingEntry {
    pub key: &'static str,
    pub value: Option<String>,
    pub source: Option<String>,
}

impl SettingEntry {
    fn resolved<T: ToString>(key: &'static str, resolved: &Resolved<T>) -> Self {
        Self {
            key,
            value: Some(resolved.value.to_string()),
            source: Some(resolved.source.to_string()),
        }
    }

    fn optional<T: ToString>(key: &'static str, resolved: Option<&Resolved<T>>) -> Self {
        match resolved {
            Some(r) => Self::resolved(key, r),
            None => Self {
                key,
                value: None,
                source: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigShowResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub settings: Vec<SettingEntry>,
}

impl CommandResult for ConfigShowResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let width = self.settings.iter().map(|s| s.key.len()).max().unwrap_or(0);
        let mut lines = Vec::new();
        if let Some(path) = &self.config_file {
            lines.push(format!("config file: {}", path.display()));
        }
        for setting in &self.settings {
            match (&setting.value, &setting.source) {
                (Some(value), Some(source)) => lines.push(format!(
                    "{:<w$}  {}  ({})",
                    setting.key,
                    value,
                    source,
                    w = width
                )),
                _ => lines.push(format!("{:<w$}  (unset)", setting.key, w = width)),
            }
        }
        lines.join("\n")
    }
}

pub fn config_show(config: &ResolvedConfig) -> ConfigShowResult {
    let store_file = config.store_file.as_ref().map(|r| {
        Resolved::new(r.value.display().to_string(), r.source.clone())
    });
    ConfigShowResult {
        config_file: config.config_path.clone(),
        settings: vec![
            SettingEntry::resolved("backend", &config.backend),
            SettingEntry::resolved("region", &config.region),
            SettingEntry::optional("endpoint", config.endpoint.as_ref()),
            SettingEntry::optional("store-file", store_file.as_ref()),
            SettingEntry::resolved("page-size", &config.page_size),
            SettingEntry::resolved("page-delay-ms", &config.page_delay_ms),
            SettingEntry::resolved("max-retries", &config.max_retries),
            SettingEntry::resolved("retry-base-delay-ms", &config.retry_base_delay_ms),
            SettingEntry::resolved("timeout-secs", &config.timeout_secs),
            SettingEntry::resolved("output-format", &config.output_format),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::storage::{MemoryStore, RetryPolicy, StoreError};
    use crate::test_utils::{MockSsm, error_body, parameter_body};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn ctx() -> CallContext {
        CallContext::new()
    }

    fn seeded() -> MemoryStore {
        MemoryStore::with_parameters([
            Parameter::string("/dev/common/db", "db.internal"),
            Parameter::string("/dev/common/cache", "redis.internal"),
            Parameter::string("/dev/app/x/db", "/dev/common/db"),
            Parameter::string("/dev/app/x/name", "x"),
            Parameter::string("/dev/app/x/broken", "/dev/common/missing"),
            Parameter::string("/dev/app/y/db", "/dev/common/db"),
        ])
    }

    #[test]
    fn test_search_by_path_plain() {
        let store = seeded();
        let result =
            search_by_path(&store, &ctx(), "/dev/app/x", false, &ListOptions::default(), None)
                .unwrap();
        assert_eq!(result.count, 3);
        assert_eq!(store.call_counts().gets, 0);
        let db = result.parameters.iter().find(|p| p.name == "/dev/app/x/db").unwrap();
        assert_eq!(db.value, "/dev/common/db");
    }

    #[test]
    fn test_search_by_path_recursive_dereferences() {
        let store = seeded();
        let result =
            search_by_path(&store, &ctx(), "/dev/app/x", true, &ListOptions::default(), None)
                .unwrap();
        let db = result.parameters.iter().find(|p| p.name == "/dev/app/x/db").unwrap();
        assert_eq!(db.value, "db.internal");
        let broken = result
            .parameters
            .iter()
            .find(|p| p.name == "/dev/app/x/broken")
            .unwrap();
        assert_eq!(broken.value, "/dev/common/missing");
        assert_eq!(result.unresolved, vec!["/dev/common/missing"]);
        assert!(result.to_human().contains("unresolved reference /dev/common/missing"));
    }

    #[test]
    fn test_search_by_path_writes_csv() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("found.csv");
        let store = seeded();
        let result = search_by_path(
            &store,
            &ctx(),
            "/dev/common",
            false,
            &ListOptions::default(),
            Some(&out),
        )
        .unwrap();
        assert_eq!(result.output_file.as_deref(), Some(out.as_path()));
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains("/dev/common/cache,String,redis.internal"));
        assert!(written.contains("/dev/common/db,String,db.internal"));
    }

    #[test]
    fn test_search_by_value_with_filter() {
        let store = seeded();
        let all = search_by_value(
            &store,
            &ctx(),
            "/dev/common/db",
            None,
            &ListOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(all.count, 2);

        let filtered = search_by_value(
            &store,
            &ctx(),
            "/dev/common/db",
            Some("/dev/app/y"),
            &ListOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(filtered.count, 1);
        assert_eq!(filtered.parameters[0].name, "/dev/app/y/db");
    }

    #[test]
    fn test_search_by_value_no_match_is_empty() {
        let store = seeded();
        let result =
            search_by_value(&store, &ctx(), "nothing", None, &ListOptions::default(), None)
                .unwrap();
        assert_eq!(result.count, 0);
        assert_eq!(result.to_human(), "No parameters with value nothing");
    }

    #[test]
    fn test_export_adds_referenced_shared_once() {
        let dir = TempDir::new().unwrap();
        let mut store = seeded();
        store.insert(Parameter::string("/dev/app/x/db2", "/dev/common/db"));
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let project = ProjectPath::new("dev", "app", "x");

        let result = export(&store, &ctx(), &project, &ListOptions::default(), dir.path(), at)
            .unwrap();

        assert_eq!(
            result.file.file_name().unwrap().to_str().unwrap(),
            "export-x-dev-20240309140507.csv"
        );
        assert_eq!(result.project_parameters, 4);
        assert_eq!(result.common_parameters, 1);
        assert_eq!(result.unresolved, vec!["/dev/common/missing"]);

        let content = std::fs::read_to_string(&result.file).unwrap();
        let state = loader::load_desired_state(content.as_bytes()).unwrap();
        assert_eq!(state.len(), 5);
        assert_eq!(state.as_slice()[4], Parameter::string("/dev/common/db", "db.internal"));
    }

    /// A remote store whose listing holds a URL that merely contains
    /// `/common/`; looking that URL up as a name is rejected by the service.
    fn remote_with_url_value() -> MockSsm {
        MockSsm::start(|action, input| match action {
            "GetParametersByPath" => (
                200,
                serde_json::json!({
                    "Parameters": [
                        {"Name": "/dev/app/x/db", "Type": "String", "Value": "/dev/common/db"},
                        {"Name": "/dev/app/x/logo", "Type": "String", "Value": "https://cdn.example.com/common/logo.png"}
                    ]
                })
                .to_string(),
            ),
            "GetParameter" if input["Name"] == "/dev/common/db" => {
                (200, parameter_body("/dev/common/db", "db.internal"))
            }
            _ => (400, error_body("ValidationException", "Parameter name is invalid")),
        })
    }

    #[test]
    fn test_search_by_path_recursive_keeps_url_values_on_remote_store() {
        let server = remote_with_url_value();
        let store = server.store(RetryPolicy::default());

        let result =
            search_by_path(&store, &ctx(), "/dev/app/x", true, &ListOptions::default(), None)
                .unwrap();

        assert_eq!(result.parameters[0].value, "db.internal");
        assert_eq!(
            result.parameters[1].value,
            "https://cdn.example.com/common/logo.png"
        );
        assert_eq!(
            result.unresolved,
            vec!["https://cdn.example.com/common/logo.png"]
        );
    }

    #[test]
    fn test_export_keeps_url_values_on_remote_store() {
        let dir = TempDir::new().unwrap();
        let server = remote_with_url_value();
        let store = server.store(RetryPolicy::default());
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let project = ProjectPath::new("dev", "app", "x");

        let result = export(&store, &ctx(), &project, &ListOptions::default(), dir.path(), at)
            .unwrap();

        assert_eq!(result.project_parameters, 2);
        assert_eq!(result.common_parameters, 1);
        assert_eq!(
            result.unresolved,
            vec!["https://cdn.example.com/common/logo.png"]
        );
        let content = std::fs::read_to_string(&result.file).unwrap();
        assert!(content.contains("/dev/app/x/logo,String,https://cdn.example.com/common/logo.png"));
        assert!(content.contains("/dev/common/db,String,db.internal"));
    }

    #[test]
    fn test_validate_reports_summary() {
        let store = seeded();
        let desired: DesiredState = vec![
            Parameter::string("/dev/app/x/name", "x"),
            Parameter::string("/dev/app/x/new", "1"),
            Parameter::string("/dev/common/db", "other"),
            Parameter::string("/dev/common/db2", "db.internal"),
        ]
        .into_iter()
        .collect();

        let result = validate(&store, &ctx(), &desired, "dev", &ListOptions::default()).unwrap();
        assert_eq!(result.summary.maintain, 1);
        assert_eq!(result.summary.create, 1);
        assert_eq!(result.summary.destructive, 1);
        assert_eq!(result.summary.duplicate, 1);
        assert_eq!(result.highest, Some(VerdictKind::Destructive));
        assert!(result.has_destructive());

        let human = result.to_human();
        assert!(human.contains("PRESENT -> MAINTAIN    - /dev/app/x/name WITH VALUE x"));
        assert!(human.contains("- /dev/common/db\n"));
        assert!(human.ends_with("4 parameter(s): 1 create, 1 maintain, 1 duplicate, 0 overwrite, 1 destructive"));
    }

    #[test]
    fn test_validate_json_shape() {
        let store = MemoryStore::new();
        let desired: DesiredState = vec![Parameter::string("/dev/app/x/k", "v")]
            .into_iter()
            .collect();
        let result = validate(&store, &ctx(), &desired, "dev", &ListOptions::default()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&result.to_json()).unwrap();
        assert_eq!(json["verdicts"][0]["kind"], "CREATE");
        assert_eq!(json["summary"]["create"], 1);
        assert_eq!(json["highest"], "CREATE");
    }

    #[test]
    fn test_upload_guard_refuses_destructive() {
        let mut store = seeded();
        let desired: DesiredState = vec![
            Parameter::string("/dev/app/x/new", "1"),
            Parameter::string("/dev/common/db", "changed"),
        ]
        .into_iter()
        .collect();
        let options = UploadOptions {
            overwrite: true,
            env: Some("dev".to_string()),
            force: false,
        };

        let err = upload(&mut store, &ctx(), &desired, &options, &ListOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::DestructiveChange(ref names) if names == &vec!["/dev/common/db".to_string()]));
        assert_eq!(store.call_counts().puts, 0);
    }

    #[test]
    fn test_upload_guard_forced() {
        let mut store = seeded();
        let desired: DesiredState = vec![Parameter::string("/dev/common/db", "changed")]
            .into_iter()
            .collect();
        let options = UploadOptions {
            overwrite: true,
            env: Some("dev".to_string()),
            force: true,
        };

        let result =
            upload(&mut store, &ctx(), &desired, &options, &ListOptions::default()).unwrap();
        assert_eq!(result.written, 1);
        assert_eq!(result.verdicts.unwrap()[0].kind, VerdictKind::Destructive);
        assert_eq!(store.get(&ctx(), "/dev/common/db").unwrap().value, "changed");
    }

    #[test]
    fn test_upload_without_overwrite_reports_collisions() {
        let mut store = seeded();
        let desired: DesiredState = vec![
            Parameter::string("/dev/app/x/name", "renamed"),
            Parameter::string("/dev/app/x/fresh", "1"),
        ]
        .into_iter()
        .collect();

        let result = upload(
            &mut store,
            &ctx(),
            &desired,
            &UploadOptions::default(),
            &ListOptions::default(),
        )
        .unwrap();
        assert_eq!(result.written, 1);
        assert_eq!(result.failed, 1);
        assert!(result.to_human().contains("FAILED   /dev/app/x/name"));
    }

    #[test]
    fn test_initialize_writes_template() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("appsettings.json");
        std::fs::write(
            &input,
            r#"{"Environment": "", "Sentry": {"SentryDSN": "", "ClientID": "abc"}, "ApiUrl": ""}"#,
        )
        .unwrap();
        let output = dir.path().join("data.csv");
        let project = ProjectPath::new("dev", "billing", "api");

        let result = initialize(&input, &project, false, &output).unwrap();
        assert_eq!(result.count, 2);
        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("/dev/billing/api/apiurl,String,\n"));
        assert!(content.contains("/dev/billing/api/sentry/sentrydsn,String,\n"));
        assert!(!content.contains("environment"));
    }

    #[test]
    fn test_delete_missing_is_error() {
        let mut store = seeded();
        delete(&mut store, &ctx(), "/dev/app/x/name").unwrap();
        let err = delete(&mut store, &ctx(), "/dev/app/x/name").unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::NotFound(_))));
    }

    #[test]
    fn test_parameter_table_alignment() {
        let table = parameter_table(&[
            Parameter::string("/a", "1"),
            Parameter::new("/longer/name", "SecureString", "2"),
        ]);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines[0], "String       /a           1");
        assert_eq!(lines[1], "SecureString /longer/name 2");
    }

    #[test]
    fn test_config_show_lists_sources() {
        let config = ResolvedConfig::default();
        let result = config_show(&config);
        let human = result.to_human();
        assert!(human.contains("backend"));
        assert!(human.contains("ssm  (default)"));
        assert!(human.contains("endpoint"));
        assert!(human.contains("(unset)"));
    }
}
