//! Store path layout.
//!
//! Project parameters live under `/<env>/<domain>/<project>`; parameters shared
//! between projects of an environment live under `/<env>/common`.

/// Path segment naming the shared namespace of an environment.
pub const COMMON_SEGMENT: &str = "common";

/// Substring that marks a value as a reference to a shared parameter.
pub const REFERENCE_MARKER: &str = "/common/";

/// Coordinates of one project in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPath {
    pub env: String,
    pub domain: String,
    pub project: String,
}

impl ProjectPath {
    pub fn new(
        env: impl Into<String>,
        domain: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            env: env.into(),
            domain: domain.into(),
            project: project.into(),
        }
    }

    /// `(project_prefix, common_prefix)` for this project.
    pub fn resolve(&self) -> (String, String) {
        (self.prefix(), self.common_prefix())
    }

    /// `/<env>/<domain>/<project>`
    pub fn prefix(&self) -> String {
        format!("/{}/{}/{}", self.env, self.domain, self.project)
    }

    /// `/<env>/common`
    pub fn common_prefix(&self) -> String {
        common_prefix(&self.env)
    }

    /// Full parameter name for a key relative to the project prefix.
    pub fn key(&self, key: &str) -> String {
        format!("{}/{}", self.prefix(), key.trim_start_matches('/'))
    }
}

/// Compute `(project_prefix, common_prefix)` without building a `ProjectPath`.
///
/// Segments are not validated; callers pass segments without embedded slashes.
pub fn resolve(env: &str, domain: &str, project: &str) -> (String, String) {
    ProjectPath::new(env, domain, project).resolve()
}

/// Shared-namespace prefix of an environment.
pub fn common_prefix(env: &str) -> String {
    format!("/{}/{}", env, COMMON_SEGMENT)
}

/// Whether `name` sits at or below `prefix`, respecting segment boundaries.
///
/// `/dev/common/db` is under `/dev/common`; `/dev/commons/db` is not.
pub fn is_under(name: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return name.starts_with('/');
    }
    match name.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// The shared namespace of one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonNamespace {
    prefix: String,
}

impl CommonNamespace {
    pub fn new(env: &str) -> Self {
        Self {
            prefix: common_prefix(env),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether a parameter name belongs to the shared namespace.
    pub fn contains(&self, name: &str) -> bool {
        is_under(name, &self.prefix)
    }
}
