//! Parameter store trait and backend selection.
//!
//! This module provides the capability interface every store implements:
//! - `MemoryStore` - In-process store (tests, dry runs)
//! - `FileStore` - Local JSON file, handy for offline work
//! - `SsmStore` - Remote SSM-compatible parameter store

use crate::context::CallContext;
use crate::models::Parameter;
use crate::storage::StoreResult;

/// One page request of a recursive prefix listing.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    /// Name prefix to list recursively
    pub prefix: &'a str,
    /// Maximum number of parameters in the page
    pub page_size: usize,
    /// Continuation token returned by the previous page
    pub next_token: Option<&'a str>,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub parameters: Vec<Parameter>,
    /// Present while more pages remain
    pub next_token: Option<String>,
}

/// Trait for stores that hold hierarchical parameters.
///
/// Every call receives the caller's `CallContext` and must honour its
/// cancellation flag and deadline before doing any work.
pub trait ParameterStore: Send + Sync {
    /// Point lookup by exact name.
    fn get(&self, ctx: &CallContext, name: &str) -> StoreResult<Parameter>;

    /// Upsert a parameter. Fails with `AlreadyExists` when `overwrite` is
    /// false and the name is taken.
    fn put(&mut self, ctx: &CallContext, parameter: &Parameter, overwrite: bool)
    -> StoreResult<()>;

    /// Delete a parameter by name.
    fn delete(&mut self, ctx: &CallContext, name: &str) -> StoreResult<()>;

    /// Fetch one page of a recursive listing under a prefix.
    fn list_page(&self, ctx: &CallContext, request: &PageRequest<'_>) -> StoreResult<Page>;

    /// Get the store location description (for display purposes).
    fn location(&self) -> String;

    /// Get the backend type name.
    fn backend_type(&self) -> &'static str;
}

/// Available store backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    /// Remote SSM-compatible parameter store (default)
    #[default]
    Ssm,
    /// Local JSON file
    File,
    /// In-process, discarded on exit
    Memory,
}

impl BackendType {
    /// Parse a backend type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ssm" | "aws" | "remote" => Some(Self::Ssm),
            "file" | "local" => Some(Self::File),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ssm => "ssm",
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_parse_aliases() {
        assert_eq!(BackendType::parse("SSM"), Some(BackendType::Ssm));
        assert_eq!(BackendType::parse("aws"), Some(BackendType::Ssm));
        assert_eq!(BackendType::parse("local"), Some(BackendType::File));
        assert_eq!(BackendType::parse("mem"), Some(BackendType::Memory));
        assert_eq!(BackendType::parse("redis"), None);
    }

    #[test]
    fn test_backend_type_display_round_trips() {
        for backend in [BackendType::Ssm, BackendType::File, BackendType::Memory] {
            assert_eq!(BackendType::parse(&backend.to_string()), Some(backend));
        }
    }
}
