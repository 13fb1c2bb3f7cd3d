//! Storage layer for pargolo.
//!
//! This module handles access to the parameter store the desired state is
//! reconciled against.
//!
//! ## Store Backends
//!
//! - **SSM backend** (default): remote SSM-compatible JSON API, signed requests
//! - **File backend**: a local JSON document, one entry per parameter
//! - **Memory backend**: in-process only
//!
//! All backends list recursively under a prefix one page at a time;
//! [`list_by_prefix`] stitches the pages into a [`RemoteSnapshot`].

pub mod backend;
pub mod file;
pub mod memory;
pub mod sigv4;
pub mod ssm;

pub use backend::{BackendType, Page, PageRequest, ParameterStore};
pub use file::FileStore;
pub use memory::{CallCounts, MemoryStore};
pub use ssm::{Credentials, RetryPolicy, SsmConfig, SsmStore};

use crate::config::ResolvedConfig;
use crate::context::CallContext;
use crate::models::RemoteSnapshot;
use crate::{Error, Result};
use std::collections::HashSet;
use std::time::Duration;

/// Default number of parameters requested per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Errors returned by parameter store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No parameter with that name exists
    #[error("Parameter not found: {0}")]
    NotFound(String),

    /// Upsert without overwrite hit an existing name
    #[error("Parameter already exists: {0}")]
    AlreadyExists(String),

    /// The store rejected the request rate
    #[error("Store throttled the request: {0}")]
    Throttled(String),

    /// The store could not be reached or failed internally
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any other rejected request (auth, validation, permissions)
    #[error("Store request failed: {0}")]
    Transport(String),

    /// The store answered with something we could not interpret
    #[error("Unexpected store response: {0}")]
    InvalidResponse(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation deadline exceeded")]
    DeadlineExceeded,
}

impl StoreError {
    /// Absence is an expected outcome, not a failure of the store.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Throttled(_) | StoreError::Unavailable(_))
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Paging behaviour for [`list_by_prefix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub page_size: usize,
    /// Pause between consecutive page requests
    pub page_delay: Duration,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: Duration::ZERO,
        }
    }
}

impl ListOptions {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            ..Self::default()
        }
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }
}

/// List every parameter under `prefix`, following continuation tokens until
/// the store reports no more pages.
pub fn list_by_prefix<S: ParameterStore + ?Sized>(
    store: &S,
    ctx: &CallContext,
    prefix: &str,
    options: &ListOptions,
) -> StoreResult<RemoteSnapshot> {
    let mut snapshot = RemoteSnapshot::new();
    let mut token: Option<String> = None;
    let mut seen_tokens = HashSet::new();
    let mut pages = 0usize;

    loop {
        if pages > 0 && !options.page_delay.is_zero() {
            ctx.sleep(options.page_delay)?;
        }

        let request = PageRequest {
            prefix,
            page_size: options.page_size.max(1),
            next_token: token.as_deref(),
        };
        let page = store.list_page(ctx, &request)?;
        pages += 1;

        tracing::debug!(
            prefix,
            page = pages,
            returned = page.parameters.len(),
            more = page.next_token.is_some(),
            "Listed parameter page"
        );

        for parameter in page.parameters {
            snapshot.insert(parameter);
        }

        match page.next_token {
            Some(next) => {
                if !seen_tokens.insert(next.clone()) {
                    return Err(StoreError::InvalidResponse(format!(
                        "continuation token repeated while listing {}",
                        prefix
                    )));
                }
                token = Some(next);
            }
            None => break,
        }
    }

    tracing::debug!(prefix, pages, total = snapshot.len(), "Prefix listing complete");
    Ok(snapshot)
}

/// Open the store selected by the resolved configuration.
pub fn open_store(config: &ResolvedConfig) -> Result<Box<dyn ParameterStore>> {
    let store: Box<dyn ParameterStore> = match config.backend() {
        BackendType::Ssm => {
            let credentials = Credentials::from_env().ok_or_else(|| {
                Error::Config(
                    "AWS credentials not found: set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY"
                        .to_string(),
                )
            })?;
            let store = SsmStore::new(SsmConfig {
                region: config.region().to_string(),
                endpoint: config.endpoint().map(str::to_string),
                credentials,
                timeout: config.timeout(),
                retry: config.retry_policy(),
            })?;
            Box::new(store)
        }
        BackendType::File => {
            let path = config.store_file().ok_or_else(|| {
                Error::Config(
                    "file backend requires a store file (--store-file or PARGOLO_STORE_FILE)"
                        .to_string(),
                )
            })?;
            Box::new(FileStore::open(path)?)
        }
        BackendType::Memory => Box::new(MemoryStore::new()),
    };
    tracing::debug!(
        backend = store.backend_type(),
        location = %store.location(),
        "Opened parameter store"
    );
    Ok(store)
}
