//! In-process parameter store.
//!
//! Behaves like the remote store, including its paging quirk: a full page
//! always carries a continuation token, even when nothing follows it.
//! Every call is counted so callers can assert how many round trips an
//! operation made, and failures can be injected per name or for listings.

use crate::context::CallContext;
use crate::models::Parameter;
use crate::models::paths::is_under;
use crate::storage::backend::{Page, PageRequest, ParameterStore};
use crate::storage::{StoreError, StoreResult};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of store calls made so far, by operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub gets: usize,
    pub puts: usize,
    pub deletes: usize,
    pub list_pages: usize,
}

#[derive(Debug, Default)]
struct Counters {
    gets: AtomicUsize,
    puts: AtomicUsize,
    deletes: AtomicUsize,
    list_pages: AtomicUsize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    parameters: BTreeMap<String, Parameter>,
    failures: BTreeMap<String, StoreError>,
    list_failure: Option<StoreError>,
    counters: Counters,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `parameters`.
    pub fn with_parameters<I: IntoIterator<Item = Parameter>>(parameters: I) -> Self {
        let mut store = Self::new();
        for parameter in parameters {
            store.insert(parameter);
        }
        store
    }

    /// Insert directly, bypassing call accounting.
    pub fn insert(&mut self, parameter: Parameter) {
        self.parameters.insert(parameter.name.clone(), parameter);
    }

    /// Look up directly, bypassing call accounting and injected failures.
    pub fn peek(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    /// Remove directly, bypassing call accounting.
    pub fn remove(&mut self, name: &str) -> Option<Parameter> {
        self.parameters.remove(name)
    }

    /// Make every call touching `name` fail with `error`.
    pub fn fail_on(&mut self, name: impl Into<String>, error: StoreError) {
        self.failures.insert(name.into(), error);
    }

    /// Make every listing fail with `error`.
    pub fn fail_listing(&mut self, error: StoreError) {
        self.list_failure = Some(error);
    }

    pub fn call_counts(&self) -> CallCounts {
        CallCounts {
            gets: self.counters.gets.load(Ordering::Relaxed),
            puts: self.counters.puts.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
            list_pages: self.counters.list_pages.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// All parameters, ordered by name.
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    fn injected(&self, name: &str) -> StoreResult<()> {
        match self.failures.get(name) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl ParameterStore for MemoryStore {
    fn get(&self, ctx: &CallContext, name: &str) -> StoreResult<Parameter> {
        ctx.check()?;
        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        self.injected(name)?;
        self.parameters
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn put(
        &mut self,
        ctx: &CallContext,
        parameter: &Parameter,
        overwrite: bool,
    ) -> StoreResult<()> {
        ctx.check()?;
        self.counters.puts.fetch_add(1, Ordering::Relaxed);
        self.injected(&parameter.name)?;
        if !overwrite && self.parameters.contains_key(&parameter.name) {
            return Err(StoreError::AlreadyExists(parameter.name.clone()));
        }
        self.parameters
            .insert(parameter.name.clone(), parameter.clone());
        Ok(())
    }

    fn delete(&mut self, ctx: &CallContext, name: &str) -> StoreResult<()> {
        ctx.check()?;
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        self.injected(name)?;
        self.parameters
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn list_page(&self, ctx: &CallContext, request: &PageRequest<'_>) -> StoreResult<Page> {
        ctx.check()?;
        self.counters.list_pages.fetch_add(1, Ordering::Relaxed);
        if let Some(error) = &self.list_failure {
            return Err(error.clone());
        }

        let start = match request.next_token {
            Some(token) => Bound::Excluded(token.to_string()),
            None => Bound::Unbounded,
        };
        let page_size = request.page_size.max(1);

        let parameters: Vec<Parameter> = self
            .parameters
            .range((start, Bound::Unbounded))
            .filter(|(name, _)| is_under(name, request.prefix))
            .take(page_size)
            .map(|(_, p)| p.clone())
            .collect();

        let next_token = if parameters.len() == page_size {
            parameters.last().map(|p| p.name.clone())
        } else {
            None
        };

        Ok(Page {
            parameters,
            next_token,
        })
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
