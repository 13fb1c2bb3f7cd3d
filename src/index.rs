//! Reverse value index over the whole store.
//!
//! Built lazily from a single recursive listing of `/` the first time a value
//! is looked up, then reused for the rest of the invocation that owns it.

use crate::context::CallContext;
use crate::models::{Parameter, RemoteSnapshot};
use crate::storage::{ListOptions, ParameterStore, StoreError, StoreResult, list_by_prefix};
use std::collections::{BTreeMap, BTreeSet};

/// Listing root covering every parameter.
pub const ROOT_PREFIX: &str = "/";

/// Multimap from value to the parameters holding it.
#[derive(Debug, Default)]
pub struct ValueIndex {
    options: ListOptions,
    built: bool,
    by_value: BTreeMap<String, BTreeSet<String>>,
    parameters: BTreeMap<String, Parameter>,
}

impl ValueIndex {
    pub fn new(options: ListOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Number of parameters indexed.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Scrape the store once. Later calls are no-ops.
    pub fn ensure_built<S: ParameterStore + ?Sized>(
        &mut self,
        store: &S,
        ctx: &CallContext,
    ) -> StoreResult<()> {
        if self.built {
            return Ok(());
        }
        let snapshot = list_by_prefix(store, ctx, ROOT_PREFIX, &self.options)?;
        self.load(snapshot);
        tracing::debug!(
            parameters = self.parameters.len(),
            values = self.by_value.len(),
            "Built value index"
        );
        Ok(())
    }

    /// Every parameter whose value equals `value` exactly, ordered by name.
    ///
    /// No match is reported as `StoreError::NotFound`.
    pub fn find_by_value<S: ParameterStore + ?Sized>(
        &mut self,
        store: &S,
        ctx: &CallContext,
        value: &str,
    ) -> StoreResult<Vec<Parameter>> {
        self.ensure_built(store, ctx)?;
        let matches: Vec<Parameter> = self
            .by_value
            .get(value)
            .into_iter()
            .flatten()
            .filter_map(|name| self.parameters.get(name).cloned())
            .collect();
        if matches.is_empty() {
            return Err(StoreError::NotFound(format!("no parameter holds value {}", value)));
        }
        Ok(matches)
    }

    fn load(&mut self, snapshot: RemoteSnapshot) {
        self.by_value.clear();
        self.parameters.clear();
        for parameter in snapshot.into_parameters() {
            self.by_value
                .entry(parameter.value.clone())
                .or_default()
                .insert(parameter.name.clone());
            self.parameters.insert(parameter.name.clone(), parameter);
        }
        self.built = true;
    }
}
