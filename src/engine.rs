//! Reconciliation engine.
//!
//! Classifies each desired parameter against the store and yields one
//! [`Verdict`] per parameter, in input order. Classification only reads from
//! the store.
//!
//! A parameter is *shared* when its name sits under `/<env>/common`. The
//! rules differ by namespace:
//!
//! | remote state            | shared                     | project     |
//! |-------------------------|----------------------------|-------------|
//! | absent, value unused    | `CREATE`                   | `CREATE`    |
//! | absent, value held      | `DUPLICATE` + shared hints | `CREATE`    |
//! | present, same value     | `MAINTAIN`                 | `MAINTAIN`  |
//! | present, other value    | `DESTRUCTIVE`              | `OVERWRITE` |
//!
//! Absence is recovered locally. Any other store failure ends the run: the
//! verdict iterator yields the error once and then stops.

use crate::context::CallContext;
use crate::index::ValueIndex;
use crate::models::paths::CommonNamespace;
use crate::models::{DesiredState, Parameter, Verdict, VerdictKind};
use crate::storage::{ListOptions, ParameterStore, StoreResult};
use serde::Serialize;

/// One classification run against a single store.
///
/// Owns the value index for the run, so the full-store scrape happens at
/// most once no matter how many shared parameters are missing.
pub struct Reconciler<'a, S: ParameterStore + ?Sized> {
    store: &'a S,
    ctx: &'a CallContext,
    namespace: CommonNamespace,
    index: ValueIndex,
}

impl<'a, S: ParameterStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S, ctx: &'a CallContext, env: &str) -> Self {
        Self::with_options(store, ctx, env, ListOptions::default())
    }

    /// Use `options` for the full-store listing behind duplicate detection.
    pub fn with_options(
        store: &'a S,
        ctx: &'a CallContext,
        env: &str,
        options: ListOptions,
    ) -> Self {
        Self {
            store,
            ctx,
            namespace: CommonNamespace::new(env),
            index: ValueIndex::new(options),
        }
    }

    /// Classify a single desired parameter.
    pub fn classify_one(&mut self, desired: &Parameter) -> StoreResult<Verdict> {
        let remote = match self.store.get(self.ctx, &desired.name) {
            Ok(remote) => Some(remote),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        let shared = self.namespace.contains(&desired.name);

        let kind = match remote {
            Some(remote) if remote.value == desired.value => VerdictKind::Maintain,
            Some(_) if shared => VerdictKind::Destructive,
            Some(_) => VerdictKind::Overwrite,
            None if shared => return self.classify_missing_shared(desired),
            None => VerdictKind::Create,
        };
        Ok(Verdict::new(desired, kind))
    }

    fn classify_missing_shared(&mut self, desired: &Parameter) -> StoreResult<Verdict> {
        match self
            .index
            .find_by_value(self.store, self.ctx, &desired.value)
        {
            Ok(holders) => {
                let hints: Vec<String> = holders
                    .into_iter()
                    .map(|p| p.name)
                    .filter(|name| self.namespace.contains(name) && name != &desired.name)
                    .collect();
                Ok(Verdict::duplicate(desired, hints))
            }
            Err(e) if e.is_not_found() => Ok(Verdict::new(desired, VerdictKind::Create)),
            Err(e) => Err(e),
        }
    }

    /// Lazily classify every desired parameter in input order.
    pub fn classify<'r>(&'r mut self, desired: &'r DesiredState) -> Verdicts<'r, 'a, S> {
        Verdicts {
            reconciler: self,
            parameters: desired.iter(),
            failed: false,
        }
    }

    /// Classify everything, stopping at the first store failure.
    pub fn classify_all(&mut self, desired: &DesiredState) -> StoreResult<Vec<Verdict>> {
        self.classify(desired).collect()
    }
}

/// Verdict stream returned by [`Reconciler::classify`].
pub struct Verdicts<'r, 'a, S: ParameterStore + ?Sized> {
    reconciler: &'r mut Reconciler<'a, S>,
    parameters: std::slice::Iter<'r, Parameter>,
    failed: bool,
}

impl<S: ParameterStore + ?Sized> Iterator for Verdicts<'_, '_, S> {
    type Item = StoreResult<Verdict>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let parameter = self.parameters.next()?;
        let result = self.reconciler.classify_one(parameter);
        if let Err(e) = &result {
            tracing::debug!(name = %parameter.name, error = %e, "Classification aborted");
            self.failed = true;
        }
        Some(result)
    }
}

/// Per-kind verdict counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerdictSummary {
    pub create: usize,
    pub maintain: usize,
    pub duplicate: usize,
    pub overwrite: usize,
    pub destructive: usize,
}

impl VerdictSummary {
    pub fn from_verdicts<'v, I: IntoIterator<Item = &'v Verdict>>(verdicts: I) -> Self {
        let mut summary = Self::default();
        for verdict in verdicts {
            summary.record(verdict.kind);
        }
        summary
    }

    pub fn record(&mut self, kind: VerdictKind) {
        match kind {
            VerdictKind::Create => self.create += 1,
            VerdictKind::Maintain => self.maintain += 1,
            VerdictKind::Duplicate => self.duplicate += 1,
            VerdictKind::Overwrite => self.overwrite += 1,
            VerdictKind::Destructive => self.destructive += 1,
        }
    }

    pub fn count(&self, kind: VerdictKind) -> usize {
        match kind {
            VerdictKind::Create => self.create,
            VerdictKind::Maintain => self.maintain,
            VerdictKind::Duplicate => self.duplicate,
            VerdictKind::Overwrite => self.overwrite,
            VerdictKind::Destructive => self.destructive,
        }
    }

    pub fn total(&self) -> usize {
        VerdictKind::ALL.iter().map(|k| self.count(*k)).sum()
    }

    /// Most severe kind present, if any verdicts were recorded.
    pub fn highest(&self) -> Option<VerdictKind> {
        VerdictKind::ALL
            .iter()
            .copied()
            .filter(|k| self.count(*k) > 0)
            .max_by_key(|k| k.severity())
    }
}
