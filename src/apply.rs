//! Upload of a desired state to the store.
//!
//! Each record is written independently; a rejected record is reported and
//! the batch carries on. Only cancellation or an expired deadline stops the
//! batch early.

use crate::context::CallContext;
use crate::models::{DesiredState, Verdict, VerdictKind};
use crate::storage::{ParameterStore, StoreError, StoreResult};
use crate::{Error, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyStatus {
    Written,
    Failed,
}

/// Result of writing one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    pub name: String,
    pub status: ApplyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the failure was a name collision with `overwrite` off
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub already_exists: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub overwrite: bool,
    pub outcomes: Vec<ApplyOutcome>,
}

impl ApplyReport {
    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == ApplyStatus::Written)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.written()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ApplyOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == ApplyStatus::Failed)
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

fn interrupts_batch(err: &StoreError) -> bool {
    matches!(err, StoreError::Cancelled | StoreError::DeadlineExceeded)
}

/// Upsert every desired parameter with the given overwrite flag.
pub fn upload<S: ParameterStore + ?Sized>(
    store: &mut S,
    ctx: &CallContext,
    desired: &DesiredState,
    overwrite: bool,
) -> StoreResult<ApplyReport> {
    let mut report = ApplyReport {
        overwrite,
        outcomes: Vec::with_capacity(desired.len()),
    };

    for parameter in desired {
        match store.put(ctx, parameter, overwrite) {
            Ok(()) => {
                tracing::debug!(name = %parameter.name, "Wrote parameter");
                report.outcomes.push(ApplyOutcome {
                    name: parameter.name.clone(),
                    status: ApplyStatus::Written,
                    error: None,
                    already_exists: false,
                });
            }
            Err(e) if interrupts_batch(&e) => return Err(e),
            Err(e) => {
                tracing::warn!(name = %parameter.name, error = %e, "Failed to write parameter");
                report.outcomes.push(ApplyOutcome {
                    name: parameter.name.clone(),
                    status: ApplyStatus::Failed,
                    already_exists: matches!(e, StoreError::AlreadyExists(_)),
                    error: Some(e.to_string()),
                });
            }
        }
    }

    tracing::info!(
        written = report.written(),
        failed = report.failed(),
        overwrite,
        "Upload complete"
    );
    Ok(report)
}

/// Refuse to proceed when any verdict would overwrite a shared value.
pub fn ensure_not_destructive(verdicts: &[Verdict]) -> Result<()> {
    let names: Vec<String> = verdicts
        .iter()
        .filter(|v| v.kind == VerdictKind::Destructive)
        .map(|v| v.name.clone())
        .collect();
    if names.is_empty() {
        Ok(())
    } else {
        Err(Error::DestructiveChange(names))
    }
}
