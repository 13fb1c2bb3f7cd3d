//! Dereferencing of values that point into the shared namespace.
//!
//! A value containing `/common/` names another parameter. Resolution follows
//! that name exactly once; the target's value is returned verbatim even if it
//! looks like a reference itself.

use crate::context::CallContext;
use crate::models::paths::REFERENCE_MARKER;
use crate::storage::{ParameterStore, StoreResult};

/// Whether `value` is a reference to a shared parameter.
pub fn is_reference(value: &str) -> bool {
    value.contains(REFERENCE_MARKER)
}

/// Resolve `value` through at most one reference.
///
/// Non-reference values are returned unchanged without touching the store.
/// A reference costs exactly one point lookup; nothing is cached, and a
/// missing target surfaces as `StoreError::NotFound` for the caller to judge.
pub fn dereference<S: ParameterStore + ?Sized>(
    store: &S,
    ctx: &CallContext,
    value: &str,
) -> StoreResult<String> {
    if !is_reference(value) {
        return Ok(value.to_string());
    }
    let target = store.get(ctx, value)?;
    tracing::trace!(reference = value, "Dereferenced shared parameter");
    Ok(target.value)
}
