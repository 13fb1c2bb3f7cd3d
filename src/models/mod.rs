//! Data models for pargolo.
//!
//! This module defines the core data structures:
//! - `Parameter` - A named, typed configuration value held by a parameter store
//! - `DesiredState` - The ordered set of parameters a user wants to exist
//! - `RemoteSnapshot` - A point-in-time listing of the store under a prefix
//! - `Verdict` - The classification of one desired parameter against the store

pub mod paths;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Plain string parameter type tag.
pub const TYPE_STRING: &str = "String";

/// A single parameter as stored remotely or declared locally.
///
/// The type tag is passed through to the store untouched; pargolo never
/// interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Slash-delimited hierarchical name (primary key)
    pub name: String,

    /// Store type tag (`String`, `StringList`, `SecureString`)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Literal value, or a reference to a shared parameter name
    pub value: String,
}

impl Parameter {
    pub fn new(
        name: impl Into<String>,
        param_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            value: value.into(),
        }
    }

    /// Shorthand for a plain `String` parameter.
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, TYPE_STRING, value)
    }
}

/// Ordered desired state keyed by parameter name.
///
/// Insertion order is preserved. When a name repeats, the earlier record is
/// dropped and the later one is kept at its own position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    parameters: Vec<Parameter>,
    /// Position of each name in `parameters`
    positions: HashMap<String, usize>,
}

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any earlier record with the same name.
    ///
    /// Returns the replaced record, if any.
    pub fn push(&mut self, parameter: Parameter) -> Option<Parameter> {
        let replaced = self.positions.remove(&parameter.name).map(|idx| {
            let old = self.parameters.remove(idx);
            for (offset, shifted) in self.parameters[idx..].iter().enumerate() {
                self.positions.insert(shifted.name.clone(), idx + offset);
            }
            old
        });
        self.positions.insert(parameter.name.clone(), self.parameters.len());
        self.parameters.push(parameter);
        replaced
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.positions.get(name).map(|&idx| &self.parameters[idx])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.parameters.iter()
    }

    pub fn as_slice(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn into_parameters(self) -> Vec<Parameter> {
        self.parameters
    }
}

impl FromIterator<Parameter> for DesiredState {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        let mut state = DesiredState::new();
        for parameter in iter {
            state.push(parameter);
        }
        state
    }
}

impl<'a> IntoIterator for &'a DesiredState {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.parameters.iter()
    }
}

/// Point-in-time mapping of name to parameter obtained from a prefix listing.
///
/// Iteration is ordered by name so every consumer sees the same sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSnapshot {
    parameters: BTreeMap<String, Parameter>,
}

impl RemoteSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter. Returns `false` if the name was already present.
    pub fn insert(&mut self, parameter: Parameter) -> bool {
        self.parameters
            .insert(parameter.name.clone(), parameter)
            .is_none()
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    pub fn into_parameters(self) -> Vec<Parameter> {
        self.parameters.into_values().collect()
    }
}

/// Classification outcome for one desired parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictKind {
    /// Parameter is absent and safe to introduce
    Create,
    /// Parameter exists with the desired value
    Maintain,
    /// Shared parameter is absent but its value already lives elsewhere
    Duplicate,
    /// Project parameter exists with a different value
    Overwrite,
    /// Shared parameter exists with a different value
    Destructive,
}

impl VerdictKind {
    /// All kinds, lowest severity first.
    pub const ALL: [VerdictKind; 5] = [
        VerdictKind::Create,
        VerdictKind::Maintain,
        VerdictKind::Duplicate,
        VerdictKind::Overwrite,
        VerdictKind::Destructive,
    ];

    /// Severity rank: DESTRUCTIVE > OVERWRITE > DUPLICATE > CREATE = MAINTAIN.
    pub fn severity(&self) -> u8 {
        match self {
            VerdictKind::Create | VerdictKind::Maintain => 0,
            VerdictKind::Duplicate => 1,
            VerdictKind::Overwrite => 2,
            VerdictKind::Destructive => 3,
        }
    }

    /// Whether the parameter already exists remotely.
    pub fn is_present(&self) -> bool {
        matches!(
            self,
            VerdictKind::Maintain | VerdictKind::Overwrite | VerdictKind::Destructive
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictKind::Create => "CREATE",
            VerdictKind::Maintain => "MAINTAIN",
            VerdictKind::Duplicate => "DUPLICATE",
            VerdictKind::Overwrite => "OVERWRITE",
            VerdictKind::Destructive => "DESTRUCTIVE",
        }
    }
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The verdict for a single desired parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Desired parameter name
    pub name: String,

    /// Desired parameter value
    pub value: String,

    /// Classification
    pub kind: VerdictKind,

    /// Existing shared parameters holding the same value (DUPLICATE only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<String>>,
}

impl Verdict {
    pub fn new(parameter: &Parameter, kind: VerdictKind) -> Self {
        Self {
            name: parameter.name.clone(),
            value: parameter.value.clone(),
            kind,
            hints: None,
        }
    }

    pub fn duplicate(parameter: &Parameter, hints: Vec<String>) -> Self {
        Self {
            hints: Some(hints),
            ..Self::new(parameter, VerdictKind::Duplicate)
        }
    }

    /// Render the audit line(s) shown to humans.
    pub fn to_audit_line(&self) -> String {
        let state = if self.kind.is_present() {
            "PRESENT"
        } else {
            "MISSING"
        };
        let mut line = format!(
            "{} -> {:<11} - {} WITH VALUE {}",
            state,
            self.kind.as_str(),
            self.name,
            self.value
        );
        if self.kind == VerdictKind::Destructive {
            line.push_str(" (uploading may break other projects)");
        }
        if let Some(hints) = &self.hints {
            for hint in hints {
                line.push_str(&format!("\n- {}", hint));
            }
        }
        line
    }
}
