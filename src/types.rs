//! Plan, import and metadata values exchanged with the plugin host.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One attribute whose value differs between prior and planned state.
///
/// `before` is `None` when the attribute is being set for the first time and
/// `after` is `None` when it is being removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Attribute name, e.g. `description`.
    pub path: String,
    /// Prior value.
    pub before: Option<Value>,
    /// Planned value.
    pub after: Option<Value>,
}

impl AttributeChange {
    /// An attribute gaining a value.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: None,
            after: Some(value),
        }
    }

    /// An attribute losing its value.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(value),
            after: None,
        }
    }

    /// An attribute going from `before` to `after`.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(before),
            after: Some(after),
        }
    }
}

/// Outcome of planning one resource.
///
/// An empty `changes` list means nothing to apply; `requires_replace` asks
/// the host to delete and create instead of updating.
///
/// # Example
///
/// ```
/// use konnect_provider::{AttributeChange, PlanResult};
/// use serde_json::json;
///
/// let plan = PlanResult::with_changes(
///     json!({"name": "prod", "id": "prod"}),
///     vec![AttributeChange::modified("name", json!("dev"), json!("prod"))],
///     true,
/// );
/// assert_eq!(plan.changed_paths(), vec!["name"]);
/// assert!(plan.requires_replace && !plan.is_delete());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// State the resource will have once applied. Null plans a delete;
    /// computed attributes not yet known are null.
    pub planned_state: Value,
    /// Attributes that change.
    pub changes: Vec<AttributeChange>,
    /// Whether applying needs a delete followed by a create.
    pub requires_replace: bool,
}

impl PlanResult {
    /// A plan that leaves `state` as it is.
    pub fn no_change(state: Value) -> Self {
        Self::with_changes(state, Vec::new(), false)
    }

    /// A plan moving to `planned_state`.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// Whether anything changes.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Whether the plan removes the resource.
    pub fn is_delete(&self) -> bool {
        self.planned_state.is_null()
    }

    /// The change to `path`, if any.
    pub fn change(&self, path: &str) -> Option<&AttributeChange> {
        self.changes.iter().find(|c| c.path == path)
    }

    /// Names of changed attributes, in plan order.
    pub fn changed_paths(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.path.as_str()).collect()
    }
}

/// A resource brought under management by import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// Resource type name.
    pub resource_type: String,
    /// Initial state; the host reads the rest.
    pub state: Value,
}

impl ImportedResource {
    /// Pair a resource type with its imported state.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Resource types a provider serves, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names.
    pub resources: Vec<String>,
}
