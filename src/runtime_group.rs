//! The `konnect_runtime_group` resource.
//!
//! Only creation talks to the API. Read and update persist whatever state
//! the host already holds, delete forgets the resource, and import passes the
//! given identifier through as the resource name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{CreateRuntimeGroupRequest, CreateRuntimeGroupResponse};
use crate::error::ProviderError;
use crate::schema::{Attribute, KeyRule, Schema};
use crate::types::{AttributeChange, PlanResult};
use crate::validation::validate_result;

/// Resource type name.
pub const RESOURCE_TYPE: &str = "konnect_runtime_group";

/// Label keys may not start with these.
pub const RESERVED_LABEL_PREFIXES: [&str; 4] = ["kong", "konnect", "mesh", "kic"];

/// Attributes set in configuration, in plan order.
const CONFIGURABLE: [&str; 4] = ["name", "description", "cluster_type", "labels"];

/// Attributes the provider fills in from the API response.
const SERVER_COMPUTED: [&str; 5] = [
    "runtime_group_id",
    "control_plane_endpoint",
    "telemetry_endpoint",
    "created_at",
    "updated_at",
];

/// State of a runtime group as stored by the plugin host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeGroupModel {
    /// The runtime group name; also the resource identifier.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Cluster type of the associated cluster.
    pub cluster_type: Option<String>,
    /// Labels for tagged search.
    pub labels: Option<BTreeMap<String, String>>,
    /// Resource identifier, equal to `name`.
    pub id: Option<String>,
    /// Identifier issued by the API.
    pub runtime_group_id: Option<String>,
    /// Control plane endpoint assigned by the API.
    pub control_plane_endpoint: Option<String>,
    /// Telemetry endpoint assigned by the API.
    pub telemetry_endpoint: Option<String>,
    /// Creation timestamp reported by the API.
    pub created_at: Option<String>,
    /// Last update timestamp reported by the API.
    pub updated_at: Option<String>,
}

impl RuntimeGroupModel {
    /// Parse a state or plan object.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize to a state object with every attribute present.
    pub fn to_value(&self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Build the API request from configured attributes.
    pub fn to_request(&self) -> CreateRuntimeGroupRequest {
        CreateRuntimeGroupRequest {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            cluster_type: self.cluster_type.clone().unwrap_or_default(),
            labels: self.labels.clone().unwrap_or_default(),
        }
    }

    /// Record the values the API assigned.
    ///
    /// Configured attributes keep their planned values so the stored state
    /// matches the plan.
    pub fn apply_response(&mut self, created: &CreateRuntimeGroupResponse) {
        self.id = Some(self.name.clone());
        self.runtime_group_id = Some(created.id.clone());
        self.control_plane_endpoint = Some(created.control_plane_endpoint().to_string());
        self.telemetry_endpoint = Some(created.telemetry_endpoint().to_string());
        self.created_at = Some(created.created_at.clone());
        self.updated_at = Some(created.updated_at.clone());
    }

    fn clear_server_computed(&mut self) {
        self.runtime_group_id = None;
        self.control_plane_endpoint = None;
        self.telemetry_endpoint = None;
        self.created_at = None;
        self.updated_at = None;
    }

    fn copy_server_computed(&mut self, from: &RuntimeGroupModel) {
        self.runtime_group_id = from.runtime_group_id.clone();
        self.control_plane_endpoint = from.control_plane_endpoint.clone();
        self.telemetry_endpoint = from.telemetry_endpoint.clone();
        self.created_at = from.created_at.clone();
        self.updated_at = from.updated_at.clone();
    }
}

/// Resource schema for `konnect_runtime_group`.
pub fn schema() -> Schema {
    let label_rule = KeyRule::length(1, 63).with_forbidden_prefixes(RESERVED_LABEL_PREFIXES);
    let labels_description = format!(
        "Labels to facilitate tagged search on runtime groups. {}",
        label_rule.describe()
    );

    let mut schema = Schema::v0()
        .with_description("A Konnect runtime group.")
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_force_new()
                .with_description("The name of the runtime group."),
        )
        .with_attribute(
            "description",
            Attribute::optional_string().with_description("The description of the runtime group."),
        )
        .with_attribute(
            "cluster_type",
            Attribute::optional_string().with_description(
                "The cluster type of the cluster associated with the runtime group.",
            ),
        )
        .with_attribute(
            "labels",
            Attribute::optional_string_map()
                .with_key_rule(label_rule)
                .with_description(labels_description),
        )
        .with_attribute(
            "id",
            Attribute::computed_string()
                .with_description("Resource identifier. Equal to the runtime group name."),
        );
    for name in SERVER_COMPUTED {
        schema = schema.with_attribute(name, Attribute::computed_string());
    }
    schema
}

/// Validate a planned state and parse it into a model.
pub fn parse_planned(planned_state: Value) -> Result<RuntimeGroupModel, ProviderError> {
    if let Err(diagnostics) = validate_result(&schema(), &planned_state) {
        let summaries: Vec<String> = diagnostics
            .iter()
            .map(|d| match &d.detail {
                Some(detail) => format!("{} ({})", d.summary, detail),
                None => d.summary.clone(),
            })
            .collect();
        return Err(ProviderError::Validation(summaries.join("; ")));
    }
    RuntimeGroupModel::from_value(planned_state)
}

/// Plan a create, update or delete of a runtime group.
pub fn plan(prior_state: Option<Value>, proposed_state: Value) -> Result<PlanResult, ProviderError> {
    match (prior_state, proposed_state) {
        (None, Value::Null) => Ok(PlanResult::no_change(Value::Null)),
        (Some(prior), Value::Null) => plan_delete(prior),
        (None, proposed) => plan_create(proposed),
        (Some(prior), proposed) => plan_update(prior, proposed),
    }
}

fn plan_create(proposed: Value) -> Result<PlanResult, ProviderError> {
    let mut planned = RuntimeGroupModel::from_value(proposed)?;
    planned.id = Some(planned.name.clone());
    planned.clear_server_computed();

    let planned_state = planned.to_value()?;
    let changes = CONFIGURABLE
        .iter()
        .chain(std::iter::once(&"id"))
        .filter_map(|name| {
            planned_state
                .get(*name)
                .filter(|v| !v.is_null())
                .map(|v| AttributeChange::added(*name, v.clone()))
        })
        .collect();

    Ok(PlanResult::with_changes(planned_state, changes, false))
}

fn plan_update(prior: Value, proposed: Value) -> Result<PlanResult, ProviderError> {
    let prior_model = RuntimeGroupModel::from_value(prior)?;
    let mut planned = RuntimeGroupModel::from_value(proposed)?;

    let before = prior_model.to_value()?;
    let requires_replace = !schema()
        .replacing_attributes(&before, &planned.to_value()?)
        .is_empty();
    planned.id = Some(planned.name.clone());
    if requires_replace {
        planned.clear_server_computed();
    } else {
        planned.copy_server_computed(&prior_model);
    }

    let planned_state = planned.to_value()?;
    let mut changes: Vec<AttributeChange> = CONFIGURABLE
        .iter()
        .filter_map(|name| diff(name, &before, &planned_state))
        .collect();
    if requires_replace {
        changes.extend(diff("id", &before, &planned_state));
    }

    if changes.is_empty() {
        return Ok(PlanResult::no_change(before));
    }
    Ok(PlanResult::with_changes(
        planned_state,
        changes,
        requires_replace,
    ))
}

fn plan_delete(prior: Value) -> Result<PlanResult, ProviderError> {
    let prior_model = RuntimeGroupModel::from_value(prior)?;
    let before = prior_model.to_value()?;
    let changes = match &before {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| AttributeChange::removed(k.clone(), v.clone()))
            .collect(),
        _ => Vec::new(),
    };
    Ok(PlanResult::with_changes(Value::Null, changes, false))
}

fn diff(name: &str, before: &Value, after: &Value) -> Option<AttributeChange> {
    let old = before.get(name).cloned().unwrap_or(Value::Null);
    let new = after.get(name).cloned().unwrap_or(Value::Null);
    match (old.is_null(), new.is_null()) {
        _ if old == new => None,
        (true, _) => Some(AttributeChange::added(name, new)),
        (_, true) => Some(AttributeChange::removed(name, old)),
        _ => Some(AttributeChange::modified(name, old, new)),
    }
}

/// Merge a planned state onto prior state for an in-place update.
///
/// Nothing is sent to the API; configured attributes come from the plan and
/// server-assigned ones are kept from the prior state.
pub fn merge_update(prior_state: Value, planned_state: Value) -> Result<Value, ProviderError> {
    let prior = RuntimeGroupModel::from_value(prior_state)?;
    let mut planned = parse_planned(planned_state)?;
    planned.id = Some(planned.name.clone());
    planned.copy_server_computed(&prior);
    planned.to_value()
}

/// State for an imported runtime group.
pub fn import_state(id: &str) -> Result<Value, ProviderError> {
    if id.trim().is_empty() {
        return Err(ProviderError::InvalidRequest(
            "import identifier must be the runtime group name".to_string(),
        ));
    }
    RuntimeGroupModel {
        name: id.to_string(),
        id: Some(id.to_string()),
        ..Default::default()
    }
    .to_value()
}
