//! Attribute schemas and diagnostics.
//!
//! A [`Schema`] lists the attributes of the provider block or of a resource.
//! Validation reads it to check user input, and the host reads it to know
//! which attributes users set and which the provider fills in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string.
    String,
    /// A string-keyed map whose values share one type.
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// `map(string)` and friends.
    pub fn map(element_type: AttributeType) -> Self {
        Self::Map(Box::new(element_type))
    }
}

/// Who sets an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Must be set in configuration.
    Required,
    /// May be set in configuration.
    Optional,
    /// Set by the provider; configuration values are ignored.
    Computed,
}

/// Rule for the keys of a map attribute.
///
/// Lengths count characters, not bytes. Prefix matching is case-sensitive
/// and only applies at the start of the key.
///
/// # Example
///
/// ```
/// use konnect_provider::schema::KeyRule;
///
/// let rule = KeyRule::length(1, 63).with_forbidden_prefixes(["kong", "kic"]);
///
/// assert!(rule.check("env").is_ok());
/// assert!(rule.check("team-kong").is_ok());
/// assert_eq!(rule.check("kong-env").unwrap_err(), "key cannot start with 'kong'");
/// assert!(rule.check("").is_err());
/// assert_eq!(
///     rule.describe(),
///     "Keys must be of length 1-63 characters, and cannot start with 'kong', 'kic'."
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRule {
    /// Shortest allowed key.
    pub min_len: usize,
    /// Longest allowed key.
    pub max_len: usize,
    /// Prefixes a key may not start with.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forbidden_prefixes: Vec<String>,
}

impl KeyRule {
    /// Keys of `min_len..=max_len` characters.
    pub fn length(min_len: usize, max_len: usize) -> Self {
        Self {
            min_len,
            max_len,
            forbidden_prefixes: Vec::new(),
        }
    }

    /// Also reject keys starting with any of `prefixes`.
    pub fn with_forbidden_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forbidden_prefixes
            .extend(prefixes.into_iter().map(Into::into));
        self
    }

    /// `Err` carries the reason `key` is rejected.
    pub fn check(&self, key: &str) -> Result<(), String> {
        let len = key.chars().count();
        if !(self.min_len..=self.max_len).contains(&len) {
            return Err(format!(
                "key length {} is outside {}-{} characters",
                len, self.min_len, self.max_len
            ));
        }
        match self
            .forbidden_prefixes
            .iter()
            .find(|p| key.starts_with(p.as_str()))
        {
            Some(prefix) => Err(format!("key cannot start with '{}'", prefix)),
            None => Ok(()),
        }
    }

    /// The rule as a sentence, for attribute descriptions and diagnostics.
    pub fn describe(&self) -> String {
        let length = format!(
            "Keys must be of length {}-{} characters",
            self.min_len, self.max_len
        );
        if self.forbidden_prefixes.is_empty() {
            return format!("{}.", length);
        }
        let quoted: Vec<String> = self
            .forbidden_prefixes
            .iter()
            .map(|p| format!("'{}'", p))
            .collect();
        format!("{}, and cannot start with {}.", length, quoted.join(", "))
    }
}

/// One attribute of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Value type.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Who sets the value.
    pub access: Access,
    /// Hidden from plan output and logs.
    #[serde(default)]
    pub sensitive: bool,
    /// Documentation shown to users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// A change replaces the resource instead of updating it.
    #[serde(default)]
    pub force_new: bool,
    /// Constraint on map keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_rule: Option<KeyRule>,
}

impl Attribute {
    /// An attribute of `attr_type` set by `access`.
    pub fn new(attr_type: AttributeType, access: Access) -> Self {
        Self {
            attr_type,
            access,
            sensitive: false,
            description: None,
            force_new: false,
            key_rule: None,
        }
    }

    /// Required string.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, Access::Required)
    }

    /// Optional string.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, Access::Optional)
    }

    /// Provider-set string.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, Access::Computed)
    }

    /// Optional `map(string)`.
    pub fn optional_string_map() -> Self {
        Self::new(AttributeType::map(AttributeType::String), Access::Optional)
    }

    /// Attach documentation.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the resource when this attribute changes.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Constrain map keys.
    pub fn with_key_rule(mut self, rule: KeyRule) -> Self {
        self.key_rule = Some(rule);
        self
    }

    /// Hide the value.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Must be present in configuration.
    pub fn is_required(&self) -> bool {
        self.access == Access::Required
    }

    /// Filled in by the provider.
    pub fn is_computed(&self) -> bool {
        self.access == Access::Computed
    }
}

/// Attributes of a provider block or resource, keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Block {
    /// Attributes by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Attribute>,
    /// Documentation shown to users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Versioned schema of the provider block or of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Schema {
    /// Bumped when stored state changes shape.
    #[serde(default)]
    pub version: u64,
    /// The attributes.
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// An empty schema at version 0.
    pub fn v0() -> Self {
        Self::default()
    }

    /// Add or replace attribute `name`.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    /// Attach documentation.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block.description = Some(description.into());
        self
    }

    /// Attribute `name`, if declared.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.get(name)
    }

    /// Names of `force_new` attributes whose value differs between the two
    /// state objects. A missing attribute compares as null.
    pub fn replacing_attributes<'a>(&'a self, before: &Value, after: &Value) -> Vec<&'a str> {
        self.block
            .attributes
            .iter()
            .filter(|(_, attr)| attr.force_new)
            .filter(|(name, _)| {
                let old = before.get(name.as_str()).unwrap_or(&Value::Null);
                let new = after.get(name.as_str()).unwrap_or(&Value::Null);
                old != new
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Everything a provider declares: its own block and its resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// The provider configuration block.
    #[serde(default)]
    pub provider: Schema,
    /// Resource schemas by type name.
    #[serde(default)]
    pub resources: BTreeMap<String, Schema>,
}

impl ProviderSchema {
    /// No provider attributes and no resources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider block schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Declare resource type `name`.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }
}

/// How serious a [`Diagnostic`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// The operation cannot go ahead.
    Error,
    /// Worth telling the user; the operation goes ahead.
    Warning,
}

/// A problem reported to the user, optionally pinned to an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity.
    pub severity: DiagnosticSeverity,
    /// One-line summary.
    pub summary: String,
    /// Longer explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Attribute path such as `labels.env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    fn new(severity: DiagnosticSeverity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// An error.
    pub fn error(summary: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Error, summary)
    }

    /// A warning.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, summary)
    }

    /// Add an explanation.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Pin to an attribute path.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this blocks the operation.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}
