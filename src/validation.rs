//! Checking configuration values against a [`Schema`].
//!
//! Every problem becomes a [`Diagnostic`] whose attribute path points at the
//! offending value, so the host can show it next to the user's input.
//!
//! ```
//! use konnect_provider::schema::{Attribute, KeyRule, Schema};
//! use konnect_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute(
//!         "labels",
//!         Attribute::optional_string_map().with_key_rule(KeyRule::length(1, 63)),
//!     );
//!
//! assert!(validate(&schema, &json!({"name": "dev", "labels": {"env": "dev"}})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "dev", "labels": {"": "dev"}}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute.as_deref(), Some("labels."));
//! ```

use serde_json::{Map, Value};

use crate::schema::{Access, Attribute, AttributeType, Diagnostic, KeyRule, Schema};

/// All problems with `value`; empty when it conforms.
///
/// Computed attributes are not checked. Missing or null values are only an
/// error for required attributes.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut walker = Walker::default();
    match value.as_object() {
        Some(object) => walker.object(schema, object),
        None => walker.report(
            Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", type_name(value))),
        ),
    }
    walker.diagnostics
}

/// [`validate`] as a `Result`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Whether `value` conforms to `schema`.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

#[derive(Default)]
struct Walker {
    diagnostics: Vec<Diagnostic>,
}

impl Walker {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn object(&mut self, schema: &Schema, object: &Map<String, Value>) {
        for (name, attr) in &schema.block.attributes {
            self.attribute(name, attr, object.get(name));
        }
    }

    fn attribute(&mut self, path: &str, attr: &Attribute, value: Option<&Value>) {
        let value = match (attr.access, value) {
            (Access::Computed, _) => return,
            (_, Some(v)) if !v.is_null() => v,
            (Access::Required, _) => {
                return self.report(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
            _ => return,
        };

        self.typed(path, &attr.attr_type, value);
        if let (Some(rule), Some(map)) = (&attr.key_rule, value.as_object()) {
            for key in map.keys() {
                self.key(path, rule, key);
            }
        }
    }

    fn typed(&mut self, path: &str, expected: &AttributeType, value: &Value) {
        match (expected, value) {
            (AttributeType::String, Value::String(_)) => {}
            (AttributeType::Map(element), Value::Object(map)) => {
                for (key, item) in map {
                    self.typed(&format!("{}.{}", path, key), element, item);
                }
            }
            (AttributeType::String, _) => self.report(type_error(path, "string", value)),
            (AttributeType::Map(_), _) => self.report(type_error(path, "map", value)),
        }
    }

    fn key(&mut self, path: &str, rule: &KeyRule, key: &str) {
        if let Err(reason) = rule.check(key) {
            self.report(
                Diagnostic::error(format!("Invalid key '{}' in attribute '{}'", key, path))
                    .with_detail(format!("{}: {}", reason, rule.describe()))
                    .with_attribute(format!("{}.{}", path, key)),
            );
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, type_name(got)))
        .with_attribute(path)
}
