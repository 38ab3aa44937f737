//! Request validation against a tool's JSON schema.
//!
//! Covers the subset of JSON Schema the tool schemas use: top-level
//! `type`, `required`, per-property `type`, and `additionalProperties:
//! false`. Every violation is collected rather than stopping at the first.

use proto::IDEMPOTENCY_KEY_FIELD;
use serde_json::Value;
use thiserror::Error;

/// All schema violations found in one request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .errors.join("; "))]
pub struct ValidationFailure {
    /// Individual violation messages, in schema order.
    pub errors: Vec<String>,
}

/// Validates requests against a fixed schema
#[derive(Debug, Clone)]
pub struct RequestValidator {
    schema: Value,
}

impl RequestValidator {
    /// Creates a validator for the given schema.
    pub fn new(schema: Value) -> Self {
        Self { schema }
    }

    /// Returns the schema this validator enforces.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Checks `request` against the schema.
    pub fn validate(&self, request: &Value) -> Result<(), ValidationFailure> {
        let mut errors = Vec::new();

        if let Some(expected) = self.schema.get("type")
            && !type_matches(expected, request)
        {
            errors.push(format!("request must be {}", describe_type(expected)));
            return Err(ValidationFailure { errors });
        }

        let Some(object) = request.as_object() else {
            return Ok(());
        };

        if let Some(required) = self.schema.get("required").and_then(Value::as_array) {
            for key in required.iter().filter_map(Value::as_str) {
                if !object.contains_key(key) {
                    errors.push(format!("missing required property '{key}'"));
                }
            }
        }

        let properties = self.schema.get("properties").and_then(Value::as_object);
        if let Some(properties) = properties {
            for (key, property_schema) in properties {
                let (Some(value), Some(expected)) = (object.get(key), property_schema.get("type"))
                else {
                    continue;
                };
                if !type_matches(expected, value) {
                    errors.push(format!(
                        "property '{key}' must be {}",
                        describe_type(expected)
                    ));
                }
            }
        }

        if self.schema.get("additionalProperties") == Some(&Value::Bool(false)) {
            for key in object.keys() {
                let declared = properties.is_some_and(|p| p.contains_key(key));
                if !declared && key != IDEMPOTENCY_KEY_FIELD {
                    errors.push(format!("unexpected property '{key}'"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure { errors })
        }
    }
}

/// Returns true when `value` satisfies a `type` keyword (string or list form).
fn type_matches(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(name) => single_type_matches(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| single_type_matches(name, value)),
        _ => true,
    }
}

fn single_type_matches(name: &str, value: &Value) -> bool {
    match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        // Unknown type names are not enforced.
        _ => true,
    }
}

fn describe_type(expected: &Value) -> String {
    match expected {
        Value::String(name) => article(name),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .map(article)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.to_string(),
    }
}

fn article(name: &str) -> String {
    match name {
        "object" | "array" | "integer" => format!("an {name}"),
        "null" => "null".to_string(),
        _ => format!("a {name}"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn name_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "count": {"type": "integer"},
                "tags": {"type": ["array", "null"]}
            },
            "required": ["name"]
        })
    }

    #[test]
    fn accepts_conforming_request() {
        let validator = RequestValidator::new(name_schema());
        assert!(
            validator
                .validate(&json!({"name": "x", "count": 2, "tags": null}))
                .is_ok()
        );
    }

    #[test]
    fn rejects_non_object_request() {
        let validator = RequestValidator::new(name_schema());
        let failure = validator.validate(&json!("x")).expect_err("not an object");
        assert_eq!(failure.errors, vec!["request must be an object".to_string()]);
    }

    #[test]
    fn collects_every_violation() {
        let validator = RequestValidator::new(name_schema());
        let failure = validator
            .validate(&json!({"count": 1.5, "tags": "a"}))
            .expect_err("invalid request");
        assert_eq!(
            failure.errors,
            vec![
                "missing required property 'name'".to_string(),
                "property 'count' must be an integer".to_string(),
                "property 'tags' must be an array or null".to_string(),
            ]
        );
        assert!(failure.to_string().contains("; "));
    }

    #[test]
    fn additional_properties_false_rejects_undeclared_keys_but_not_idempotency_key() {
        let validator = RequestValidator::new(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "additionalProperties": false
        }));
        assert!(
            validator
                .validate(&json!({"name": "x", "idempotency_key": "k"}))
                .is_ok()
        );
        let failure = validator
            .validate(&json!({"name": "x", "extra": true}))
            .expect_err("extra key");
        assert_eq!(failure.errors, vec!["unexpected property 'extra'".to_string()]);
    }

    #[test]
    fn permissive_schema_accepts_any_object() {
        let validator = RequestValidator::new(json!({"type": "object"}));
        assert!(validator.validate(&json!({"anything": [1, 2, 3]})).is_ok());
        assert_eq!(validator.schema(), &json!({"type": "object"}));
    }

    #[test]
    fn unknown_type_names_are_not_enforced() {
        assert!(type_matches(&json!("uuid"), &json!(5)));
        assert!(type_matches(&json!(42), &json!("x")));
    }
}
