use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ToolError;

/// Request field carrying the caller's idempotency key.
pub const IDEMPOTENCY_KEY_FIELD: &str = "idempotency_key";

/// Unique identifier for one dispatch through the adapter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub String);

impl CallId {
    /// Creates a new random call identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the raw call identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CallId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Inbound tool request: always a JSON object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ToolRequest(Value);

impl ToolRequest {
    /// Wraps a JSON value, rejecting anything that is not an object.
    pub fn from_value(value: Value) -> Result<Self, ToolError> {
        if value.is_object() {
            Ok(Self(value))
        } else {
            Err(ToolError::InvalidRequest(
                "request must be an object".to_string(),
            ))
        }
    }

    /// Creates an empty request object.
    pub fn empty() -> Self {
        Self(Value::Object(serde_json::Map::new()))
    }

    /// Returns a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a top-level field when it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns the non-empty idempotency key, if the caller supplied one.
    pub fn idempotency_key(&self) -> Option<&str> {
        self.get_str(IDEMPOTENCY_KEY_FIELD)
            .filter(|key| !key.is_empty())
    }

    /// Returns the underlying JSON object.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the request, returning the JSON object.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl Default for ToolRequest {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<Value> for ToolRequest {
    type Error = ToolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl<'de> Deserialize<'de> for ToolRequest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn call_id_new_creates_unique_non_empty_values() {
        let a = CallId::new();
        let b = CallId::new();
        assert!(!a.as_str().is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn from_value_accepts_objects_only() {
        assert!(ToolRequest::from_value(json!({"name": "x"})).is_ok());
        for value in [json!(null), json!("x"), json!(1), json!([1, 2])] {
            let err = ToolRequest::from_value(value).expect_err("non-object must fail");
            assert!(matches!(err, ToolError::InvalidRequest(_)));
        }
    }

    #[test]
    fn accessors_read_top_level_fields() {
        let req = ToolRequest::from_value(json!({"name": "widget", "count": 3})).expect("object");
        assert_eq!(req.get_str("name"), Some("widget"));
        assert_eq!(req.get_str("count"), None);
        assert_eq!(req.get("count"), Some(&json!(3)));
        assert_eq!(req.get("missing"), None);
    }

    #[test]
    fn idempotency_key_ignores_empty_and_non_string_values() {
        let req = ToolRequest::from_value(json!({"idempotency_key": "k-1"})).expect("object");
        assert_eq!(req.idempotency_key(), Some("k-1"));

        let req = ToolRequest::from_value(json!({"idempotency_key": ""})).expect("object");
        assert_eq!(req.idempotency_key(), None);

        let req = ToolRequest::from_value(json!({"idempotency_key": 7})).expect("object");
        assert_eq!(req.idempotency_key(), None);
    }

    #[test]
    fn deserialize_rejects_non_object_json() {
        let parsed: Result<ToolRequest, _> = serde_json::from_str("[1,2]");
        assert!(parsed.is_err());

        let parsed: ToolRequest = serde_json::from_str(r#"{"a":1}"#).expect("object parses");
        assert_eq!(parsed.into_value(), json!({"a": 1}));
    }

    #[test]
    fn empty_request_is_an_object() {
        assert_eq!(ToolRequest::empty().as_value(), &json!({}));
        assert_eq!(ToolRequest::default(), ToolRequest::empty());
    }
}
