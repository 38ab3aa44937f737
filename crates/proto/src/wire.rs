//! Wire renderings of [`Envelope`].
//!
//! The flat shape is the canonical contract and backs the serde impls. The
//! structured shape nests `data` and `error` as JSON objects for hosts that
//! want typed fields instead of colon-joined strings.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};

use crate::envelope::{Envelope, FlatMap};
use crate::error::ProtoError;

/// Output shape selected by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Flat string-to-string map with a colon-joined `error` field.
    #[default]
    Flat,
    /// Nested JSON with typed `ok` and structured `error`/`data`.
    Structured,
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireFormat::Flat => write!(f, "flat"),
            WireFormat::Structured => write!(f, "structured"),
        }
    }
}

impl std::str::FromStr for WireFormat {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(WireFormat::Flat),
            "structured" => Ok(WireFormat::Structured),
            other => Err(ProtoError::UnknownFormat(other.to_string())),
        }
    }
}

impl Envelope {
    /// Renders the envelope in the nested JSON shape.
    pub fn to_structured(&self) -> Value {
        match self {
            Envelope::Capabilities(caps) => json!({
                "tool": caps.tool,
                "versions": caps.versions,
                "features": caps.features.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
            }),
            Envelope::Success(success) => json!({
                "ok": true,
                "version": success.version,
                "data": success.data.clone().unwrap_or_else(|| json!({})),
            }),
            Envelope::Error(error) => json!({
                "ok": false,
                "version": error.version,
                "error": { "code": error.code, "message": error.message },
            }),
        }
    }

    /// Renders the envelope as a JSON value in the requested shape.
    pub fn render(&self, format: WireFormat) -> Value {
        match format {
            WireFormat::Flat => {
                let map = self
                    .to_flat_map()
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect();
                Value::Object(map)
            }
            WireFormat::Structured => self.to_structured(),
        }
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_flat_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = FlatMap::deserialize(deserializer)?;
        Envelope::from_flat_map(&map).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{capabilities, err, ok, ok_with};

    #[test]
    fn serde_json_uses_flat_shape() {
        let text = serde_json::to_string(&err("E1", "boom")).expect("serialize");
        assert_eq!(text, r#"{"error":"E1:boom","ok":"false","version":"v1"}"#);

        let parsed: Envelope = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(parsed, err("E1", "boom"));
    }

    #[test]
    fn deserialize_reports_invariant_violations() {
        let result: Result<Envelope, _> = serde_json::from_str(r#"{"ok":"false","version":"v1"}"#);
        let message = result.expect_err("missing error field").to_string();
        assert!(message.contains("Missing field: error"));
    }

    #[test]
    fn structured_success_defaults_data_to_empty_object() {
        assert_eq!(
            ok().to_structured(),
            json!({"ok": true, "version": "v1", "data": {}})
        );
        assert_eq!(
            ok_with(json!({"paths": ["x"]})).to_structured(),
            json!({"ok": true, "version": "v1", "data": {"paths": ["x"]}})
        );
    }

    #[test]
    fn structured_error_keeps_code_and_message_apart() {
        assert_eq!(
            err("E_RUNTIME", "disk: full").to_structured(),
            json!({
                "ok": false,
                "version": "v1",
                "error": {"code": "E_RUNTIME", "message": "disk: full"}
            })
        );
    }

    #[test]
    fn structured_capabilities_use_lists() {
        assert_eq!(
            capabilities().to_structured(),
            json!({
                "tool": "custom-tool-template",
                "versions": ["v1"],
                "features": ["validation", "envelope", "idempotency"]
            })
        );
    }

    #[test]
    fn render_flat_matches_flat_map() {
        assert_eq!(
            ok().render(WireFormat::Flat),
            json!({"ok": "true", "version": "v1"})
        );
    }

    #[test]
    fn wire_format_parse_and_display() {
        assert_eq!("flat".parse::<WireFormat>().ok(), Some(WireFormat::Flat));
        assert_eq!(
            "Structured".parse::<WireFormat>().ok(),
            Some(WireFormat::Structured)
        );
        assert!("xml".parse::<WireFormat>().is_err());
        assert_eq!(WireFormat::Structured.to_string(), "structured");
        assert_eq!(WireFormat::default(), WireFormat::Flat);
    }
}
