//! Envelope data model and the canonical envelope builders.
//!
//! Every adapter operation answers with an [`Envelope`]. On the wire an
//! envelope is a flat string-to-string map; in Rust it is a tagged enum so
//! that a capability descriptor can never carry `ok`, and `error` only ever
//! appears on a failed call.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::error::ProtoError;

/// Protocol version stamped on every success/error envelope.
pub const PROTOCOL_VERSION: &str = "v1";

/// Protocol versions advertised by capability descriptors.
pub const SUPPORTED_VERSIONS: &[&str] = &[PROTOCOL_VERSION];

/// Tool name advertised by the template adapter.
pub const TEMPLATE_TOOL_NAME: &str = "custom-tool-template";

/// Standard error codes carried in error envelopes.
pub mod codes {
    /// Request is not an object or fails schema validation.
    pub const E_SCHEMA: &str = "E_SCHEMA";
    /// A tool argument is missing or has the wrong type.
    pub const E_ARGS: &str = "E_ARGS";
    /// The tool's effect failed at runtime.
    pub const E_RUNTIME: &str = "E_RUNTIME";
    /// A remote call made by the tool failed.
    pub const E_NETWORK: &str = "E_NETWORK";
    /// No handler could serve the request.
    pub const E_NOT_FOUND: &str = "E_NOT_FOUND";
}

/// Flat wire representation of an envelope.
pub type FlatMap = BTreeMap<String, String>;

const KEY_TOOL: &str = "tool";
const KEY_VERSIONS: &str = "versions";
const KEY_FEATURES: &str = "features";
const KEY_OK: &str = "ok";
const KEY_VERSION: &str = "version";
const KEY_ERROR: &str = "error";
const KEY_DATA: &str = "data";

/// Optional adapter behaviours advertised through capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Requests are checked against the tool's schema before dispatch.
    Validation,
    /// Responses follow the ok/version/error envelope contract.
    Envelope,
    /// Requests carrying an `idempotency_key` are replayed from cache.
    Idempotency,
}

impl Feature {
    /// Returns every known feature in advertisement order.
    pub const fn all() -> &'static [Self] {
        &[Self::Validation, Self::Envelope, Self::Idempotency]
    }

    /// Returns the wire name of the feature.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Envelope => "envelope",
            Self::Idempotency => "idempotency",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Feature {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validation" => Ok(Self::Validation),
            "envelope" => Ok(Self::Envelope),
            "idempotency" => Ok(Self::Idempotency),
            other => Err(ProtoError::UnknownFeature(other.to_string())),
        }
    }
}

/// Capability advertisement: tool identity, versions and features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    /// Tool name.
    pub tool: String,
    /// Supported protocol versions.
    pub versions: Vec<String>,
    /// Supported adapter features.
    pub features: Vec<Feature>,
}

impl CapabilityDescriptor {
    /// Creates a descriptor advertising [`SUPPORTED_VERSIONS`].
    pub fn new(tool: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            tool: tool.into(),
            versions: SUPPORTED_VERSIONS.iter().map(|v| v.to_string()).collect(),
            features,
        }
    }

    /// Returns true when `feature` is advertised.
    pub fn supports(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Returns true when `version` is one of the advertised versions.
    pub fn supports_version(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }
}

/// Successful call result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessEnvelope {
    /// Protocol version of this response.
    pub version: String,
    /// Tool-specific payload; `None` for a bare acknowledgement.
    pub data: Option<Value>,
}

impl SuccessEnvelope {
    /// Creates a bare success envelope.
    pub fn new() -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            data: None,
        }
    }

    /// Creates a success envelope carrying a tool payload.
    pub fn with_data(data: Value) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            data: Some(data),
        }
    }
}

impl Default for SuccessEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

/// Failed call result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEnvelope {
    /// Protocol version of this response.
    pub version: String,
    /// Machine-readable error code, e.g. `E_ARGS`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl ErrorEnvelope {
    /// Creates an error envelope from code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Returns the colon-joined `error` wire field.
    pub fn error_field(&self) -> String {
        format!("{}:{}", self.code, self.message)
    }

    /// Splits an `error` wire field on its first colon into code and message.
    pub fn parse_error_field(field: &str) -> Result<(String, String), ProtoError> {
        field
            .split_once(':')
            .map(|(code, message)| (code.to_string(), message.to_string()))
            .ok_or_else(|| ProtoError::MalformedErrorField(field.to_string()))
    }

    /// Returns true when the code contains the field delimiter and therefore
    /// cannot be recovered exactly from the flat wire shape.
    pub fn has_ambiguous_code(&self) -> bool {
        self.code.contains(':')
    }
}

/// Response record returned by every adapter operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Answer to `capabilities`.
    Capabilities(CapabilityDescriptor),
    /// Successful call.
    Success(SuccessEnvelope),
    /// Failed call.
    Error(ErrorEnvelope),
}

impl Envelope {
    /// Returns true for a success envelope.
    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    /// Returns true for an error envelope.
    pub fn is_error(&self) -> bool {
        matches!(self, Envelope::Error(_))
    }

    /// Returns the error details when this is an error envelope.
    pub fn as_error(&self) -> Option<&ErrorEnvelope> {
        match self {
            Envelope::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Converts the envelope into its flat string-to-string wire shape.
    pub fn to_flat_map(&self) -> FlatMap {
        let mut map = FlatMap::new();
        match self {
            Envelope::Capabilities(caps) => {
                map.insert(KEY_TOOL.to_string(), caps.tool.clone());
                map.insert(KEY_VERSIONS.to_string(), caps.versions.join(","));
                let features = caps
                    .features
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                map.insert(KEY_FEATURES.to_string(), features);
            }
            Envelope::Success(success) => {
                map.insert(KEY_OK.to_string(), "true".to_string());
                map.insert(KEY_VERSION.to_string(), success.version.clone());
                if let Some(data) = &success.data {
                    map.insert(KEY_DATA.to_string(), data.to_string());
                }
            }
            Envelope::Error(error) => {
                map.insert(KEY_OK.to_string(), "false".to_string());
                map.insert(KEY_VERSION.to_string(), error.version.clone());
                map.insert(KEY_ERROR.to_string(), error.error_field());
            }
        }
        map
    }

    /// Parses a flat wire map, enforcing the envelope shape invariants.
    pub fn from_flat_map(map: &FlatMap) -> Result<Self, ProtoError> {
        match map.get(KEY_OK).map(String::as_str) {
            None => {
                reject_foreign_keys(map, &[KEY_TOOL, KEY_VERSIONS, KEY_FEATURES], "capability")?;
                let tool = required(map, KEY_TOOL)?;
                let versions = split_list(required(map, KEY_VERSIONS)?)
                    .map(str::to_string)
                    .collect();
                let features = split_list(required(map, KEY_FEATURES)?)
                    .map(|name| name.parse::<Feature>())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Envelope::Capabilities(CapabilityDescriptor {
                    tool: tool.to_string(),
                    versions,
                    features,
                }))
            }
            Some("true") => {
                reject_foreign_keys(map, &[KEY_OK, KEY_VERSION, KEY_DATA], "success")?;
                let version = required(map, KEY_VERSION)?;
                let data = map
                    .get(KEY_DATA)
                    .map(|raw| serde_json::from_str(raw))
                    .transpose()
                    .map_err(|e| ProtoError::Serialization(e.to_string()))?;
                Ok(Envelope::Success(SuccessEnvelope {
                    version: version.to_string(),
                    data,
                }))
            }
            Some("false") => {
                reject_foreign_keys(map, &[KEY_OK, KEY_VERSION, KEY_ERROR], "error")?;
                let version = required(map, KEY_VERSION)?;
                let (code, message) = ErrorEnvelope::parse_error_field(required(map, KEY_ERROR)?)?;
                Ok(Envelope::Error(ErrorEnvelope {
                    version: version.to_string(),
                    code,
                    message,
                }))
            }
            Some(other) => Err(ProtoError::InvalidOkFlag(other.to_string())),
        }
    }
}

/// Fails on the first key that the detected envelope shape does not carry.
fn reject_foreign_keys(
    map: &FlatMap,
    allowed: &[&str],
    shape: &'static str,
) -> Result<(), ProtoError> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(field) => Err(ProtoError::UnexpectedField {
            field: field.clone(),
            shape,
        }),
        None => Ok(()),
    }
}

impl From<CapabilityDescriptor> for Envelope {
    fn from(caps: CapabilityDescriptor) -> Self {
        Envelope::Capabilities(caps)
    }
}

impl From<SuccessEnvelope> for Envelope {
    fn from(success: SuccessEnvelope) -> Self {
        Envelope::Success(success)
    }
}

impl From<ErrorEnvelope> for Envelope {
    fn from(error: ErrorEnvelope) -> Self {
        Envelope::Error(error)
    }
}

fn required<'a>(map: &'a FlatMap, key: &str) -> Result<&'a str, ProtoError> {
    map.get(key)
        .map(String::as_str)
        .ok_or_else(|| ProtoError::MissingField(key.to_string()))
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Returns the template adapter's capability descriptor.
pub fn capabilities() -> Envelope {
    CapabilityDescriptor::new(TEMPLATE_TOOL_NAME, Feature::all().to_vec()).into()
}

/// Returns a bare success envelope.
pub fn ok() -> Envelope {
    SuccessEnvelope::new().into()
}

/// Returns a success envelope carrying `data`.
pub fn ok_with(data: Value) -> Envelope {
    SuccessEnvelope::with_data(data).into()
}

/// Returns an error envelope. Never fails, even for malformed input.
pub fn err(code: impl Into<String>, message: impl Into<String>) -> Envelope {
    let error = ErrorEnvelope::new(code, message);
    if error.has_ambiguous_code() {
        warn!(code = %error.code, "Error code contains ':'; the wire field will not split back cleanly");
    }
    error.into()
}
