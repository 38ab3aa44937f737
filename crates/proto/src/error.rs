use thiserror::Error;

use crate::envelope::codes;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading/validation error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Tool dispatch/execution error.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Envelope/wire-format error.
    #[error("Proto error: {0}")]
    Proto(#[from] ProtoError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value and reason.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Filesystem read error.
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(String),
}

/// Tool execution errors
#[derive(Debug, Error)]
pub enum ToolError {
    /// Request is not a JSON object or fails its schema.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Tool arguments are missing or have the wrong type.
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// No handler is able to serve the request.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Tool operation failed.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Filesystem IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Envelope error code reported to the caller for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::InvalidRequest(_) => codes::E_SCHEMA,
            ToolError::InvalidArgs(_) => codes::E_ARGS,
            ToolError::NotFound(_) => codes::E_NOT_FOUND,
            ToolError::ExecutionFailed(_) | ToolError::Io(_) => codes::E_RUNTIME,
        }
    }

    /// Message placed after the code in the error envelope.
    ///
    /// Unlike `Display`, this omits the variant prefix since the code
    /// already classifies the failure.
    pub fn envelope_message(&self) -> String {
        match self {
            ToolError::InvalidRequest(msg)
            | ToolError::InvalidArgs(msg)
            | ToolError::NotFound(msg)
            | ToolError::ExecutionFailed(msg) => msg.clone(),
            ToolError::Io(e) => e.to_string(),
        }
    }
}

/// Envelope and wire-format errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtoError {
    /// A key required by the envelope shape is absent.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// `ok` is neither `"true"` nor `"false"`.
    #[error("Invalid ok flag: {0}")]
    InvalidOkFlag(String),

    /// `error` has no colon separating code from message.
    #[error("Malformed error field: {0}")]
    MalformedErrorField(String),

    /// A key that the envelope shape forbids is present.
    #[error("Unexpected field '{field}' in {shape} envelope")]
    UnexpectedField { field: String, shape: &'static str },

    /// Feature name outside the known set.
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// Wire format name outside the known set.
    #[error("Unknown wire format: {0}")]
    UnknownFormat(String),

    /// Generic serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}
