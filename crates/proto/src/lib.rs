//! Envelope protocol types for the custom tool adapter.
//!
//! This crate defines the capability/success/error envelopes, their flat
//! and structured wire renderings, the inbound request type, and the
//! strongly-typed error enums shared across the workspace.

pub mod envelope;
pub mod error;
pub mod request;
pub mod wire;

/// Re-export of envelope types, constants and builders.
pub use envelope::{
    CapabilityDescriptor, Envelope, ErrorEnvelope, Feature, FlatMap, PROTOCOL_VERSION,
    SUPPORTED_VERSIONS, SuccessEnvelope, TEMPLATE_TOOL_NAME, capabilities, codes, err, ok,
    ok_with,
};
/// Re-export of all protocol error types.
pub use error::*;
/// Re-export of request identity types.
pub use request::{CallId, IDEMPOTENCY_KEY_FIELD, ToolRequest};
/// Re-export of wire format selection.
pub use wire::WireFormat;
