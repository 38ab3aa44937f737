//! Tool handler trait, built-in handlers, and the dispatching adapter.
//!
//! Hosts wrap a [`ToolHandler`] in an [`Adapter`], which turns raw JSON
//! requests into envelopes: validation, idempotent replay and error
//! mapping happen there so handlers only carry the tool's own logic.

pub mod adapter;
pub mod idempotency;
pub mod placeholder;
pub mod scaffold;
pub mod validation;

pub use adapter::Adapter;
pub use idempotency::{IdempotencyStore, InMemoryIdempotencyStore};
pub use placeholder::PlaceholderTool;
pub use scaffold::SchemaScaffoldTool;
pub use validation::{RequestValidator, ValidationFailure};

use async_trait::async_trait;
use proto::{CapabilityDescriptor, Envelope, Feature, SuccessEnvelope, ToolError, ToolRequest};

/// Trait that all tools must implement
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Tool name advertised in capabilities.
    fn name(&self) -> &str;
    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;
    /// JSON schema for accepted requests.
    fn request_schema(&self) -> serde_json::Value;
    /// Adapter features this tool supports.
    fn features(&self) -> Vec<Feature> {
        Feature::all().to_vec()
    }
    /// Capability descriptor built from name and features.
    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new(self.name(), self.features())
    }
    /// Performs the tool's effect for an already-validated request.
    async fn handle(&self, request: &ToolRequest) -> Result<SuccessEnvelope, ToolError>;
}

/// Dispatches `request` to the placeholder tool.
///
/// Any object request yields the same envelope as [`proto::ok`].
pub async fn handle(request: serde_json::Value) -> Envelope {
    Adapter::new(PlaceholderTool::new()).handle(request).await
}
