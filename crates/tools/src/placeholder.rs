//! Placeholder handler for the tool template.

use async_trait::async_trait;
use proto::{SuccessEnvelope, TEMPLATE_TOOL_NAME, ToolError, ToolRequest};

use crate::ToolHandler;

/// Handler that accepts any request object and acknowledges it.
///
/// Stands in for real tool logic until a concrete handler is plugged in.
pub struct PlaceholderTool {
    name: String,
}

impl PlaceholderTool {
    /// Creates the placeholder under the template tool name.
    pub fn new() -> Self {
        Self::named(TEMPLATE_TOOL_NAME)
    }

    /// Creates the placeholder under a custom tool name.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for PlaceholderTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for PlaceholderTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Template tool that acknowledges every request without side effects."
    }

    fn request_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object" })
    }

    async fn handle(&self, _request: &ToolRequest) -> Result<SuccessEnvelope, ToolError> {
        Ok(SuccessEnvelope::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_acknowledges_any_object() {
        let tool = PlaceholderTool::new();
        let request = ToolRequest::from_value(serde_json::json!({"x": 1})).expect("object");
        let result = tool.handle(&request).await.expect("placeholder never fails");
        assert_eq!(result, SuccessEnvelope::new());
    }

    #[test]
    fn metadata_is_stable() {
        let tool = PlaceholderTool::default();
        assert_eq!(tool.name(), "custom-tool-template");
        assert!(tool.description().contains("Template"));
        assert_eq!(tool.request_schema()["type"], "object");
        assert_eq!(PlaceholderTool::named("other").name(), "other");
    }
}
