//! Schema scaffold tool implementation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use proto::{CallId, SuccessEnvelope, ToolError, ToolRequest};
use tokio::fs;
use tracing::debug;

use crate::ToolHandler;

/// Default directory scaffolded schemas are written to.
pub const DEFAULT_SCHEMAS_DIR: &str = "schemas/tools";

const STUB_SCHEMA: &str =
    r#"{"$schema":"https://json-schema.org/draft/2020-12/schema","type":"object"}"#;

/// Tool that ensures a versioned request schema file exists for a named tool
pub struct SchemaScaffoldTool {
    schemas_dir: PathBuf,
}

impl SchemaScaffoldTool {
    /// Creates a scaffold tool writing under [`DEFAULT_SCHEMAS_DIR`].
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_SCHEMAS_DIR)
    }

    /// Creates a scaffold tool writing under `dir`.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            schemas_dir: dir.into(),
        }
    }

    /// Returns the directory schemas are written to.
    pub fn schemas_dir(&self) -> &Path {
        &self.schemas_dir
    }

    /// Path of the v1 schema file for `name`.
    fn schema_path(&self, name: &str) -> PathBuf {
        self.schemas_dir.join(format!("{name}.v1.json"))
    }
}

impl Default for SchemaScaffoldTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for SchemaScaffoldTool {
    fn name(&self) -> &str {
        "schema-scaffold"
    }

    fn description(&self) -> &str {
        "Create a stub JSON schema file for a tool if one does not exist yet. \
         Existing schema files are left untouched."
    }

    fn request_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Tool name; the schema is written to <schemas_dir>/<name>.v1.json"
                }
            },
            "required": ["name"]
        })
    }

    async fn handle(&self, request: &ToolRequest) -> Result<SuccessEnvelope, ToolError> {
        let name = request
            .get_str("name")
            .ok_or_else(|| ToolError::InvalidArgs("name must be a string".to_string()))?;
        check_name(name)?;

        let path = self.schema_path(name);
        fs::create_dir_all(&self.schemas_dir).await?;

        let staging = self
            .schemas_dir
            .join(format!(".{name}.v1.json.{}.tmp", CallId::new()));
        if publish_stub(&staging, &path).await? {
            debug!(path = %path.display(), "Created stub schema");
        } else {
            debug!(path = %path.display(), "Schema already exists");
        }

        Ok(SuccessEnvelope::with_data(serde_json::json!({
            "paths": [path.to_string_lossy()]
        })))
    }
}

/// Writes the stub to `staging` and links it to `path` unless `path` exists.
///
/// Returns false when another file already occupies `path`. The staging file
/// is always removed, so `path` is either absent or complete.
async fn publish_stub(staging: &Path, path: &Path) -> Result<bool, ToolError> {
    let linked = match fs::write(staging, STUB_SCHEMA).await {
        Ok(()) => fs::hard_link(staging, path).await,
        Err(e) => Err(e),
    };
    fs::remove_file(staging).await.ok();

    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Rejects names that would escape the schemas directory.
fn check_name(name: &str) -> Result<(), ToolError> {
    if name.is_empty() {
        return Err(ToolError::InvalidArgs("name must not be empty".to_string()));
    }
    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(ToolError::InvalidArgs(format!(
            "name must not contain path separators or '..': {name}"
        )));
    }
    Ok(())
}
