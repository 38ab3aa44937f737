use proto::{ConfigError, WireFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tools::scaffold::DEFAULT_SCHEMAS_DIR;
use tracing::debug;

/// Config file name looked up in the working directory.
const LOCAL_CONFIG_FILE: &str = "custom-tool.toml";

/// Which handler the adapter wraps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    /// Acknowledges every request. Default.
    #[default]
    Placeholder,
    /// Creates stub request schemas under `tool.schemas_dir`.
    SchemaScaffold,
}

impl ToolKind {
    /// Returns the config/env spelling of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Placeholder => "placeholder",
            Self::SchemaScaffold => "schema-scaffold",
        }
    }
}

impl std::str::FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "placeholder" => Ok(Self::Placeholder),
            "schema-scaffold" | "scaffold" => Ok(Self::SchemaScaffold),
            other => Err(format!("unknown tool kind '{other}'")),
        }
    }
}

/// Handler selection and handler-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Handler to dispatch to.
    pub kind: ToolKind,
    /// Output directory for the schema scaffold tool.
    pub schemas_dir: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            kind: ToolKind::default(),
            schemas_dir: DEFAULT_SCHEMAS_DIR.to_string(),
        }
    }
}

/// Adapter behaviour toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Check requests against the tool schema before dispatch.
    pub validate: bool,
    /// Replay envelopes for repeated idempotency keys.
    pub idempotency: bool,
    /// Lifetime of idempotency entries in seconds; 0 keeps them for the process lifetime.
    pub idempotency_ttl_secs: u64,
    /// Upper bound on remembered idempotency keys; 0 removes the bound.
    pub idempotency_max_entries: usize,
    /// Envelope rendering written to stdout.
    pub format: WireFormat,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            validate: true,
            idempotency: true,
            idempotency_ttl_secs: 0,
            idempotency_max_entries: 10_000,
            format: WireFormat::Flat,
        }
    }
}

impl AdapterConfig {
    /// Returns the idempotency TTL, or `None` when entries never expire.
    pub fn idempotency_ttl(&self) -> Option<Duration> {
        (self.idempotency_ttl_secs > 0).then(|| Duration::from_secs(self.idempotency_ttl_secs))
    }
}

/// Top-level CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Handler configuration.
    #[serde(default)]
    pub tool: ToolConfig,

    /// Adapter configuration.
    #[serde(default)]
    pub adapter: AdapterConfig,
}

impl Config {
    /// Loads configuration from explicit path, fallback locations, and env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(|p| p.to_path_buf()).or_else(|| {
            let cwd = std::env::current_dir().ok()?.join(LOCAL_CONFIG_FILE);
            if cwd.exists() {
                return Some(cwd);
            }
            let home = std::env::var("HOME").ok()?;
            let home_config = PathBuf::from(home).join(".custom-tool").join("config.toml");
            if home_config.exists() {
                return Some(home_config);
            }
            None
        });
        debug!(path = ?config_path, "Config file resolved");

        let mut config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(&path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(|e| ConfigError::Toml(e.to_string()))?
        } else {
            Config::default()
        };

        config.apply_env_overrides()?;

        debug!(
            kind = config.tool.kind.name(),
            validate = config.adapter.validate,
            idempotency = config.adapter.idempotency,
            format = %config.adapter.format,
            "Config loaded"
        );
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(kind) = std::env::var("CUSTOM_TOOL_KIND") {
            self.tool.kind = kind.parse().map_err(|reason| ConfigError::InvalidValue {
                field: "CUSTOM_TOOL_KIND".to_string(),
                reason,
            })?;
        }
        if let Ok(dir) = std::env::var("CUSTOM_TOOL_SCHEMAS_DIR") {
            self.tool.schemas_dir = dir;
        }
        if let Ok(format) = std::env::var("CUSTOM_TOOL_FORMAT") {
            self.adapter.format = format.parse().map_err(|e: proto::ProtoError| {
                ConfigError::InvalidValue {
                    field: "CUSTOM_TOOL_FORMAT".to_string(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let Ok(validate) = std::env::var("CUSTOM_TOOL_VALIDATE") {
            self.adapter.validate = validate.parse().map_err(|_| ConfigError::InvalidValue {
                field: "CUSTOM_TOOL_VALIDATE".to_string(),
                reason: format!("expected true or false, got '{validate}'"),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::with_locked_env;

    const ENV_KEYS: [&str; 4] = [
        "CUSTOM_TOOL_KIND",
        "CUSTOM_TOOL_SCHEMAS_DIR",
        "CUSTOM_TOOL_FORMAT",
        "CUSTOM_TOOL_VALIDATE",
    ];

    fn cleared_env() -> Vec<(&'static str, Option<&'static str>)> {
        ENV_KEYS.iter().map(|key| (*key, None)).collect()
    }

    fn write_file(path: &Path, content: &str) {
        std::fs::write(path, content).expect("write config file");
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = Config::default();
        assert_eq!(cfg.tool.kind, ToolKind::Placeholder);
        assert_eq!(cfg.tool.schemas_dir, "schemas/tools");
        assert!(cfg.adapter.validate);
        assert!(cfg.adapter.idempotency);
        assert_eq!(cfg.adapter.idempotency_ttl(), None);
        assert_eq!(cfg.adapter.idempotency_max_entries, 10_000);
        assert_eq!(cfg.adapter.format, WireFormat::Flat);
    }

    #[test]
    fn load_reads_explicit_file_path() {
        with_locked_env(&cleared_env(), || {
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("config.toml");
            write_file(
                &config_path,
                r#"
[tool]
kind = "schema-scaffold"
schemas_dir = "/tmp/schemas"

[adapter]
validate = false
idempotency = false
idempotency_ttl_secs = 90
idempotency_max_entries = 50
format = "structured"
"#,
            );
            let cfg = Config::load(Some(&config_path)).expect("config should parse");
            assert_eq!(cfg.tool.kind, ToolKind::SchemaScaffold);
            assert_eq!(cfg.tool.schemas_dir, "/tmp/schemas");
            assert!(!cfg.adapter.validate);
            assert!(!cfg.adapter.idempotency);
            assert_eq!(cfg.adapter.idempotency_ttl(), Some(Duration::from_secs(90)));
            assert_eq!(cfg.adapter.idempotency_max_entries, 50);
            assert_eq!(cfg.adapter.format, WireFormat::Structured);
        });
    }

    #[test]
    fn partial_sections_keep_defaults() {
        with_locked_env(&cleared_env(), || {
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("config.toml");
            write_file(&config_path, "[adapter]\nidempotency = false\n");
            let cfg = Config::load(Some(&config_path)).expect("config should parse");
            assert!(cfg.adapter.validate);
            assert!(!cfg.adapter.idempotency);
            assert_eq!(cfg.tool.kind, ToolKind::Placeholder);
        });
    }

    #[test]
    fn load_returns_toml_error_for_invalid_content() {
        with_locked_env(&cleared_env(), || {
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("config.toml");
            write_file(&config_path, "[tool\nkind = \"broken\"");
            let err = Config::load(Some(&config_path)).expect_err("invalid toml must fail");
            assert!(err.to_string().contains("TOML parse error"));
        });
    }

    #[test]
    fn load_rejects_unknown_kind_in_file() {
        with_locked_env(&cleared_env(), || {
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("config.toml");
            write_file(&config_path, "[tool]\nkind = \"shell\"\n");
            let err = Config::load(Some(&config_path)).expect_err("unknown kind must fail");
            assert!(matches!(err, ConfigError::Toml(_)));
        });
    }

    #[test]
    fn load_missing_explicit_file_is_io_error() {
        with_locked_env(&cleared_env(), || {
            let tmp = tempfile::tempdir().expect("tempdir");
            let err = Config::load(Some(&tmp.path().join("absent.toml")))
                .expect_err("missing file must fail");
            assert!(matches!(err, ConfigError::Io(_)));
        });
    }

    #[test]
    fn load_applies_env_overrides() {
        let vars = [
            ("CUSTOM_TOOL_KIND", Some("scaffold")),
            ("CUSTOM_TOOL_SCHEMAS_DIR", Some("/tmp/env-schemas")),
            ("CUSTOM_TOOL_FORMAT", Some("structured")),
            ("CUSTOM_TOOL_VALIDATE", Some("false")),
        ];
        with_locked_env(&vars, || {
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("config.toml");
            write_file(&config_path, "[tool]\nkind = \"placeholder\"\n");
            let cfg = Config::load(Some(&config_path)).expect("config load");
            assert_eq!(cfg.tool.kind, ToolKind::SchemaScaffold);
            assert_eq!(cfg.tool.schemas_dir, "/tmp/env-schemas");
            assert_eq!(cfg.adapter.format, WireFormat::Structured);
            assert!(!cfg.adapter.validate);
        });
    }

    #[test]
    fn invalid_env_values_are_reported() {
        let cases = [
            ("CUSTOM_TOOL_KIND", "shell"),
            ("CUSTOM_TOOL_FORMAT", "xml"),
            ("CUSTOM_TOOL_VALIDATE", "maybe"),
        ];
        for (key, value) in cases {
            let mut vars = cleared_env();
            vars.retain(|(k, _)| *k != key);
            vars.push((key, Some(value)));
            with_locked_env(&vars, || {
                let tmp = tempfile::tempdir().expect("tempdir");
                let config_path = tmp.path().join("config.toml");
                write_file(&config_path, "");
                let err = Config::load(Some(&config_path)).expect_err("invalid env must fail");
                match err {
                    ConfigError::InvalidValue { field, .. } => assert_eq!(field, key),
                    other => panic!("unexpected error: {other}"),
                }
            });
        }
    }

    #[test]
    fn tool_kind_from_str_and_names_are_stable() {
        assert_eq!(
            "placeholder".parse::<ToolKind>().ok(),
            Some(ToolKind::Placeholder)
        );
        assert_eq!(
            "Schema-Scaffold".parse::<ToolKind>().ok(),
            Some(ToolKind::SchemaScaffold)
        );
        assert!("shell".parse::<ToolKind>().is_err());
        assert_eq!(ToolKind::Placeholder.name(), "placeholder");
        assert_eq!(ToolKind::SchemaScaffold.name(), "schema-scaffold");
    }
}
