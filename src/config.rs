//! Configuration management with YAML support

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::assistant::OverlapPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub secrets: SecretsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub editors: HashMap<String, EditorConfig>,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub agents: AgentsConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

/// Secret key location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Falls back to `<data dir>/secret.key`
    #[serde(default)]
    pub key_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

/// Editor launcher configuration.
///
/// Entries named after a preset (`vscode`, `cursor`) override the preset's
/// search lists; any other name declares an additional editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub app_paths: Vec<String>,

    #[serde(default)]
    pub commands: Vec<String>,

    /// macOS application name for `open -a`
    #[serde(default)]
    pub mac_app_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub overlap: OverlapPolicy,

    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "default_capacity")]
    pub capacity_per_workspace: u32,
}

// Default value functions
fn default_database_path() -> String {
    "~/.local/share/devdesk/devdesk.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_capacity() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            capacity_per_workspace: default_capacity(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    /// Searches in order:
    /// 1. Provided path
    /// 2. ./devdesk.yaml (current directory)
    /// 3. ~/.config/devdesk/devdesk.yaml
    pub fn load(path: &str) -> Result<Self> {
        let search_paths = vec![
            shellexpand::tilde(path).to_string(),
            "devdesk.yaml".to_string(),
            shellexpand::tilde("~/.config/devdesk/devdesk.yaml").to_string(),
        ];

        for search_path in &search_paths {
            if std::path::Path::new(search_path).exists() {
                let content = std::fs::read_to_string(search_path)
                    .with_context(|| format!("reading config {}", search_path))?;
                let config: Config = serde_yaml::from_str(&content)
                    .with_context(|| format!("parsing config {}", search_path))?;
                return Ok(config);
            }
        }

        // No config file found, use defaults
        Ok(Config::default())
    }

    /// Get the database path, expanding ~ to home directory
    pub fn database_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.database.path).to_string();
        PathBuf::from(expanded)
    }

    /// Get the secret key path.
    ///
    /// Uses the platform data directory when not configured, and the
    /// database directory when no data directory can be determined.
    pub fn key_path(&self) -> PathBuf {
        if let Some(path) = &self.secrets.key_path {
            return PathBuf::from(shellexpand::tilde(path).to_string());
        }
        match directories::ProjectDirs::from("dev", "devdesk", "devdesk") {
            Some(dirs) => dirs.data_dir().join("secret.key"),
            None => self
                .database_path()
                .parent()
                .map(|p| p.join("secret.key"))
                .unwrap_or_else(|| PathBuf::from("secret.key")),
        }
    }

    /// Check if an editor is enabled; unconfigured editors are enabled
    pub fn is_editor_enabled(&self, editor_id: &str) -> bool {
        self.editors.get(editor_id).map_or(true, |e| e.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.agents.capacity_per_workspace, 5);
        assert_eq!(config.assistant.overlap, OverlapPolicy::Queue);
        assert!(config.is_editor_enabled("vscode"));
    }

    #[test]
    fn test_key_path_override() {
        let mut config = Config::default();
        config.secrets.key_path = Some("/tmp/devdesk/key".to_string());
        assert_eq!(config.key_path(), PathBuf::from("/tmp/devdesk/key"));
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
database:
  path: ~/.local/share/devdesk/test.db

logging:
  level: debug
  json: true

editors:
  cursor:
    enabled: false
  zed:
    display_name: Zed
    commands: [zed]
    app_paths: [/Applications/Zed.app]

assistant:
  overlap: reject

agents:
  capacity_per_workspace: 10
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.database.path, "~/.local/share/devdesk/test.db");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(!config.is_editor_enabled("cursor"));
        assert!(config.is_editor_enabled("zed"));
        assert_eq!(config.editors["zed"].commands, vec!["zed".to_string()]);
        assert_eq!(config.assistant.overlap, OverlapPolicy::Reject);
        assert_eq!(config.agents.capacity_per_workspace, 10);
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        let config = Config::load(missing.to_str().unwrap()).unwrap();
        assert_eq!(config.agents.capacity_per_workspace, 5);
    }
}
