//! Configuration loading and management for profile-summary.
//!
//! Loads settings from `profile-summary.toml` with environment variable overrides for the
//! Groq credentials. The resulting [`Config`] is built once at startup and handed to the
//! server explicitly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for in the working directory and the user config dir
pub const CONFIG_FILE_NAME: &str = "profile-summary.toml";

pub const DEFAULT_MODEL: &str = "llama-3.1-70b-versatile";
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_SCENARIOS_PATH: &str = "scenarios.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("missing Groq API key")]
    MissingApiKey,
}

/// Groq chat-completion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroqConfig {
    /// Bearer token; usually supplied through `GROQ_API_KEY` instead of the file
    pub api_key: Option<String>,
    /// Model identifier sent with every request
    pub model: String,
    /// Full URL of the chat-completions endpoint
    pub api_url: String,
    /// Whole-request timeout for the upstream call
    pub timeout_secs: u64,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

/// Location of the read-only scenario table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub scenarios_path: PathBuf,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub groq: GroqConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
}

impl Config {
    /// Load configuration from the default location, falling back to defaults when no
    /// file exists. Environment overrides are applied either way.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::read_file(&path)?,
            None => Config::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env();
        Ok(config)
    }

    /// Parse configuration from TOML text without touching the environment
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("GROQ_API_KEY").ok(),
            std::env::var("GROQ_MODEL").ok(),
        );
    }

    /// Blank overrides are ignored so an empty variable cannot erase a configured value
    fn apply_overrides(&mut self, api_key: Option<String>, model: Option<String>) {
        if let Some(key) = api_key.filter(|key| !key.trim().is_empty()) {
            self.groq.api_key = Some(key);
        }
        if let Some(model) = model.filter(|model| !model.trim().is_empty()) {
            self.groq.model = model;
        }
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from(CONFIG_FILE_NAME);
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        if let Some(home) = dirs::home_dir() {
            let home_config = home
                .join(".config")
                .join("profile-summary")
                .join(CONFIG_FILE_NAME);
            if home_config.exists() {
                return Some(home_config);
            }
        }

        None
    }

    /// Get the Groq API key; blank keys count as missing
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.groq
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            scenarios_path: PathBuf::from(DEFAULT_SCENARIOS_PATH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.groq.model, DEFAULT_MODEL);
        assert_eq!(config.groq.api_url, DEFAULT_API_URL);
        assert_eq!(config.groq.timeout_secs, 60);
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.data.scenarios_path, PathBuf::from("scenarios.json"));
        assert!(config.groq.api_key.is_none());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::from_toml(
            r#"
[groq]
api_key = "gsk_test"
model = "llama-3.3-70b-versatile"

[data]
scenarios_path = "/srv/inbox/scenarios.json"
"#,
        )
        .unwrap();
        assert_eq!(config.api_key().unwrap(), "gsk_test");
        assert_eq!(config.groq.model, "llama-3.3-70b-versatile");
        assert_eq!(config.groq.api_url, DEFAULT_API_URL);
        assert_eq!(
            config.data.scenarios_path,
            PathBuf::from("/srv/inbox/scenarios.json")
        );
    }

    #[test]
    fn blank_api_key_is_missing() {
        let config = Config::from_toml("[groq]\napi_key = \"   \"\n").unwrap();
        assert!(matches!(config.api_key(), Err(ConfigError::MissingApiKey)));

        let config = Config::default();
        assert!(matches!(config.api_key(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn load_from_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn blank_overrides_keep_file_values() {
        let mut config =
            Config::from_toml("[groq]\napi_key = \"gsk_file\"\nmodel = \"file-model\"\n").unwrap();

        config.apply_overrides(Some(String::new()), Some("  ".to_string()));
        assert_eq!(config.api_key().unwrap(), "gsk_file");
        assert_eq!(config.groq.model, "file-model");

        config.apply_overrides(Some("gsk_env".to_string()), Some("env-model".to_string()));
        assert_eq!(config.api_key().unwrap(), "gsk_env");
        assert_eq!(config.groq.model, "env-model");

        config.apply_overrides(None, None);
        assert_eq!(config.api_key().unwrap(), "gsk_env");
    }

    #[test]
    fn load_from_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[groq\nmodel = ").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
