//! Application settings management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// General settings
    #[serde(default)]
    pub general: GeneralSettings,

    /// LLM settings
    #[serde(default)]
    pub llm: LlmSettings,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Data directory for the database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Store processed meetings and their action items
    #[serde(default = "default_true")]
    pub persist: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// LLM provider (groq, openai, gemini)
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// API key
    #[serde(default)]
    pub api_key: String,

    /// Model name (empty = provider default)
    #[serde(default)]
    pub model: String,

    /// API endpoint (empty = provider default)
    #[serde(default)]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Bearer token required on protected routes (empty = auth disabled)
    #[serde(default)]
    pub api_token: String,

    /// Source tag reported in response metadata
    #[serde(default = "default_source_name")]
    pub source_name: String,

    /// Allowed CORS origins ("*" = any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

// Default value functions

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", "takeaways", "takeaways")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.local/share/takeaways"))
}

fn default_true() -> bool {
    true
}

fn default_llm_provider() -> String {
    "groq".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_source_name() -> String {
    "takeaways".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            persist: true,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: String::new(),
            model: String::new(),
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
            temperature: 0.0,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            api_token: String::new(),
            source_name: default_source_name(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Settings {
    /// Load settings from the configuration file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!("No config file found, using defaults");
            let mut settings = Self::default();
            settings.apply_env_overrides();
            return Ok(settings);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        settings.apply_env_overrides();

        Ok(settings)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.llm.api_key.trim().is_empty() {
            if let Some(key) = var("TAKEAWAYS_LLM_API_KEY").or_else(|| var("GROQ_API_KEY")) {
                self.llm.api_key = key;
            }
        }

        if let Some(model) = var("TAKEAWAYS_LLM_MODEL") {
            self.llm.model = model;
        }

        if let Some(endpoint) = var("TAKEAWAYS_LLM_ENDPOINT") {
            self.llm.endpoint = endpoint;
        }

        if self.server.api_token.trim().is_empty() {
            if let Some(token) = var("TAKEAWAYS_API_TOKEN") {
                self.server.api_token = token;
            }
        }

        if let Some(source) = var("TAKEAWAYS_SOURCE_NAME") {
            self.server.source_name = source;
        }
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "takeaways", "takeaways")
            .context("Could not determine config directory")?;

        let config_dir = dirs.config_dir();
        Ok(config_dir.join("config.toml"))
    }

    /// Write default configuration to a file
    pub fn write_default(path: &PathBuf) -> Result<()> {
        let settings = Self::default();
        let content = toml::to_string_pretty(&settings)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the database path
    pub fn database_path(&self) -> PathBuf {
        self.general.data_dir.join("takeaways.db")
    }

    /// Timeout applied to each LLM request
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs.max(1))
    }

    /// Bearer token for the HTTP surface, if one is configured
    pub fn api_token(&self) -> Option<&str> {
        let token = self.server.api_token.trim();
        (!token.is_empty()).then_some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_to_groq_llama() {
        let settings = Settings::default();
        assert_eq!(settings.llm.provider, "groq");
        assert!(settings.llm.model.is_empty());
        assert_eq!(settings.llm.timeout_secs, 30);
        assert_eq!(settings.server.cors_origins, vec!["*".to_string()]);
        assert!(settings.api_token().is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [llm]
            provider = "gemini"

            [server]
            api_token = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(settings.llm.provider, "gemini");
        assert_eq!(settings.llm.timeout_secs, 30);
        assert_eq!(settings.api_token(), Some("secret"));
        assert!(settings.general.persist);
    }

    #[test]
    fn env_api_key_only_fills_empty_key() {
        let mut settings = Settings::default();
        settings.apply_overrides(lookup(&[("GROQ_API_KEY", "gsk_env")]));
        assert_eq!(settings.llm.api_key, "gsk_env");

        settings.apply_overrides(lookup(&[("TAKEAWAYS_LLM_API_KEY", "other")]));
        assert_eq!(settings.llm.api_key, "gsk_env");
    }

    #[test]
    fn env_overrides_model_and_source() {
        let mut settings = Settings::default();
        settings.apply_overrides(lookup(&[
            ("TAKEAWAYS_LLM_MODEL", "llama-3.3-70b-versatile"),
            ("TAKEAWAYS_SOURCE_NAME", "SpeakSpace"),
            ("TAKEAWAYS_API_TOKEN", "  "),
        ]));

        assert_eq!(settings.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(settings.server.source_name, "SpeakSpace");
        assert!(settings.api_token().is_none());
    }
}
