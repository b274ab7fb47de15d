//! Configuration management for Aula.
//!
//! Configuration is loaded in order of precedence:
//! 1. Defaults
//! 2. Config file (~/.aula/config.toml)
//! 3. Environment variables
//! 4. CLI flags (handled at CLI layer)

use crate::guide::GuideTemplate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Completion API configuration (Perplexity-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,

    /// Bearer credential; usually supplied through PERPLEXITY_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Overrides the built-in academic system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Ask the provider to search the web for plain chat questions
    #[serde(default)]
    pub web_search: bool,
}

fn default_completion_endpoint() -> String {
    "https://api.perplexity.ai/chat/completions".to_string()
}

fn default_model() -> String {
    "sonar".to_string()
}

fn default_max_tokens() -> u32 {
    1200
}

fn default_temperature() -> f32 {
    0.4
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_completion_endpoint(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            system_prompt: None,
            web_search: false,
        }
    }
}

/// Scholarly search configuration (SerpApi Google Scholar engine)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScholarConfig {
    #[serde(default = "default_scholar_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_engine")]
    pub engine: String,

    /// Usually supplied through SERPAPI_KEY
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Interface language sent as `hl`
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_scholar_endpoint() -> String {
    "https://serpapi.com/search.json".to_string()
}

fn default_engine() -> String {
    "google_scholar".to_string()
}

fn default_max_results() -> u32 {
    5
}

fn default_language() -> String {
    "es".to_string()
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            endpoint: default_scholar_endpoint(),
            engine: default_engine(),
            api_key: None,
            max_results: default_max_results(),
            language: default_language(),
        }
    }
}

/// AI-detection auxiliary endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_detector_endpoint")]
    pub endpoint: String,
}

fn default_detector_endpoint() -> String {
    "http://localhost:3001/api/zerogpt".to_string()
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_detector_endpoint(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Guide catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidesConfig {
    /// Directory that relative guide sources resolve against
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default = "GuideTemplate::defaults")]
    pub templates: Vec<GuideTemplate>,
}

impl Default for GuidesConfig {
    fn default() -> Self {
        Self {
            dir: None,
            templates: GuideTemplate::defaults(),
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub scholar: ScholarConfig,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub guides: GuidesConfig,
}

impl Config {
    /// Returns the default Aula configuration directory (~/.aula)
    pub fn aula_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".aula"))
    }

    /// Returns the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        Self::aula_dir().map(|d| d.join("config.toml"))
    }

    /// Returns the default chat history database path
    pub fn default_history_path() -> Option<PathBuf> {
        Self::aula_dir().map(|d| d.join("history.db"))
    }

    /// Returns the directory guide PDFs are looked up in
    pub fn guides_dir(&self) -> Option<PathBuf> {
        self.guides
            .dir
            .clone()
            .or_else(|| Self::aula_dir().map(|d| d.join("guides")))
    }

    /// Load configuration from the default path with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::default_config_path() {
            Some(path) if path.exists() => Self::load_from_file(&path)?,
            _ => Config::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Defaults plus environment overrides, for when the config file is unusable
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("AULA_MODEL") {
            self.completion.model = model;
        }

        if let Ok(port) = std::env::var("AULA_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(host) = std::env::var("AULA_HOST") {
            self.server.host = host;
        }

        if let Ok(level) = std::env::var("AULA_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(url) = std::env::var("AULA_DETECTOR_URL") {
            self.detector.endpoint = url;
        }

        // Provider keys keep their conventional names
        if let Ok(key) = std::env::var("PERPLEXITY_API_KEY") {
            self.completion.api_key = Some(key);
        }

        if let Ok(key) = std::env::var("SERPAPI_KEY") {
            self.scholar.api_key = Some(key);
        }
    }

    /// Check invariants the rest of the crate relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        for template in &self.guides.templates {
            if template.section_titles.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "guide '{}' has no section titles",
                    template.id
                )));
            }
        }
        if self.scholar.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "scholar.max_results must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(path) = Self::default_config_path() {
            self.save_to_file(&path)
        } else {
            Err(ConfigError::ValidationError(
                "Could not determine config path".to_string(),
            ))
        }
    }

    /// Save configuration to a specific file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get the server URL
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server.host, self.server.port)
    }

    /// Ensure the Aula directory and subdirectories exist
    pub fn ensure_dirs() -> std::io::Result<()> {
        if let Some(aula_dir) = Self::aula_dir() {
            std::fs::create_dir_all(&aula_dir)?;
            std::fs::create_dir_all(aula_dir.join("guides"))?;
        }
        Ok(())
    }
}

/// Mask a secret for display, keeping only its last four characters
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{}", tail)
}
