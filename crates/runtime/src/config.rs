//! Configuration management
//!
//! One `Config` is built at startup (file, then environment overrides, then
//! validation) and handed by reference to the components that need it. The
//! workflow itself never reads the environment.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub use crate::types::ConfigError;

use crate::reasoning::retry::DEFAULT_MAX_ATTEMPTS;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP service configuration
    pub api: ApiConfig,
    /// Outbound chat-completions backend
    pub llm: LlmConfig,
    /// Answer-and-reflect workflow
    pub workflow: WorkflowConfig,
    /// Prompt catalog location
    pub prompts: PromptsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Allowed CORS origins; `*` allows any, empty disables CORS
    pub cors_origins: Vec<String>,
    /// Attach the request tracing layer
    pub enable_tracing: bool,
}

/// Outbound backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend API key (never serialized)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Model identifier used for every call
    pub model: String,
    /// HTTP client timeout in seconds
    pub timeout_seconds: u64,
    /// Optional completion token cap
    pub max_tokens: Option<u32>,
    /// Optional sampling temperature
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Attempts per stage, at least 1
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// YAML prompt catalog
    pub path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8087,
            cors_origins: Vec::new(),
            enable_tracing: true,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 60,
            max_tokens: None,
            temperature: None,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("prompts/prompts.yaml"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }

    /// File (when given) or defaults, then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                self.llm.api_key = Some(key);
            }
        }

        if let Ok(base_url) = env::var("OPENAI_BASE_URL") {
            self.llm.base_url = base_url;
        }

        if let Ok(model) = env::var("SELFGRADE_MODEL") {
            self.llm.model = model;
        }

        if let Ok(attempts) = env::var("SELFGRADE_MAX_ATTEMPTS") {
            self.workflow.max_attempts =
                attempts.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "SELFGRADE_MAX_ATTEMPTS".to_string(),
                    reason: "Must be a positive integer".to_string(),
                })?;
        }

        if let Ok(path) = env::var("SELFGRADE_PROMPTS") {
            self.prompts.path = PathBuf::from(path);
        }

        if let Ok(host) = env::var("API_HOST") {
            self.api.host = host;
        }

        if let Ok(port) = env::var("API_PORT") {
            self.api.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                reason: "Invalid port number".to_string(),
            })?;
        }

        if let Ok(origins) = env::var("CORS_ORIGINS") {
            self.api.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "api.port".to_string(),
                reason: "Port cannot be 0".to_string(),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                reason: format!("Must be one of: {}", valid_levels.join(", ")),
            });
        }

        if self.workflow.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "workflow.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "llm.model".to_string(),
                reason: "Model identifier cannot be empty".to_string(),
            });
        }

        if !(self.llm.base_url.starts_with("http://") || self.llm.base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidValue {
                key: "llm.base_url".to_string(),
                reason: "Must be an http:// or https:// URL".to_string(),
            });
        }

        if self.llm.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "llm.timeout_seconds".to_string(),
                reason: "Timeout must be > 0".to_string(),
            });
        }

        if self.prompts.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "prompts.path".to_string(),
            });
        }

        Ok(())
    }

    /// Get the backend API key securely
    pub fn llm_api_key(&self) -> Result<&str, ConfigError> {
        self.llm
            .api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "OPENAI_API_KEY".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const ENV_KEYS: [&str; 9] = [
        "OPENAI_API_KEY",
        "OPENAI_BASE_URL",
        "SELFGRADE_MODEL",
        "SELFGRADE_MAX_ATTEMPTS",
        "SELFGRADE_PROMPTS",
        "API_HOST",
        "API_PORT",
        "CORS_ORIGINS",
        "LOG_LEVEL",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.port, 8087);
        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.workflow.max_attempts, 3);
        assert_eq!(config.prompts.path, PathBuf::from("prompts/prompts.yaml"));
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        clear_env();
        env::set_var("API_PORT", "9090");
        env::set_var("API_HOST", "0.0.0.0");
        env::set_var("LOG_LEVEL", "debug");
        env::set_var("SELFGRADE_MODEL", "gpt-4o");
        env::set_var("SELFGRADE_MAX_ATTEMPTS", "5");
        env::set_var("CORS_ORIGINS", "http://localhost:3000, https://example.com,");
        env::set_var("OPENAI_API_KEY", "sk-env");

        let config = Config::from_env().unwrap();
        assert_eq!(config.api.port, 9090);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.workflow.max_attempts, 5);
        assert_eq!(
            config.api.cors_origins,
            vec!["http://localhost:3000", "https://example.com"]
        );
        assert_eq!(config.llm_api_key().unwrap(), "sk-env");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_from_env_invalid_port() {
        clear_env();
        env::set_var("API_PORT", "invalid");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "API_PORT"
        ));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_zero_attempts_rejected_on_load() {
        clear_env();
        env::set_var("SELFGRADE_MAX_ATTEMPTS", "0");
        assert!(Config::load(None).is_err());
        clear_env();
    }

    #[test]
    fn test_invalid_port() {
        let mut config = Config::default();
        config.api.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.llm.base_url = "api.openai.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_missing() {
        let config = Config::default();
        assert!(matches!(
            config.llm_api_key(),
            Err(ConfigError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("sk-secret"));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[llm]\nmodel = \"gpt-4o\"\n\n[workflow]\nmax_attempts = 2\n\n[logging]\nformat = \"json\""
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.timeout_seconds, 60);
        assert_eq!(config.workflow.max_attempts, 2);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.api.port, 8087);
    }

    #[test]
    fn test_from_file_missing() {
        assert!(matches!(
            Config::from_file("/nonexistent/selfgrade.toml"),
            Err(ConfigError::IoError { .. })
        ));
    }
}
