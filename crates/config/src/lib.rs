//! Configuration loading, validation, and management for AgriShield.
//!
//! Loads configuration from `~/.agrishield/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use agrishield_core::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.agrishield/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Generative-language backend
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model requested from the backend
    #[serde(default = "default_model")]
    pub model: String,

    /// Generation limits sent with every request
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Relay behavior
    #[serde(default)]
    pub relay: RelayConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Weather source configuration
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-1.5-flash".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("generation", &self.generation)
            .field("relay", &self.relay)
            .field("gateway", &self.gateway)
            .field("weather", &self.weather)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Omitted = backend default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

fn default_max_output_tokens() -> u32 {
    1000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: default_max_output_tokens(),
            temperature: None,
        }
    }
}

/// How the policy prompt reaches the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimingStrategy {
    /// A scripted policy turn + acknowledgment at the head of the history.
    #[default]
    ScriptedHistory,
    /// The backend's dedicated system-instruction field, on every request.
    SystemInstruction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub priming: PrimingStrategy,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Used when the requested language is empty or unsupported.
    #[serde(default = "default_fallback_language")]
    pub fallback_language: String,

    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: u64,

    /// Extra attempts on retryable backend errors (0 = no retry decorator).
    #[serde(default)]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_request_timeout_secs() -> u64 {
    60
}
fn default_fallback_language() -> String {
    "English".into()
}
fn default_max_message_chars() -> usize {
    4000
}
fn default_max_sessions() -> usize {
    1_000
}
fn default_session_idle_minutes() -> u64 {
    120
}
fn default_retry_backoff_ms() -> u64 {
    500
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            priming: PrimingStrategy::default(),
            request_timeout_secs: default_request_timeout_secs(),
            fallback_language: default_fallback_language(),
            max_message_chars: default_max_message_chars(),
            max_sessions: default_max_sessions(),
            session_idle_minutes: default_session_idle_minutes(),
            max_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl RelayConfig {
    /// The fallback language, parsed. Validation guarantees it is supported.
    pub fn fallback(&self) -> Language {
        Language::parse(&self.fallback_language).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// CORS origins allowed to call the API.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    3001
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:8080".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// "mock" or "open-meteo"
    #[serde(default = "default_weather_source")]
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

fn default_weather_source() -> String {
    "mock".into()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            source: default_weather_source(),
            api_url: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.agrishield/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `AGRISHIELD_API_KEY` (highest priority)
    /// - `GEMINI_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("AGRISHIELD_API_KEY")
                .ok()
                .or_else(|| std::env::var("GEMINI_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("AGRISHIELD_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("AGRISHIELD_MODEL") {
            config.model = model;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".agrishield")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.generation.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "generation.temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if self.generation.max_output_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_output_tokens must be > 0".into(),
            ));
        }

        if self.relay.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "relay.request_timeout_secs must be > 0".into(),
            ));
        }

        if Language::parse(&self.relay.fallback_language).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "relay.fallback_language '{}' is not a supported language",
                self.relay.fallback_language
            )));
        }

        if self.relay.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "relay.max_sessions must be > 0".into(),
            ));
        }

        if !matches!(self.weather.source.as_str(), "mock" | "open-meteo") {
            return Err(ConfigError::ValidationError(format!(
                "weather.source must be 'mock' or 'open-meteo', got '{}'",
                self.weather.source
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config, provider section, or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// The model to request: `[providers.<name>].model` if set, else `model`.
    pub fn resolved_model(&self) -> String {
        self.providers
            .get(&self.provider)
            .and_then(|p| p.model.clone())
            .unwrap_or_else(|| self.model.clone())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            model: default_model(),
            generation: GenerationConfig::default(),
            relay: RelayConfig::default(),
            gateway: GatewayConfig::default(),
            weather: WeatherConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.gateway.port, 3001);
        assert_eq!(config.generation.max_output_tokens, 1000);
        assert_eq!(config.relay.priming, PrimingStrategy::ScriptedHistory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.relay.priming, config.relay.priming);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            generation: GenerationConfig {
                temperature: Some(5.0),
                ..GenerationConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unsupported_fallback_language_rejected() {
        let result = AppConfig::from_toml(
            r#"
[relay]
fallback_language = "Esperanto"
"#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn unknown_weather_source_rejected() {
        let result = AppConfig::from_toml(
            r#"
[weather]
source = "almanac"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn parses_full_config() {
        let config = AppConfig::from_toml(
            r#"
provider = "openai"
model = "gpt-4o-mini"

[generation]
max_output_tokens = 512
temperature = 0.3

[relay]
priming = "system_instruction"
request_timeout_secs = 20
fallback_language = "Hindi"
max_retries = 2

[gateway]
port = 9000
allowed_origins = ["https://agrishield.example"]

[providers.openai]
api_url = "https://api.openai.com/v1"
"#,
        )
        .unwrap();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.generation.temperature, Some(0.3));
        assert_eq!(config.relay.priming, PrimingStrategy::SystemInstruction);
        assert_eq!(config.relay.fallback(), Language::Hindi);
        assert_eq!(config.relay.max_retries, 2);
        assert_eq!(config.gateway.port, 9000);
        assert!(config.providers.contains_key("openai"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().provider, "gemini");
    }

    #[test]
    fn load_from_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = \"gemini-1.5-pro\"\n").unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "gemini-1.5-pro");
    }

    #[test]
    fn parse_error_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [unclosed").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn debug_redacts_api_keys() {
        let mut config = AppConfig {
            api_key: Some("AIza-secret".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "gemini".into(),
            ProviderConfig {
                api_key: Some("AIza-other".into()),
                api_url: None,
                model: None,
            },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("AIza"));
        assert!(debug.contains("[REDACTED]"));
        assert!(config.has_api_key());
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemini"));
        assert!(toml_str.contains("3001"));
        assert!(toml_str.contains("scripted_history"));
    }

    #[test]
    fn provider_specific_model_wins() {
        let mut config = AppConfig::default();
        assert_eq!(config.resolved_model(), "gemini-1.5-flash");

        config.providers.insert(
            "gemini".into(),
            ProviderConfig {
                api_key: None,
                api_url: None,
                model: Some("gemini-2.0-flash".into()),
            },
        );
        assert_eq!(config.resolved_model(), "gemini-2.0-flash");
    }
}
