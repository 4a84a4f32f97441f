//! Configuration management for the itinerary planner
//!
//! Handles loading configuration from files, environment variables and a
//! `.env` file, and provides validation for all configuration settings.
//! The planning core never reads configuration itself; it receives the
//! resolved credentials and [`CallPolicy`] built here.

use crate::PlannerError;
use crate::orchestrator::CallPolicy;
use crate::sources::{GoogleCredentials, GroqSettings};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Google Maps Platform configuration
    pub google: GoogleConfig,
    /// Groq chat model configuration
    pub groq: GroqConfig,
    /// Timeout, retry and concurrency settings
    pub orchestrator: OrchestratorConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Google Maps Platform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// API key shared by Places, Weather and Air Quality
    pub api_key: Option<String>,
    pub places_base_url: String,
    pub weather_base_url: String,
    pub air_quality_base_url: String,
}

/// Groq settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroqConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Per-attempt timeout in milliseconds
    pub call_timeout_ms: u64,
    /// Retries for rate-limited or timed-out calls
    pub max_retries: u32,
    /// First retry delay in milliseconds
    pub base_backoff_ms: u64,
    /// Longest retry delay in milliseconds
    pub max_backoff_ms: u64,
    /// Calls in flight at once
    pub max_concurrent_calls: usize,
    /// Fail when no data source succeeded for any city
    pub reject_empty_itinerary: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

// Default value functions
fn default_places_base_url() -> String {
    "https://maps.googleapis.com/maps/api/place".to_string()
}

fn default_weather_base_url() -> String {
    "https://weather.googleapis.com/v1".to_string()
}

fn default_air_quality_base_url() -> String {
    "https://airquality.googleapis.com/v1".to_string()
}

fn default_groq_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_groq_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            places_base_url: default_places_base_url(),
            weather_base_url: default_weather_base_url(),
            air_quality_base_url: default_air_quality_base_url(),
        }
    }
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_groq_base_url(),
            model: default_groq_model(),
            temperature: 0.0,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let policy = CallPolicy::default();
        Self {
            call_timeout_ms: policy.call_timeout.as_millis() as u64,
            max_retries: policy.max_retries,
            base_backoff_ms: policy.base_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            max_concurrent_calls: policy.max_concurrent_calls,
            reject_empty_itinerary: policy.reject_empty_itinerary,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    ///
    /// Sources, lowest priority first: the TOML file, `ITINERAI__*`
    /// variables (e.g. `ITINERAI__GOOGLE__API_KEY`), then the plain
    /// `GOOGLE_API_KEY` / `GROQ_API_KEY` variables for keys still unset.
    /// A `.env` file in the working directory is loaded first if present.
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        let mut builder = Config::builder();

        let explicit = config_path.is_some();
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("itinerai.toml"))
        });

        if explicit && !config_file.exists() {
            return Err(PlannerError::config(format!(
                "Config file not found: {}",
                config_file.display()
            ))
            .into());
        }

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("ITINERAI")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: PlannerConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_env_keys();
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("itinerai").join("config.toml"))
    }

    /// Fill unset keys from `GOOGLE_API_KEY` and `GROQ_API_KEY`
    fn apply_env_keys(&mut self) {
        if self.google.api_key.is_none() {
            self.google.api_key = std::env::var("GOOGLE_API_KEY").ok();
        }
        if self.groq.api_key.is_none() {
            self.groq.api_key = std::env::var("GROQ_API_KEY").ok();
        }
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.google.places_base_url.is_empty() {
            self.google.places_base_url = default_places_base_url();
        }
        if self.google.weather_base_url.is_empty() {
            self.google.weather_base_url = default_weather_base_url();
        }
        if self.google.air_quality_base_url.is_empty() {
            self.google.air_quality_base_url = default_air_quality_base_url();
        }
        if self.groq.base_url.is_empty() {
            self.groq.base_url = default_groq_base_url();
        }
        if self.groq.model.is_empty() {
            self.groq.model = default_groq_model();
        }
        if self.orchestrator.call_timeout_ms == 0 {
            self.orchestrator.call_timeout_ms = OrchestratorConfig::default().call_timeout_ms;
        }
        if self.orchestrator.max_concurrent_calls == 0 {
            self.orchestrator.max_concurrent_calls =
                OrchestratorConfig::default().max_concurrent_calls;
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        validate_key("Google", self.google.api_key.as_deref(), "GOOGLE_API_KEY")?;
        validate_key("Groq", self.groq.api_key.as_deref(), "GROQ_API_KEY")?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        let orchestrator = &self.orchestrator;

        if orchestrator.call_timeout_ms > 300_000 {
            return Err(PlannerError::config("Call timeout cannot exceed 300 seconds").into());
        }

        if orchestrator.max_retries > 10 {
            return Err(PlannerError::config("Max retries cannot exceed 10").into());
        }

        if orchestrator.base_backoff_ms > orchestrator.max_backoff_ms {
            return Err(PlannerError::config(
                "Base backoff cannot be larger than max backoff",
            )
            .into());
        }

        if orchestrator.max_concurrent_calls > 256 {
            return Err(PlannerError::config("Concurrent calls cannot exceed 256").into());
        }

        if !(0.0..=2.0).contains(&self.groq.temperature) {
            return Err(PlannerError::config("Groq temperature must be between 0 and 2").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(PlannerError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(PlannerError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("Places", &self.google.places_base_url),
            ("Weather", &self.google.weather_base_url),
            ("Air Quality", &self.google.air_quality_base_url),
            ("Groq", &self.groq.base_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(PlannerError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Retry, timeout and concurrency policy for the orchestrator
    #[must_use]
    pub fn call_policy(&self) -> CallPolicy {
        let o = &self.orchestrator;
        CallPolicy {
            call_timeout: Duration::from_millis(o.call_timeout_ms),
            max_retries: o.max_retries,
            base_backoff: Duration::from_millis(o.base_backoff_ms),
            max_backoff: Duration::from_millis(o.max_backoff_ms),
            max_concurrent_calls: o.max_concurrent_calls,
            reject_empty_itinerary: o.reject_empty_itinerary,
        }
    }

    /// Resolved Google credentials
    pub fn google_credentials(&self) -> Result<GoogleCredentials> {
        let api_key = self
            .google
            .api_key
            .clone()
            .ok_or_else(|| PlannerError::config("GOOGLE_API_KEY is not set"))?;
        Ok(GoogleCredentials {
            api_key,
            places_base_url: self.google.places_base_url.clone(),
            weather_base_url: self.google.weather_base_url.clone(),
            air_quality_base_url: self.google.air_quality_base_url.clone(),
        })
    }

    /// Resolved Groq settings
    pub fn groq_settings(&self) -> Result<GroqSettings> {
        let api_key = self
            .groq
            .api_key
            .clone()
            .ok_or_else(|| PlannerError::config("GROQ_API_KEY is not set"))?;
        Ok(GroqSettings {
            api_key,
            base_url: self.groq.base_url.clone(),
            model: self.groq.model.clone(),
            temperature: self.groq.temperature,
        })
    }
}

fn validate_key(name: &str, key: Option<&str>, variable: &str) -> Result<()> {
    let Some(key) = key else {
        return Err(PlannerError::config(format!(
            "{name} API key not found. Set {variable} in the environment or a .env file."
        ))
        .into());
    };

    if key.trim().is_empty() {
        return Err(PlannerError::config(format!("{name} API key cannot be empty")).into());
    }

    if key.len() < 8 {
        return Err(PlannerError::config(format!(
            "{name} API key appears to be invalid (too short). Please check your API key."
        ))
        .into());
    }

    if key.len() > 200 {
        return Err(PlannerError::config(format!(
            "{name} API key appears to be invalid (too long). Please check your API key."
        ))
        .into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> PlannerConfig {
        let mut config = PlannerConfig::default();
        config.google.api_key = Some("google_key_123".to_string());
        config.groq.api_key = Some("groq_key_123".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = PlannerConfig::default();
        assert_eq!(config.google.weather_base_url, "https://weather.googleapis.com/v1");
        assert_eq!(config.groq.model, "llama-3.1-8b-instant");
        assert_eq!(config.groq.temperature, 0.0);
        assert_eq!(config.orchestrator.max_retries, 2);
        assert_eq!(config.orchestrator.call_timeout_ms, 10_000);
        assert_eq!(config.logging.level, "info");
        assert!(config.google.api_key.is_none());
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let config = PlannerConfig::default();
        let result = config.validate_api_keys();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Google API key not found"));
    }

    #[test]
    fn test_valid_config() {
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn test_short_api_key_rejected() {
        let mut config = configured();
        config.groq.api_key = Some("short".to_string());
        assert!(config.validate().unwrap_err().to_string().contains("too short"));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = configured();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_numeric_ranges() {
        let mut config = configured();
        config.orchestrator.call_timeout_ms = 500_000;
        assert!(config.validate().unwrap_err().to_string().contains("timeout cannot exceed"));

        let mut config = configured();
        config.orchestrator.base_backoff_ms = 10_000;
        config.orchestrator.max_backoff_ms = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = configured();
        config.google.places_base_url = "maps.googleapis.com".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("Places base URL"));
    }

    #[test]
    fn test_call_policy_from_config() {
        let mut config = configured();
        config.orchestrator.call_timeout_ms = 1500;
        config.orchestrator.max_retries = 4;
        let policy = config.call_policy();
        assert_eq!(policy.call_timeout, Duration::from_millis(1500));
        assert_eq!(policy.max_retries, 4);
        assert_eq!(config.orchestrator.max_concurrent_calls, policy.max_concurrent_calls);
    }

    #[test]
    fn test_credentials() {
        let config = configured();
        assert_eq!(config.google_credentials().unwrap().api_key, "google_key_123");
        assert_eq!(config.groq_settings().unwrap().model, "llama-3.1-8b-instant");
        assert!(PlannerConfig::default().google_credentials().is_err());
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = PlannerConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("itinerai"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
