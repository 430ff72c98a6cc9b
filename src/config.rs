//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Serialization/deserialization library for converting between Rust structs and data formats
//! - **derive macros**: Automatically generate code for common traits (Debug, Clone, Serialize, Deserialize)
//! - **Option<T>**: Settings that may legitimately be absent (credentials)
//! - **Result<T, E>**: Error handling that forces you to handle potential failures
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (HOST, PORT, GOOGLE_TTS_API_KEY, then APP_SECTION__FIELD)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)

use crate::audio::ProcessingConfig;
use crate::tts::voices::DEFAULT_LANGUAGE_CODE;
use crate::tts::Voice;
use anyhow::Result;                   // Better error handling with context
use serde::{Deserialize, Serialize};  // For converting to/from TOML, JSON, etc.
use std::env;                         // For reading environment variables

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (server, tts, processing)
/// keeps the network settings, the provider credentials and the signal
/// processing parameters apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub tts: TtsConfig,
    pub processing: ProcessingConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,  // u16 = unsigned 16-bit integer (0-65535), perfect for port numbers
}

/// Speech provider settings.
///
/// ## Fields:
/// - `endpoint`: Base URL of the Google Cloud Text-to-Speech REST API
/// - `api_key`: API key (sent as `?key=`), takes precedence over `access_token`
/// - `access_token`: OAuth bearer token, for deployments that mint their own tokens
/// - `default_voice` / `default_language`: Used when a request omits them
/// - `request_timeout_secs`: Upper bound on one provider call
///
/// ## Credentials:
/// With neither `api_key` nor `access_token` the server still starts, but the
/// synthesis endpoints answer 503.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub default_voice: String,
    pub default_language: String,
    pub request_timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://texttospeech.googleapis.com".to_string(),
            api_key: None,
            access_token: None,
            default_voice: Voice::Kore.name().to_string(),
            default_language: DEFAULT_LANGUAGE_CODE.to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl TtsConfig {
    /// Whether any provider credentials are configured.
    pub fn has_credentials(&self) -> bool {
        [&self.api_key, &self.access_token]
            .iter()
            .any(|v| v.as_deref().map_or(false, |s| !s.trim().is_empty()))
    }
}

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// Default values ensure the application can start even if no configuration file exists.
/// They also serve as documentation of reasonable starting values.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),  // Localhost only (safe for development)
                port: 8080,                     // Common development port
            },
            tts: TtsConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

/// Implementation block for AppConfig - adds methods to the struct.
impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for HOST, PORT and GOOGLE_TTS_API_KEY
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=3000`: Override server port
    /// - `APP_TTS__DEFAULT_VOICE=Puck`: Override the default voice
    /// - `APP_PROCESSING__DEDUP__CORRELATION_THRESHOLD=0.9`: Retune duplicate detection
    /// - `HOST=0.0.0.0` / `PORT=3000`: Special cases for deployment platforms
    /// - `GOOGLE_TTS_API_KEY=...`: Provider API key
    ///
    /// ## Why a double underscore:
    /// Field names like `default_voice` contain underscores themselves, so nesting
    /// levels are separated with `__` instead.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            // 1. Start with defaults - converts our Default impl to config format
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // 2. Load from config.toml file (if it exists) - required(false) means "don't error if missing"
            .add_source(config::File::with_name("config").required(false))
            // 3. Load from environment variables with APP_ prefix
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        // Handle special environment variables used by deployment platforms
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(api_key) = env::var("GOOGLE_TTS_API_KEY") {
            settings = settings.set_override("tts.api_key", api_key)?;
        }

        // Build the final configuration and convert it back to our AppConfig struct
        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - The provider endpoint is set and the timeout is positive
    /// - The default voice is in the catalog
    /// - Every processing parameter is in range for the sample rate
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.tts.endpoint.trim().is_empty() {
            return Err(anyhow::anyhow!("TTS endpoint cannot be empty"));
        }

        if self.tts.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("TTS request timeout must be greater than 0"));
        }

        if self.tts.default_voice.parse::<Voice>().is_err() {
            return Err(anyhow::anyhow!(
                "Default voice '{}' is not one of: {}",
                self.tts.default_voice,
                Voice::names().join(", ")
            ));
        }

        self.processing.validate().map_err(|e| anyhow::anyhow!(e))?;

        Ok(())  // All validation passed
    }

    /// Update configuration from a JSON string (used for runtime config updates).
    ///
    /// ## What can change at runtime:
    /// Only the default voice/language and the processing parameters. Server
    /// binding and credentials are fixed at startup.
    ///
    /// ## Partial updates:
    /// Send only what should change, for example
    /// `{"processing": {"dedup": {"correlation_threshold": 0.9}}}`.
    /// The updated configuration is validated before it is accepted.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        // Parse the JSON string into a generic value
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;

        // Update TTS defaults if provided
        if let Some(tts) = partial_config.get("tts") {
            if let Some(voice) = tts.get("default_voice").and_then(|v| v.as_str()) {
                self.tts.default_voice = voice.to_string();
            }
            if let Some(language) = tts.get("default_language").and_then(|v| v.as_str()) {
                self.tts.default_language = language.to_string();
            }
        }

        // Update processing parameters if provided
        if let Some(processing) = partial_config.get("processing") {
            if let Some(dedup) = processing.get("dedup") {
                let target = &mut self.processing.dedup;
                set_f64(dedup, "correlation_threshold", &mut target.correlation_threshold);
                set_f64(dedup, "remainder_tolerance_secs", &mut target.remainder_tolerance_secs);
                set_f64(dedup, "min_segment_secs", &mut target.min_segment_secs);
            }
            if let Some(conditioner) = processing.get("conditioner") {
                let target = &mut self.processing.conditioner;
                set_f64(conditioner, "silence_padding_ms", &mut target.silence_padding_ms);
                set_f64(conditioner, "fade_ms", &mut target.fade_ms);
                set_f64(conditioner, "highpass_cutoff_hz", &mut target.highpass_cutoff_hz);
                set_f64(conditioner, "peak_target", &mut target.peak_target);
            }
        }

        // Validate the updated configuration to ensure it's still valid
        self.validate()?;
        Ok(())
    }
}

/// Copy a numeric field from a JSON object if it is present.
fn set_f64(section: &serde_json::Value, key: &str, target: &mut f64) {
    if let Some(value) = section.get(key).and_then(|v| v.as_f64()) {
        *target = value;
    }
}

/// Tests for the configuration module.
#[cfg(test)]
mod tests {
    use super::*;  // Import everything from the parent module

    /// Test that the default configuration is valid and has expected values.
    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.tts.default_voice, "Kore");
        assert_eq!(config.tts.default_language, "ja-JP");
        assert_eq!(config.processing.dedup.correlation_threshold, 0.95);
        assert!(!config.tts.has_credentials());
        // Ensure the default config passes validation
        assert!(config.validate().is_ok());
    }

    /// Test that validation catches invalid configurations.
    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;  // Invalid port
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.tts.default_voice = "Alloy".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.processing.conditioner.peak_target = 0.0;
        assert!(config.validate().is_err());
    }

    /// Test that runtime configuration updates work correctly.
    #[test]
    fn test_config_update() {
        let mut config = AppConfig::default();
        let json = r#"{"processing": {"dedup": {"correlation_threshold": 0.9}}}"#;
        assert!(config.update_from_json(json).is_ok());
        assert_eq!(config.processing.dedup.correlation_threshold, 0.9);
        // Other fields should remain unchanged
        assert_eq!(config.processing.dedup.remainder_tolerance_secs, 0.1);
        assert_eq!(config.processing.conditioner.fade_ms, 50.0);
    }

    /// An update that would break validation is rejected.
    #[test]
    fn test_invalid_update_is_rejected() {
        let mut config = AppConfig::default();
        let json = r#"{"processing": {"conditioner": {"highpass_cutoff_hz": 20000}}}"#;
        assert!(config.update_from_json(json).is_err());
    }

    #[test]
    fn test_oversized_durations_are_rejected() {
        let mut config = AppConfig::default();
        let json = r#"{"processing": {"conditioner": {"fade_ms": 1e300}}}"#;
        assert!(config.update_from_json(json).is_err());

        let mut config = AppConfig::default();
        let json = r#"{"processing": {"dedup": {"min_segment_secs": 86400}}}"#;
        assert!(config.update_from_json(json).is_err());
    }

    #[test]
    fn test_credentials_detection() {
        let mut tts = TtsConfig::default();
        tts.access_token = Some("token".to_string());
        assert!(tts.has_credentials());
    }
}
