//! # Configuration Management
//!
//! Loads and manages application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, APP_OPENAI_CHAT_MODEL, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! `HOST`, `PORT` and `OPENAI_API_KEY` are honored without the APP_ prefix
//! since deployment platforms and the OpenAI SDKs conventionally set them
//! that way.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub openai: OpenAiConfig,
    pub limits: LimitsConfig,
    pub behavior: BehaviorConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// The single operator credential that gates every stateful endpoint.
///
/// There is deliberately no user database: one shared username/password
/// pair is checked at login, and possession of an issued session token is
/// the authentication predicate afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

/// Upstream OpenAI service configuration.
///
/// ## Fields:
/// - `api_key`: taken from the OPENAI_API_KEY environment variable when unset here
/// - `transcribe_model` / `chat_model` / `tts_model`: model names per capability
/// - `voice`: TTS voice name
/// - `chat_temperature`: sampling temperature for conversational replies
/// - `request_timeout_secs`: per-request upper bound for all upstream calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub transcribe_model: String,
    pub chat_model: String,
    pub tts_model: String,
    pub voice: String,
    pub chat_temperature: f32,
    pub request_timeout_secs: u64,
}

/// Bounds on per-session state and uploads.
///
/// ## Fields:
/// - `max_turns`: conversation window size in user/assistant pairs; the
///   stored history is capped at `2 * max_turns` records
/// - `min_audio_bytes`: uploads below this size are rejected as empty or
///   truncated recordings (kept forgiving for short mobile recordings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_turns: usize,
    pub min_audio_bytes: usize,
}

/// Policy switches for behavior that is a judgment call rather than a
/// hard requirement.
///
/// ## Fields:
/// - `tts_failure_fatal`: when true, a text-to-speech failure fails the
///   whole turn; when false (default) the turn degrades to a reply with
///   an empty audio field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    pub tts_failure_fatal: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            auth: AuthConfig {
                username: "coach".to_string(),
                password: "changeme".to_string(),
            },
            openai: OpenAiConfig {
                api_key: None,
                api_base: "https://api.openai.com/v1".to_string(),
                transcribe_model: "gpt-4o-mini-transcribe".to_string(),
                chat_model: "gpt-4o-mini".to_string(),
                tts_model: "gpt-4o-mini-tts".to_string(),
                voice: "marin".to_string(),
                chat_temperature: 0.4,
                request_timeout_secs: 30,
            },
            limits: LimitsConfig {
                max_turns: 6,
                min_audio_bytes: 500,
            },
            behavior: BehaviorConfig {
                tts_failure_fatal: false,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config.toml and environment.
    ///
    /// ## Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle the HOST / PORT / OPENAI_API_KEY special cases
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms set these without the APP_ prefix.
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            settings = settings.set_override("openai.api_key", key)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// Catching configuration errors early prevents runtime failures and
    /// provides clear error messages about what's wrong.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.auth.username.is_empty() || self.auth.password.is_empty() {
            return Err(anyhow::anyhow!("Operator username and password must be set"));
        }

        if self.limits.max_turns == 0 {
            return Err(anyhow::anyhow!("max_turns must be greater than 0"));
        }

        if self.limits.min_audio_bytes == 0 {
            return Err(anyhow::anyhow!("min_audio_bytes must be greater than 0"));
        }

        if self.openai.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("request_timeout_secs must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.limits.max_turns, 6);
        assert_eq!(config.limits.min_audio_bytes, 500);
        assert!(!config.behavior.tts_failure_fatal);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.auth.password = String::new();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.limits.max_turns = 0;
        assert!(config.validate().is_err());
    }
}
