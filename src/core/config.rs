//! Configuration management

use std::path::PathBuf;

use crate::core::errors::{Result, TranslationError};

/// OpenRouter chat-completion endpoint
pub const DEFAULT_API_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Environment variable holding the API credential
pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Deployment marker; debug behaviour is on when it is absent
pub const DEPLOYMENT_MARKER_VAR: &str = "RAILWAY_ENVIRONMENT";

/// Process-wide configuration, loaded once and passed explicitly
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub api_endpoint: String,
    pub timeout_ms: u64,
    pub prompts_dir: PathBuf,
    pub index_file: PathBuf,
    pub app_url: Option<String>,
    pub app_title: Option<String>,
    pub host: String,
    pub port: u16,
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            timeout_ms: 120_000,
            prompts_dir: PathBuf::from("prompts"),
            index_file: PathBuf::from("static/index.html"),
            app_url: None,
            app_title: None,
            host: "0.0.0.0".to_string(),
            port: 5000,
            debug: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// A missing credential is not an error here; callers decide whether to
    /// refuse to start (`validate`) or to fail per request.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| TranslationError::config(format!("invalid PORT '{}': {}", raw, e)))?,
            Err(_) => defaults.port,
        };

        let timeout_ms = match std::env::var("REQUEST_TIMEOUT_MS") {
            Ok(raw) => raw.parse::<u64>().map_err(|e| {
                TranslationError::config(format!("invalid REQUEST_TIMEOUT_MS '{}': {}", raw, e))
            })?,
            Err(_) => defaults.timeout_ms,
        };

        Ok(Self {
            api_key: std::env::var(API_KEY_VAR).unwrap_or_default(),
            api_endpoint: std::env::var("OPENROUTER_API_URL").unwrap_or(defaults.api_endpoint),
            timeout_ms,
            prompts_dir: std::env::var("TRANSBACK_PROMPTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.prompts_dir),
            index_file: std::env::var("TRANSBACK_INDEX_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_file),
            app_url: non_empty_var("OPENROUTER_APP_URL"),
            app_title: non_empty_var("OPENROUTER_APP_TITLE"),
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port,
            debug: std::env::var(DEPLOYMENT_MARKER_VAR).is_err(),
        })
    }

    /// Whether an API credential is configured
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Startup guard for both binaries: fails when no API key is configured
    pub fn require_api_key(&self) -> Result<()> {
        if self.has_api_key() {
            Ok(())
        } else {
            Err(TranslationError::config(format!(
                "{} environment variable not set",
                API_KEY_VAR
            )))
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.require_api_key()?;

        if self.api_endpoint.is_empty() {
            return Err(TranslationError::config("API endpoint is required"));
        }

        if self.timeout_ms == 0 {
            return Err(TranslationError::config("timeout_ms must be greater than 0"));
        }

        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
