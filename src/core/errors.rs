//! Custom error types for round-trip translation

use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Upstream API answered with a non-success status
    #[error("API error: {status} - {message}")]
    ApiError {
        status: u16,
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        message: String,
    },

    /// Request timeout
    #[error("Request timeout")]
    TimeoutError,

    /// Prompt template file is missing
    #[error("Prompt template not found: {path}")]
    TemplateNotFound {
        path: String,
    },

    /// File operation error
    #[error("File error: {path} - {message}")]
    FileError {
        path: String,
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// Missing required field
    #[error("Missing required field: {field}")]
    MissingField {
        field: String,
    },

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl TranslationError {
    /// Whether the caller is at fault (maps to a 400-class response)
    pub fn is_client_error(&self) -> bool {
        matches!(self, TranslationError::MissingField { .. })
    }

    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        TranslationError::ConfigError {
            message: message.into(),
        }
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;
