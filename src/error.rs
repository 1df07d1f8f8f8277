// src/error.rs

//! Unified error handling for the watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// AWS S3 error
    #[error("S3 error: {0}")]
    S3(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Page could not be fetched after all attempts
    #[error("Fetch failed for {url} after {attempts} attempt(s): {message}")]
    Fetch {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Extraction adapter failed hard (not "nothing found")
    #[error("Extraction error for {context}: {message}")]
    Extract { context: String, message: String },

    /// Persisted state could not be reached
    #[error("State backend unavailable at {location}: {message}")]
    StateUnavailable { location: String, message: String },

    /// Slack API rejected or failed a request
    #[error("Slack error: {0}")]
    Slack(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error.
    pub fn fetch(url: impl Into<String>, attempts: u32, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            attempts,
            message: message.to_string(),
        }
    }

    /// Create an extraction error with context.
    pub fn extract(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Extract {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a state-unavailable error.
    pub fn state_unavailable(location: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::StateUnavailable {
            location: location.into(),
            message: message.to_string(),
        }
    }

    /// Short variant name used in admin alerts.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::S3(_) => "S3Error",
            Self::Io(_) => "IoError",
            Self::Http(_) => "HttpError",
            Self::Json(_) => "JsonError",
            Self::Toml(_) => "TomlError",
            Self::Selector { .. } => "SelectorError",
            Self::Config(_) => "ConfigError",
            Self::Validation(_) => "ValidationError",
            Self::Fetch { .. } => "FetchError",
            Self::Extract { .. } => "ExtractError",
            Self::StateUnavailable { .. } => "StateUnavailable",
            Self::Slack(_) => "SlackError",
        }
    }
}
