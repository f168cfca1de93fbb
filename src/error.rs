// src/error.rs

//! Unified error handling for the crawler.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Embedded data payload could not be located or decoded
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Request completed with a non-success status
    #[error("Fetch failed for {url}: HTTP {status}")]
    Fetch { url: String, status: u16 },

    /// Platform answered with "too many requests"
    #[error("Rate limited by platform at {url}")]
    RateLimited { url: String },

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

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Channel reference could not be understood
    #[error("Invalid channel reference '{input}': {message}")]
    ChannelRef { input: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Collection missing from the store
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Crawling error
    #[error("Crawl error for {context}: {message}")]
    Crawl { context: String, message: String },
}

impl AppError {
    /// Create an extraction error.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create a channel reference parsing error.
    pub fn channel_ref(input: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::ChannelRef {
            input: input.into(),
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

    /// Create a crawl error with context.
    pub fn crawl(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Crawl {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error carries the platform's "too many requests" signal.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Http(e) => e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_detection() {
        let err = AppError::RateLimited {
            url: "https://example.com/watch".into(),
        };
        assert!(err.is_rate_limited());

        let err = AppError::Fetch {
            url: "https://example.com/watch".into(),
            status: 503,
        };
        assert!(!err.is_rate_limited());
        assert!(!AppError::extraction("no payload").is_rate_limited());
    }

    #[test]
    fn test_display_includes_context() {
        let err = AppError::channel_ref("???", "unsupported format");
        assert_eq!(
            err.to_string(),
            "Invalid channel reference '???': unsupported format"
        );
    }
}
