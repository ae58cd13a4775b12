// src/error.rs

//! Unified error handling for the monitor.

use std::fmt;

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// How the supervisor treats an error that escaped a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Reset the acquisition resource and retry after backoff.
    Retry,
    /// Already handled locally; the cycle carries on.
    Absorb,
    /// Stop the process.
    Fatal,
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
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

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The acquisition resource failed as a whole
    #[error("Acquisition error: {0}")]
    Acquisition(String),

    /// A single offer could not be extracted
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Delivery to one notification target failed
    #[error("Notification to {target} failed: {message}")]
    Notification { target: String, message: String },

    /// History could not be written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Too many consecutive acquisition failures
    #[error("Acquisition failed {failures} times in a row, giving up")]
    AcquisitionFatal { failures: u32 },
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

    /// Create an acquisition error.
    pub fn acquisition(message: impl fmt::Display) -> Self {
        Self::Acquisition(message.to_string())
    }

    /// Create an extraction error.
    pub fn extraction(message: impl fmt::Display) -> Self {
        Self::Extraction(message.to_string())
    }

    /// Create a notification error for a target.
    pub fn notification(target: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Notification {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(message: impl fmt::Display) -> Self {
        Self::Persistence(message.to_string())
    }

    /// Map this error onto the supervisor's retry policy.
    ///
    /// Transport failures (`Http`) reaching the supervisor came out of the
    /// acquisition call, so they retry like any other acquisition error.
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Acquisition(_) | Self::Http(_) => Disposition::Retry,
            Self::Extraction(_) | Self::Notification { .. } | Self::Persistence(_) => {
                Disposition::Absorb
            }
            Self::Config(_)
            | Self::AcquisitionFatal { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Toml(_)
            | Self::Url(_)
            | Self::Selector { .. } => Disposition::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_errors_retry() {
        assert_eq!(
            AppError::acquisition("browser gone").disposition(),
            Disposition::Retry
        );
    }

    #[test]
    fn test_local_errors_are_absorbed() {
        assert_eq!(
            AppError::notification("123", "status 500").disposition(),
            Disposition::Absorb
        );
        assert_eq!(
            AppError::persistence("disk full").disposition(),
            Disposition::Absorb
        );
        assert_eq!(
            AppError::extraction("no market").disposition(),
            Disposition::Absorb
        );
    }

    #[test]
    fn test_config_and_threshold_are_fatal() {
        assert_eq!(AppError::config("no targets").disposition(), Disposition::Fatal);
        assert_eq!(
            AppError::AcquisitionFatal { failures: 5 }.disposition(),
            Disposition::Fatal
        );
    }

    #[test]
    fn test_notification_message() {
        let err = AppError::notification("42", "status 403");
        assert_eq!(err.to_string(), "Notification to 42 failed: status 403");
    }
}
