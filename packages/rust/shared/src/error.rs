//! Error types for Aragorn.
//!
//! Library crates use [`AragornError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Aragorn operations.
#[derive(Debug, thiserror::Error)]
pub enum AragornError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level HTTP failure (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// A service answered with a non-success HTTP status.
    #[error("error response from {service}, status code: {status}")]
    Upstream { service: String, status: u16 },

    /// A service body (or fixture) could not be decoded as a JSON object.
    #[error("could not decode response from {service}: {message}")]
    Decode { service: String, message: String },

    /// A service returned an empty JSON object.
    #[error("empty response from {service}")]
    EmptyResponse { service: String },

    /// The expansion service returned no usable results.
    #[error("error response from {service}, no answer returned")]
    NoAnswer { service: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad strategy, malformed input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AragornError>;

impl AragornError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn decode(service: impl Into<String>, msg: impl std::fmt::Display) -> Self {
        Self::Decode {
            service: service.into(),
            message: msg.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = AragornError::config("bad score_url");
        assert_eq!(err.to_string(), "config error: bad score_url");

        let err = AragornError::Upstream {
            service: "omnicorp".into(),
            status: 502,
        };
        assert_eq!(
            err.to_string(),
            "error response from omnicorp, status code: 502"
        );

        let err = AragornError::NoAnswer {
            service: "Strider".into(),
        };
        assert!(err.to_string().contains("no answer returned"));
    }
}
