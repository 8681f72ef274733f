//! Custom error types for proxy operations

use thiserror::Error;

/// Proxy-related errors
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Structurally invalid request, rejected before any upstream call
    #[error("Validation error: {message}")]
    Validation {
        /// Why the request was rejected
        message: String,
    },

    /// Upstream API answered with a non-2xx status
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Upstream call did not finish in time
    #[error("Request timeout")]
    Timeout,

    /// Network error
    #[error("Network error: {message}")]
    Network {
        /// Transport error text
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// What was wrong with the body
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration
        message: String,
    },

    /// A credential could not be resolved from any source
    #[error("Missing credential: {name}")]
    MissingCredential {
        /// Where the key was looked for
        name: String,
    },

    /// Anything that should not happen while building a response
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl ProxyError {
    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        ProxyError::Validation {
            message: message.into(),
        }
    }

    /// Upstream HTTP status, when the error carries one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProxyError::Api { status, .. } => Some(*status),
            ProxyError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the error is a structural problem with the caller's input
    pub fn is_validation(&self) -> bool {
        matches!(self, ProxyError::Validation { .. })
    }

    /// Whether the error came from talking to an upstream API
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ProxyError::Api { .. }
                | ProxyError::Timeout
                | ProxyError::Network { .. }
                | ProxyError::InvalidResponse { .. }
                | ProxyError::Http(_)
                | ProxyError::Base64(_)
        )
    }
}

impl From<anyhow::Error> for ProxyError {
    fn from(err: anyhow::Error) -> Self {
        ProxyError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for ProxyError {
    fn from(err: config::ConfigError) -> Self {
        ProxyError::Config {
            message: err.to_string(),
        }
    }
}

/// Result type for proxy operations
pub type Result<T> = std::result::Result<T, ProxyError>;
