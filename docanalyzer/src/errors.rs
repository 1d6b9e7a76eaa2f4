//! Error types for the analysis client.
//!
//! Every failure the dashboard can show is an [`AnalyzerError`]. Each one is
//! scoped to the component that produced it; none of them is fatal to the
//! dashboard as a whole.

use serde::Deserialize;
use thiserror::Error;

/// Fallback shown when an error body cannot be decoded at all.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// The main error type for client operations.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Client-side validation rejected the input before any request was made.
    #[error("{0}")]
    Validation(String),

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {detail}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The `detail` field of the error body, or an operation fallback.
        detail: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The `{detail}` body every error response of the service carries.
#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

impl AnalyzerError {
    /// Builds a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Builds an API error from a non-2xx status and its raw body.
    ///
    /// The body's `detail` wins when present. A body that is not JSON at all
    /// yields [`UNEXPECTED_ERROR`]; a JSON body without `detail` yields
    /// `fallback`.
    #[must_use]
    pub fn from_status(status: u16, body: &str, fallback: &str) -> Self {
        let detail = match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                detail: Some(detail),
            }) if !detail.trim().is_empty() => detail,
            Ok(_) => fallback.to_string(),
            Err(_) => UNEXPECTED_ERROR.to_string(),
        };
        Self::Api { status, detail }
    }

    /// Reads a failed response and converts it.
    pub async fn from_response(response: reqwest::Response, fallback: &str) -> Self {
        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => Self::from_status(status, &body, fallback),
            Err(_) => Self::Api {
                status,
                detail: fallback.to_string(),
            },
        }
    }

    /// The text shown to the user for this error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Config(message) => message.clone(),
            Self::Api { detail, .. } => detail.clone(),
            Self::Http(e) => e.to_string(),
            Self::Decode(e) => format!("Unexpected response from server: {e}"),
            Self::Io(e) => e.to_string(),
        }
    }

    /// Whether the error was produced locally, without touching the network.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// HTTP status of an API error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias used across the crate.
pub type AnalyzerResult<T> = Result<T, AnalyzerError>;
