//! Error types for fx-reconcile

use thiserror::Error;

/// Main error type for fx-reconcile
#[derive(Error, Debug)]
pub enum FxError {
    /// Rejected before any request is issued
    #[error("{0}")]
    Validation(String),

    /// The network call itself failed; `endpoint` is the full URL
    #[error("Failed to connect to API at {endpoint}: {reason}")]
    Connectivity { endpoint: String, reason: String },

    /// Non-2xx answer from the rate service
    #[error("Rate service returned {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Upstream { status: u16, message: Option<String> },

    /// 2xx answer carrying no series
    #[error("Response contained no series: {}", .message.as_deref().unwrap_or("no details"))]
    EmptyResponse { message: Option<String> },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid interval. Must be one of: 1d, 1wk, 1mo")]
    InvalidInterval(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl FxError {
    /// Message suitable for showing to the user.
    ///
    /// Server-provided text is passed through untouched; `None` means the
    /// caller should substitute its own fallback.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            FxError::Upstream { message, .. } | FxError::EmptyResponse { message } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            _ => None,
        }
    }

    /// Text to show the user when this error ends a submission.
    ///
    /// Connectivity and validation errors are shown as-is, so the endpoint
    /// is named verbatim. Service answers show the server's message, or
    /// `fallback` when it sent none. Local failures show their own text.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            FxError::Upstream { .. } | FxError::EmptyResponse { .. } => self
                .server_message()
                .unwrap_or(fallback)
                .to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether this error was raised before anything went over the wire
    pub fn is_validation(&self) -> bool {
        matches!(self, FxError::Validation(_))
    }
}

/// Result type alias for fx-reconcile operations
pub type Result<T> = std::result::Result<T, FxError>;
