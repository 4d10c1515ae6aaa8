use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of error kinds the workflow understands. Every failure that
/// reaches the state machine is reduced to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Timeout,
    ApiError,
    NotFound,
}

impl ErrorKind {
    /// Title shown above the message on the error screen
    pub fn title(&self) -> &'static str {
        match self {
            Self::Network => "Network Error",
            Self::Timeout => "Timeout",
            Self::ApiError => "API Error",
            Self::NotFound => "Not Found",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::ApiError => "api_error",
            Self::NotFound => "not_found",
        };
        write!(f, "{}", s)
    }
}

/// Error value carried by the `*Error` actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ApiError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.title(), self.message)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenericError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Call timed out: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("ParseError: {0}")]
    ParseError(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl GenericError {
    /// Collapse onto the four kinds the workflow distinguishes. Decoding,
    /// validation and configuration problems surface as API errors since the
    /// request never produced a usable answer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Api { status: 404, .. } => ErrorKind::NotFound,
            Self::Api { .. }
            | Self::ParseError(_)
            | Self::Validation(_)
            | Self::ConfigError(_) => ErrorKind::ApiError,
        }
    }

    /// Message without the kind prefix
    pub fn message(&self) -> String {
        match self {
            Self::Network(s)
            | Self::Timeout(s)
            | Self::NotFound(s)
            | Self::ParseError(s)
            | Self::ConfigError(s) => s.clone(),
            Self::Api { message, .. } => message.clone(),
            Self::Validation(errors) => errors.join("; "),
        }
    }

    pub fn to_app_error(&self) -> AppError {
        AppError::new(self.kind(), self.message())
    }
}

impl From<GenericError> for AppError {
    fn from(e: GenericError) -> Self {
        e.to_app_error()
    }
}

impl From<serde_json::Error> for GenericError {
    fn from(e: serde_json::Error) -> Self {
        Self::ParseError(e.to_string())
    }
}
