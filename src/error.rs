//! Error types for backend requests and view actions
//!
//! Errors are classified by recoverability:
//! - Retryable: transport failures, 5xx responses, dropped event streams
//! - NonRetryable: bad input, missing records, undecodable payloads
//! - RequiresUserAction: expired session, insufficient role, bad config

use thiserror::Error;

/// Error types for requests made against the intel backend.
///
/// `Clone` because a single in-flight request is shared by every caller that
/// asked for the same cache key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    // Requires user action
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Retryable errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Event stream error: {0}")]
    Stream(String),

    // Non-retryable errors
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    /// Map a non-success HTTP status and the server's `{"error": ...}` message.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => ClientError::Unauthenticated,
            403 => ClientError::Forbidden(message),
            404 => ClientError::NotFound(message),
            409 => ClientError::Conflict { message },
            400 | 422 => ClientError::InvalidInput(message),
            _ => ClientError::Http { status, message },
        }
    }

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) | ClientError::Stream(_) => true,
            ClientError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true if this error requires user action to resolve
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            ClientError::Unauthenticated | ClientError::Forbidden(_) | ClientError::Config(_)
        )
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ClientError::Unauthenticated => "Sign in again to continue.",
            ClientError::Forbidden(_) => "Ask an admin for analyst access.",
            ClientError::Config(_) => "Check your configuration in ~/.warroom/config.json",
            ClientError::Network(_) => "Check your connection and try again.",
            ClientError::Http { .. } => "The server had a problem. Try again shortly.",
            ClientError::Stream(_) => "Live updates paused. Reconnecting automatically.",
            ClientError::NotFound(_) => "The record may have been archived.",
            ClientError::Conflict { .. } => "Another job is already running for this item.",
            ClientError::Decode(_) => "The server sent an unexpected response.",
            ClientError::InvalidInput(_) => "Check the form values and try again.",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

/// Serializable error representation for placeholders and notifications
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    pub message: String,
    pub error_type: ErrorType,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Retryable,
    NonRetryable,
    RequiresUserAction,
}

impl From<&ClientError> for ErrorNotice {
    fn from(err: &ClientError) -> Self {
        let error_type = if err.requires_user_action() {
            ErrorType::RequiresUserAction
        } else if err.is_retryable() {
            ErrorType::Retryable
        } else {
            ErrorType::NonRetryable
        };

        ErrorNotice {
            message: err.to_string(),
            error_type,
            can_retry: err.is_retryable(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}
