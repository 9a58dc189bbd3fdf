//! Error types for the schematics client

use serde::Deserialize;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network, DNS, TLS or per-call deadline failures
    Transport,
    /// Non-2xx response from the remote service
    Api,
    /// Local precondition violated by the caller
    Usage,
    /// A remote activity ended without succeeding, or never ended in time
    Activity,
    /// Unexpected failures inside the client itself
    Internal,
}

/// Main error type for the schematics client
#[derive(Debug, Error)]
pub enum Error {
    // Transport errors (1000-1999)
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out trying to {operation}")]
    Timeout { operation: String },

    // API errors (2000-2999)
    #[error("failed to {operation}: HTTP {status}: {}", .message.as_deref().unwrap_or(.body.as_str()))]
    Api {
        operation: String,
        status: u16,
        message: Option<String>,
        body: String,
    },

    // Usage errors (3000-3999)
    #[error("Invalid variable name, it cannot be an empty string")]
    EmptyVariableName,

    #[error("Variable {0:?} already exists")]
    DuplicateVariable(String),

    #[error("Missing API key: set IC_API_KEY or SCHEMATICS_API_KEY")]
    MissingApiKey,

    #[error("Workspace in invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Workspace {0:?} has not been created yet")]
    NotCreated(String),

    #[error("Workspace {0} has no template to upload the code to")]
    MissingTemplate(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    // Activity errors (4000-4999)
    #[error("Activity {name} ({id}) on workspace {workspace_id} finished with status {status}: {message}")]
    ActivityFailed {
        id: String,
        name: String,
        workspace_id: String,
        status: String,
        message: String,
    },

    #[error("Activity {id} on workspace {workspace_id} did not finish within {timeout_secs}s (last status: {status})")]
    WaitTimeout {
        id: String,
        workspace_id: String,
        status: String,
        timeout_secs: u64,
    },

    // Internal errors (5000-5999)
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Failed to package the code: {0}")]
    Archive(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the error code
    pub fn code(&self) -> u32 {
        match self {
            // Transport errors (1000-1999)
            Error::Transport(_) => 1001,
            Error::Timeout { .. } => 1002,

            // API errors (2000-2999)
            Error::Api { .. } => 2001,

            // Usage errors (3000-3999)
            Error::EmptyVariableName => 3001,
            Error::DuplicateVariable(_) => 3002,
            Error::MissingApiKey => 3003,
            Error::InvalidState { .. } => 3004,
            Error::NotCreated(_) => 3005,
            Error::MissingTemplate(_) => 3006,
            Error::Config(_) => 3007,

            // Activity errors (4000-4999)
            Error::ActivityFailed { .. } => 4001,
            Error::WaitTimeout { .. } => 4002,

            // Internal errors (5000-5999)
            Error::Auth(_) => 5001,
            Error::Decode(_) => 5002,
            Error::Archive(_) => 5003,
            Error::Internal(_) => 5004,
        }
    }

    /// Get the error classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) | Error::Timeout { .. } => ErrorKind::Transport,

            Error::Api { .. } => ErrorKind::Api,

            Error::EmptyVariableName
            | Error::DuplicateVariable(_)
            | Error::MissingApiKey
            | Error::InvalidState { .. }
            | Error::NotCreated(_)
            | Error::MissingTemplate(_)
            | Error::Config(_) => ErrorKind::Usage,

            Error::ActivityFailed { .. } | Error::WaitTimeout { .. } => ErrorKind::Activity,

            Error::Auth(_) | Error::Decode(_) | Error::Archive(_) | Error::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// HTTP status of an API error, if this is one
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build an API error from a non-2xx response.
    ///
    /// The raw body is always kept; the structured message payload is
    /// extracted when the body is JSON.
    pub fn api(operation: &str, status: u16, body: &[u8]) -> Self {
        let body = String::from_utf8_lossy(body).into_owned();
        let message = serde_json::from_str::<ApiMessage>(&body)
            .ok()
            .and_then(|m| m.summary());

        Error::Api {
            operation: operation.to_string(),
            status,
            message,
            body,
        }
    }
}

/// Message payload returned by the remote service on failures
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub messagekey: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub requestid: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub errors: Vec<ApiMessageDetail>,
}

/// One entry of the `errors` list some endpoints return
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiMessageDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiMessage {
    fn summary(&self) -> Option<String> {
        let text = self
            .message
            .clone()
            .or_else(|| self.errors.iter().find_map(|e| e.message.clone()))
            .or_else(|| self.messagekey.clone())?;

        Some(match &self.requestid {
            Some(id) => format!("{} (request {})", text, id),
            None => text,
        })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout {
                operation: err
                    .url()
                    .map(|u| format!("reach {}", u.path()))
                    .unwrap_or_else(|| "complete the request".to_string()),
            }
        } else if err.is_decode() {
            Error::Decode(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
