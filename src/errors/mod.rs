//! Error handling module for the portal client.
//!
//! Remote failures are classified here into what the user gets to see; nothing in
//! this taxonomy is fatal to the process.

use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
#[allow(dead_code)]
pub mod codes {
    pub const VALIDATION_REJECTED: &str = "VALIDATION_REJECTED";
    pub const AUTH_REJECTED: &str = "AUTH_REJECTED";
    pub const TRANSIENT: &str = "TRANSIENT";
    pub const STALE_REFERENCE: &str = "STALE_REFERENCE";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const DECODE_ERROR: &str = "DECODE_ERROR";
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
}

/// Localization key shown when the backend rejects a login.
pub const LOGIN_FAILED_KEY: &str = "competitor-zone.login.errors.failed";

/// Failure returned by the remote gateway.
///
/// `body` carries the server's localization key when the status is 400.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFailure {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RemoteFailure {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(body.into()),
        }
    }

    pub fn status(status: u16) -> Self {
        Self { status, body: None }
    }
}

impl std::fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.body {
            Some(body) => write!(f, "remote call failed with {}: {}", self.status, body),
            None => write!(f, "remote call failed with {}", self.status),
        }
    }
}

impl std::error::Error for RemoteFailure {}

/// Which kind of call produced a remote failure. Only login gives 401 its own meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Login,
    Other,
}

/// Client error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// 400-class rejection carrying a server-supplied localization key
    ValidationRejected(String),
    /// 401 on login
    AuthRejected,
    /// Anything else the backend answered with
    Transient { status: u16 },
    /// The focal entity or sub-resource disappeared between load and action
    StaleReference(String),
    /// Durable storage failure
    Storage(String),
    /// Unparseable credential or payload
    Decode(String),
    /// No response was received, or it could not be read (status 0)
    Transport(String),
}

impl ClientError {
    /// Classify a remote failure for the given kind of call.
    pub fn from_remote(failure: RemoteFailure, kind: CallKind) -> Self {
        match (failure.status, kind) {
            (400, _) => match failure.body {
                Some(key) => ClientError::ValidationRejected(key),
                None => ClientError::Transient { status: 400 },
            },
            (401, CallKind::Login) => ClientError::AuthRejected,
            (0, _) => ClientError::Transport(failure.to_string()),
            (status, _) => ClientError::Transient { status },
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::ValidationRejected(_) => codes::VALIDATION_REJECTED,
            ClientError::AuthRejected => codes::AUTH_REJECTED,
            ClientError::Transient { .. } => codes::TRANSIENT,
            ClientError::StaleReference(_) => codes::STALE_REFERENCE,
            ClientError::Storage(_) => codes::STORAGE_ERROR,
            ClientError::Decode(_) => codes::DECODE_ERROR,
            ClientError::Transport(_) => codes::TRANSPORT_ERROR,
        }
    }

    /// Status reported to the error port. Local failures report 0.
    pub fn status(&self) -> u16 {
        match self {
            ClientError::ValidationRejected(_) => 400,
            ClientError::AuthRejected => 401,
            ClientError::Transient { status } => *status,
            _ => 0,
        }
    }

    /// Localization key the user should see, if the failure has a specific one.
    pub fn user_message_key(&self) -> Option<&str> {
        match self {
            ClientError::ValidationRejected(key) => Some(key.as_str()),
            ClientError::AuthRejected => Some(LOGIN_FAILED_KEY),
            _ => None,
        }
    }

    /// Stale references resolve by navigating away, never by an error message.
    pub fn is_surfaced(&self) -> bool {
        !matches!(self, ClientError::StaleReference(_))
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            ClientError::ValidationRejected(key) => key.clone(),
            ClientError::AuthRejected => "bad credentials".to_string(),
            ClientError::Transient { status } => format!("request failed with status {}", status),
            ClientError::StaleReference(what) => what.clone(),
            ClientError::Storage(msg) => msg.clone(),
            ClientError::Decode(msg) => msg.clone(),
            ClientError::Transport(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for ClientError {}

/// Failures of calls other than login.
impl From<RemoteFailure> for ClientError {
    fn from(failure: RemoteFailure) -> Self {
        ClientError::from_remote(failure, CallKind::Other)
    }
}

impl From<sqlx::Error> for ClientError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Storage error: {:?}", err);
        ClientError::Storage(format!("Storage error: {}", err))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        ClientError::Decode(format!("JSON error: {}", err))
    }
}
