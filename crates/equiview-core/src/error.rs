//! Error types for Equiview

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    // Local validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Precondition not met: {0}")]
    Precondition(String),

    // Collaborator errors
    #[error("Request to {endpoint} failed: {reason}")]
    Network { endpoint: String, reason: String },

    #[error("{endpoint} returned {status}{}", message_suffix(.message))]
    Server {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },

    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedPayload { endpoint: String, reason: String },

    #[error("Session expired. Please log in again")]
    AuthExpired,

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification used by the workspace to decide how a failure is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad local input, no network attempted
    Validation,
    /// Transport, server or payload failure
    Network,
    /// 401-class rejection, handled globally
    AuthExpired,
    /// Operation not possible in the current state
    Precondition,
    /// Local setup problem (configuration, persisted files)
    Configuration,
}

impl WorkspaceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkspaceError::Validation(_) => ErrorKind::Validation,
            WorkspaceError::Precondition(_) => ErrorKind::Precondition,
            WorkspaceError::Network { .. }
            | WorkspaceError::Server { .. }
            | WorkspaceError::MalformedPayload { .. } => ErrorKind::Network,
            WorkspaceError::AuthExpired => ErrorKind::AuthExpired,
            WorkspaceError::ConfigInvalid { .. }
            | WorkspaceError::Io(_)
            | WorkspaceError::Serialization(_) => ErrorKind::Configuration,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, WorkspaceError::AuthExpired)
    }

    /// The `error` text the server attached to a rejection, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            WorkspaceError::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;

fn message_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}
