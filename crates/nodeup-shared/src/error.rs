//! Error types for the installer.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallerError {
    #[error("Insufficient privileges: {0}")]
    Permission(String),

    #[error("Unsupported environment: {0}")]
    Environment(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{phase} failed: {message}")]
    Install { phase: String, message: String },

    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    #[error("Aborted: {0}")]
    UserAbort(String),
}

impl InstallerError {
    pub fn install(phase: impl Into<String>, message: impl Into<String>) -> Self {
        InstallerError::Install {
            phase: phase.into(),
            message: message.into(),
        }
    }

    /// Only validation failures can be retried from inside the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, InstallerError::ValidationFailure(_))
    }

    pub fn category(&self) -> &'static str {
        match self {
            InstallerError::Permission(_) => "permission",
            InstallerError::Environment(_) => "environment",
            InstallerError::Network(_) => "network",
            InstallerError::Install { .. } => "install",
            InstallerError::ValidationFailure(_) => "validation",
            InstallerError::UserAbort(_) => "abort",
        }
    }
}
