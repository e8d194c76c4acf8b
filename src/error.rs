//! Error taxonomy shared by the credential manager, driver resolver and
//! backup schedule lifecycle.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by control-plane operations
#[derive(Debug, Error)]
pub enum ControlError {
    /// The named lock was not acquired within the configured wait
    #[error("timed out after {waited:?} waiting for lock '{key}'")]
    LockTimeout { key: String, waited: Duration },

    /// Lock service or document store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The document store rejected a write
    #[error("store error: {0}")]
    Store(String),

    /// The secret vault rejected or failed a request
    #[error("secret store error: {0}")]
    SecretStore(String),

    /// A stored document could not be decoded
    #[error("corrupt document '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// No registered driver matched any of the candidate names
    #[error("driver not found: {0}")]
    DriverNotFound(String),

    /// Unknown credential, schedule or volume id
    #[error("not found: {0}")]
    NotFound(String),

    /// The resolved driver declined this capability group
    #[error("operation not supported")]
    NotSupported,

    /// Requested state is not reachable from the current one
    #[error("invalid state transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    /// Malformed caller input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ControlError {
    pub fn corrupt(key: &str, reason: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LockTimeout { .. }
                | Self::Unavailable(_)
                | Self::Store(_)
                | Self::SecretStore(_)
        )
    }

    /// `NotSupported` is a stable property of a driver, not a transient failure
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Self::NotSupported)
    }

    /// Stable short name for structured responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::LockTimeout { .. } => "lock_timeout",
            Self::Unavailable(_) => "unavailable",
            Self::Store(_) => "store_error",
            Self::SecretStore(_) => "secret_store_error",
            Self::Corrupt { .. } => "corrupt",
            Self::DriverNotFound(_) => "driver_not_found",
            Self::NotFound(_) => "not_found",
            Self::NotSupported => "not_supported",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InvalidArgument(_) => "invalid_argument",
        }
    }

    /// Client-side mistakes that retrying will not fix
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::DriverNotFound(_)
                | Self::NotFound(_)
                | Self::NotSupported
                | Self::InvalidTransition { .. }
                | Self::InvalidArgument(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ControlError>;
