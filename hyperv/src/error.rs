//! Error types for VM security operations

use core::fmt;
use std::time::Duration;

use thiserror::Error;

/// Classification of failure types for retry logic and error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Transient failure - operation may succeed if retried.
    Transient,
    /// Permanent failure - retrying will not help.
    Permanent,
    /// Authentication/authorization failure.
    AuthenticationFailed,
    /// Configuration error - fix configuration and retry.
    Configuration,
    /// Network-related failure.
    Network,
    /// Unknown failure type.
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Transient => write!(f, "Transient"),
            FailureType::Permanent => write!(f, "Permanent"),
            FailureType::AuthenticationFailed => write!(f, "AuthenticationFailed"),
            FailureType::Configuration => write!(f, "Configuration"),
            FailureType::Network => write!(f, "Network"),
            FailureType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// VM security operation errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before anything was sent to the host.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// More than one security setting was supplied for a single VM.
    #[error("Only 1 vm security setting allowed per a vm ('{vm_name}' was given {count})")]
    TooManySettings { vm_name: String, count: usize },

    /// Failed to encode a command payload.
    #[error("Failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// The host answered with something that does not decode.
    #[error("Failed to decode host response: {message}")]
    Decode { message: String, payload: String },

    /// The remote command ran and failed.
    #[error("Remote command '{operation}' failed: {message}")]
    Remote { operation: String, message: String },

    /// The Hyper-V PowerShell module is missing on the target.
    #[error("Hyper-V PowerShell module is not available on the target host")]
    ModuleNotAvailable,

    /// The caller lacks rights on the target host.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The executor gave up waiting for the remote command.
    #[error("Operation '{operation}' timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    /// IO error (process spawn, pipes, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the failure type classification for this error.
    pub fn failure_type(&self) -> FailureType {
        match self {
            Error::Validation { .. } => FailureType::Configuration,
            Error::TooManySettings { .. } => FailureType::Configuration,
            Error::Encode(_) => FailureType::Permanent,
            Error::Decode { .. } => FailureType::Permanent,
            Error::Remote { .. } => FailureType::Unknown,
            Error::ModuleNotAvailable => FailureType::Permanent,
            Error::AccessDenied(_) => FailureType::AuthenticationFailed,
            Error::Timeout { .. } => FailureType::Transient,
            Error::Io(_) => FailureType::Network,
        }
    }

    /// Check if the error is transient and operation may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.failure_type(),
            FailureType::Transient | FailureType::Network
        )
    }

    /// Check if the error is permanent and retrying will not help.
    pub fn is_permanent(&self) -> bool {
        self.failure_type() == FailureType::Permanent
    }

    /// Check if the error was raised locally, before any remote call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. } | Error::TooManySettings { .. })
    }

    /// Create a validation error.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a remote failure for the named command.
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Remote {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a decode error, keeping at most 500 characters of the payload.
    pub fn decode(message: impl Into<String>, payload: &str) -> Self {
        Error::Decode {
            message: message.into(),
            payload: payload.chars().take(500).collect(),
        }
    }
}

/// Result type for VM security operations.
pub type Result<T> = core::result::Result<T, Error>;
