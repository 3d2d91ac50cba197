use thiserror::Error;

use crate::models::OperationStatus;

/// Errors surfaced by the client, managers, poller, and query engine.
///
/// Nothing in this crate retries automatically; every failure reaches the
/// immediate caller as one of these variants.
#[derive(Debug, Error)]
pub enum Error {
    /// Fatal setup problem such as a missing API key. Raised at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Polling exceeded the timeout. The remote operation keeps running.
    #[error("operation \"{name}\" timed out after {timeout_ms}ms")]
    OperationTimeout { name: String, timeout_ms: u64 },

    /// The remote operation finished in an error state.
    #[error("operation \"{name}\" failed: {error}")]
    OperationFailed {
        name: String,
        error: OperationStatus,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Any other non-success answer from the remote service.
    #[error("remote API error {code}: {message}")]
    Api { code: u16, message: String },

    /// The request never produced a response (connect, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with a body this crate could not interpret.
    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used by the CLI and HTTP adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    OperationTimeout,
    OperationFailed,
    NotFound,
    PreconditionFailed,
    InvalidArgument,
    Remote,
    Internal,
}

impl ErrorKind {
    /// Machine-readable code used in HTTP error bodies.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::OperationTimeout => "operation_timeout",
            ErrorKind::OperationFailed => "operation_failed",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PreconditionFailed => "precondition_failed",
            ErrorKind::InvalidArgument => "bad_request",
            ErrorKind::Remote => "remote_error",
            ErrorKind::Internal => "internal",
        }
    }

    /// Only validation failures are the caller's fault.
    pub fn is_client_error(self) -> bool {
        matches!(self, ErrorKind::InvalidArgument)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::OperationTimeout { .. } => ErrorKind::OperationTimeout,
            Error::OperationFailed { .. } => ErrorKind::OperationFailed,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Api { .. } | Error::Transport(_) | Error::Decode(_) => ErrorKind::Remote,
            Error::Io(_) => ErrorKind::Internal,
        }
    }
}
