//! Error types for phrase table operations.

use common::StorageError;

/// Error type for phrase table operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Storage-related errors from the underlying key-value store.
    Storage(String),

    /// A word index or key could not be encoded or decoded.
    Encoding(String),

    /// Invalid input or parameter errors.
    InvalidInput(String),

    /// Internal errors indicating bugs or invariant violations.
    Internal(String),

    /// Failure reading corpus or configuration files.
    Io(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Storage(msg) => write!(f, "Storage error: {}", msg),
            Error::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Storage(msg) => Error::Storage(msg),
            StorageError::Internal(msg) => Error::Internal(msg),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// Prefixes the message with context while keeping the variant.
    pub(crate) fn context(self, context: impl std::fmt::Display) -> Self {
        match self {
            Error::Storage(msg) => Error::Storage(format!("{}: {}", context, msg)),
            Error::Encoding(msg) => Error::Encoding(format!("{}: {}", context, msg)),
            Error::InvalidInput(msg) => Error::InvalidInput(format!("{}: {}", context, msg)),
            Error::Internal(msg) => Error::Internal(format!("{}: {}", context, msg)),
            Error::Io(msg) => Error::Io(format!("{}: {}", context, msg)),
        }
    }
}

/// Result type alias for phrase table operations.
pub type Result<T> = std::result::Result<T, Error>;
