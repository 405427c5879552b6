//! Common error type.

/// Errors produced while parsing shared types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The value is not a valid platform identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

/// Result alias using the common [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
