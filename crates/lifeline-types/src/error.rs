use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("object id must not be empty")]
    EmptyObjectId,

    #[error("timestamp must be finite, got {0}")]
    NonFiniteTimestamp(String),
}
