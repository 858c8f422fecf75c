//! Common error types for the SMIL player

use thiserror::Error;

/// Common result type for SMIL player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the scheduler crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document could not be decoded into a node tree
    #[error("Document error: {0}")]
    Document(#[from] serde_json::Error),

    /// Malformed begin/end/dur/repeatCount expression
    #[error("Invalid time expression: {0}")]
    InvalidTime(String),
}
