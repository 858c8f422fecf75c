//! Error types for smil-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Collaborator traits (renderer, document provider) return `anyhow::Result` so
//! embedders can plug in their own error types; those failures are wrapped here
//! only when they become fatal to a document cycle.

use thiserror::Error;

/// Main error type for smil-player
#[derive(Error, Debug)]
pub enum Error {
    /// Bootstrap configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shared model errors (time expressions, document decoding)
    #[error(transparent)]
    Common(#[from] smil_common::Error),

    /// Scheduling engine errors
    #[error("Playback error: {0}")]
    Playback(String),
}

/// Convenience Result type using smil-player Error
pub type Result<T> = std::result::Result<T, Error>;
