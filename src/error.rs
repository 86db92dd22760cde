use std::error::Error as StdError;

use thiserror::Error;

/// Autocut's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Autocut's crate-wide error type.
///
/// This is intentionally decoupled from `anyhow` so downstream libraries aren't forced to
/// adopt `anyhow` in their own public APIs.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is out of range. Raised before any processing starts.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The probability model produced a value outside `[0, 1]` (or a non-finite one).
    #[error("invalid speech probability {value} at window {index}")]
    InvalidProbability { index: usize, value: f32 },

    /// A probability trace whose declared audio length disagrees with its window count.
    #[error("invalid probability trace: {0}")]
    InvalidTrace(String),

    /// A record reached the subtitle assembler with `start >= end`.
    #[error("invalid record at position {position}: start {start} is not before end {end}")]
    InvalidRecord { position: usize, start: f64, end: f64 },

    /// The host requested cancellation between transcriber calls.
    #[error("transcription cancelled")]
    Cancelled,

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<hound::Error> for Error {
    fn from(err: hound::Error) -> Self {
        Self::Other(Box::new(err))
    }
}
