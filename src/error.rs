//!
//! Defines error types for the clocked logger, its codecs and its sinks.

use crate::types::ProcessId;

/// Errors surfaced by logging, encoding, decoding and persistence operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    /// The payload cannot be represented by the active codec.
    #[error("Encoding error: {0}")]
    Encoding(String),
    /// Malformed bytes, or a payload that does not fit the requested target type.
    #[error("Decoding error: {0}")]
    Decoding(String),
    /// The persistence sink failed to write. Recoverable.
    #[error("Sink error: {0}")]
    Sink(String),
    /// A logger could not find its own process id in its own clock.
    /// Indicates earlier corruption; never fatal.
    #[error("Process {pid} is missing from its own vector clock")]
    ConsistencyWarning { pid: ProcessId },
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type LogResult<T> = Result<T, LogError>;

impl From<rmp_serde::encode::Error> for LogError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        LogError::Encoding(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for LogError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        LogError::Decoding(e.to_string())
    }
}

impl From<std::io::Error> for LogError {
    fn from(e: std::io::Error) -> Self {
        LogError::Sink(e.to_string())
    }
}

impl From<toml::de::Error> for LogError {
    fn from(e: toml::de::Error) -> Self {
        LogError::Config(e.to_string())
    }
}
