//! Error types for the shell engine.
//!
//! A single error type covers console I/O, configuration files, cancellation
//! and failures reported by commands while they execute.

use thiserror::Error;

/// Errors produced by the shell engine and by commands it runs.
#[derive(Debug, Error)]
pub enum ShellError {
    /// Console, history file or terminal I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The operation observed a cancelled [`CancelToken`](crate::CancelToken).
    #[error("operation cancelled")]
    Cancelled,

    /// A command failed; the message is shown to the user as-is.
    #[error("{0}")]
    Command(String),

    /// Any other error raised by a command implementation.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ShellError {
    /// Shorthand for [`ShellError::Command`].
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command(message.into())
    }

    /// `true` for [`ShellError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Convenience alias for results with [`ShellError`].
pub type Result<T> = std::result::Result<T, ShellError>;
