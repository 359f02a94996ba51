//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Server startup or runtime error
    #[error("Server error: {message}")]
    Server {
        /// Error message
        message: String,
    },

    /// Harvest produced no event
    #[error("Harvest failed: {message}")]
    Harvest {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tracker library error
    #[error("Tracker error: {0}")]
    Tracker(#[from] coverage_tracker::TrackerError),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a server error
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Create a harvest error
    #[must_use]
    pub fn harvest(message: impl Into<String>) -> Self {
        Self::Harvest {
            message: message.into(),
        }
    }
}
