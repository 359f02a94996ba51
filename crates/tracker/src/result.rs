//! Result and error types for the coverage tracker.

use thiserror::Error;

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors that can occur in the tracker
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Backing store could not be opened or its schema created
    #[error("Storage unavailable at {path}: {message}")]
    StorageUnavailable {
        /// Database location
        path: String,
        /// Error message
        message: String,
    },

    /// A single append failed
    #[error("Failed to persist event: {message}")]
    Persistence {
        /// Error message
        message: String,
    },

    /// Full-table scan failed
    #[error("Failed to query events: {message}")]
    Query {
        /// Error message
        message: String,
    },

    /// Inbound payload was malformed
    #[error("Malformed event: {message}")]
    Deserialization {
        /// Error message
        message: String,
    },

    /// Submission attempted after the forwarder began shutting down
    #[error("Event forwarder is closed")]
    ForwarderClosed,

    /// Remote delivery failed
    #[error("Delivery to {endpoint} failed: {message}")]
    Delivery {
        /// Remote endpoint
        endpoint: String,
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrackerError {
    /// Create a storage unavailable error
    #[must_use]
    pub fn storage_unavailable(path: impl Into<String>, message: impl ToString) -> Self {
        Self::StorageUnavailable {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a persistence error
    #[must_use]
    pub fn persistence(message: impl ToString) -> Self {
        Self::Persistence {
            message: message.to_string(),
        }
    }

    /// Create a query error
    #[must_use]
    pub fn query(message: impl ToString) -> Self {
        Self::Query {
            message: message.to_string(),
        }
    }

    /// Create a deserialization error
    #[must_use]
    pub fn deserialization(message: impl ToString) -> Self {
        Self::Deserialization {
            message: message.to_string(),
        }
    }

    /// Create a delivery error
    #[must_use]
    pub fn delivery(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Delivery {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// True when the caller supplied bad input rather than the server failing
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Deserialization { .. })
    }
}
