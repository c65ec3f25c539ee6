//! Error types for lockwire
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LockwireError
pub type Result<T> = std::result::Result<T, LockwireError>;

/// Unified error type for lockwire operations
#[derive(Debug, Error)]
pub enum LockwireError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    /// The socket could not be established
    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Read/write failed mid-operation (including data timeouts)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A command was issued after an explicit close()
    #[error("Connection is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// The reply stream is corrupt or out of sync
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A well-formed `-` reply from the server
    #[error("Server error: {0}")]
    Remote(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Pool Errors
    // -------------------------------------------------------------------------
    #[error("Pool error: {0}")]
    Pool(String),
}

impl LockwireError {
    /// Whether the server rejected the command (the connection stays usable)
    pub fn is_remote(&self) -> bool {
        matches!(self, LockwireError::Remote(_))
    }

    /// Whether a failed attempt may be repeated on a fresh socket
    pub fn is_retryable(&self) -> bool {
        matches!(self, LockwireError::Connect { .. } | LockwireError::Io(_))
    }

    /// Whether the connection must be reopened before further use
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LockwireError::Connect { .. } | LockwireError::Io(_) | LockwireError::Protocol(_)
        )
    }
}
