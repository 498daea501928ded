//! Error types shared by every Brass crate.
//!
//! Framework-level errors (load failures, dispatch bookkeeping) live in
//! `brass-framework`; configuration and runtime errors in `brass-runtime`.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors reported by a [`Transport`](crate::transport::Transport) implementation.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The connection to the chat service was closed.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// Sending or editing a reply failed.
    #[error("failed to send reply: {0}")]
    SendFailed(String),

    /// The capability lookup for a principal failed.
    #[error("capability lookup failed for {principal} in scope '{scope}': {reason}")]
    CapabilityLookup {
        /// The principal whose grants were requested.
        principal: String,
        /// The scope the lookup ran in.
        scope: String,
        /// Reason for failure.
        reason: String,
    },

    /// Bulk command registration was rejected by the service.
    #[error("bulk registration rejected: {0}")]
    RegistrationRejected(String),

    /// The transport does not support the requested operation.
    #[error("operation '{operation}' is not supported by this transport")]
    Unsupported {
        /// Name of the operation.
        operation: &'static str,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Failed to serialize/deserialize a payload.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
