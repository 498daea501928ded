//! Error types for the Brass framework.

use thiserror::Error;

/// Errors raised while loading handler sources.
///
/// None of these abort a load: each one is logged, counted as a failure in
/// the [`LoadReport`](crate::loader::LoadReport), and the batch continues.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// A descriptor was produced but has the wrong shape.
    #[error("invalid {kind} '{source_name}': {reason}")]
    Validation {
        /// What was being loaded ("command", "slash command", "event").
        kind: &'static str,
        /// Category/module of the offending source.
        source_name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The source failed to produce a descriptor (returned an error or panicked).
    #[error("failed to construct '{source_name}': {reason}")]
    Construct {
        /// Category/module of the offending source.
        source_name: String,
        /// Error or panic message.
        reason: String,
    },

    /// Submitting slash command data to the transport failed.
    #[error("slash command registration failed: {0}")]
    Registration(String),

    /// A credential required for registration is not configured.
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Why an invocation did not complete.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The prerequisite gate refused the invocation.
    #[error("denied: {0:?}")]
    Denied(crate::gate::Denial),

    /// The handler returned an error.
    #[error("{0:#}")]
    Failed(anyhow::Error),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Something around the handler panicked, such as the gate.
    #[error("dispatch panicked: {0}")]
    System(String),
}

impl InvokeError {
    /// Returns the error text shown to elevated users.
    pub fn detail(&self) -> String {
        match self {
            Self::Failed(err) => err.to_string(),
            other => other.to_string(),
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
