// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the onebridge workspace.

use thiserror::Error;

/// The primary error type shared by the transport, normalizer, scheduler and sinks.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors (invalid values, missing required settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// A transport action failed (network failure, non-ok status, bad payload).
    #[error("transport action `{action}` failed: {message}")]
    Transport {
        action: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The raw event does not have the shape the protocol promises.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The dispatch sink refused a finalized message.
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// Arming or running a debounce timer failed.
    #[error("scheduling error: {0}")]
    Scheduling(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Shorthand for a transport failure without an underlying source error.
    pub fn transport(action: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::Transport {
            action: action.into(),
            message: message.into(),
            source: None,
        }
    }
}
