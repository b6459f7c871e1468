// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for onebridge.
//!
//! Holds the canonical message model every protocol adapter normalizes into,
//! the workspace error type, and the dispatch boundary toward the host
//! pipeline.

pub mod error;
pub mod queue;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BridgeError;
pub use queue::QueueSink;
pub use traits::{DispatchSink, PluginAdapter};
pub use types::{
    AdapterType, CanonicalMessage, ChainBuilder, Component, HealthStatus, MessageCategory,
    MessageId, ReplyRef, Sender, SessionId,
};
