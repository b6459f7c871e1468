// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The committed boundary between the inbound core and the host pipeline.

use crate::error::BridgeError;
use crate::types::CanonicalMessage;

/// Receives finalized messages, exactly one per logical (possibly merged) input.
///
/// `dispatch` must not block: implementations enqueue and return.
pub trait DispatchSink: Send + Sync {
    fn dispatch(&self, message: CanonicalMessage) -> Result<(), BridgeError>;
}
