// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue-backed [`DispatchSink`] feeding an unbounded tokio channel.

use tokio::sync::mpsc;

use crate::error::BridgeError;
use crate::traits::DispatchSink;
use crate::types::CanonicalMessage;

/// Enqueues finalized messages for a host pipeline consumer.
#[derive(Debug, Clone)]
pub struct QueueSink {
    tx: mpsc::UnboundedSender<CanonicalMessage>,
}

impl QueueSink {
    /// Creates a sink and the receiver the host pipeline drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CanonicalMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DispatchSink for QueueSink {
    fn dispatch(&self, message: CanonicalMessage) -> Result<(), BridgeError> {
        self.tx
            .send(message)
            .map_err(|e| BridgeError::Dispatch(format!("pipeline queue closed: {e}")))
    }
}
