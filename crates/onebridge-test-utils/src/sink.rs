// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch sink that records every finalized message.

use std::sync::Mutex;
use std::time::Duration;

use onebridge_core::traits::DispatchSink;
use onebridge_core::types::CanonicalMessage;
use onebridge_core::BridgeError;
use tokio::sync::Notify;

/// Captures dispatched messages for assertions.
#[derive(Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<CanonicalMessage>>,
    notify: Notify,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages dispatched so far, in dispatch order.
    pub fn messages(&self) -> Vec<CanonicalMessage> {
        self.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Wait until at least `count` messages arrived, or `timeout` elapsed.
    ///
    /// Returns the messages if the count was reached.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Option<Vec<CanonicalMessage>> {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.count() >= count {
                    return self.messages();
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.ok()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CanonicalMessage>> {
        match self.messages.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl DispatchSink for CollectingSink {
    fn dispatch(&self, message: CanonicalMessage) -> Result<(), BridgeError> {
        self.lock().push(message);
        self.notify.notify_waiters();
        Ok(())
    }
}
