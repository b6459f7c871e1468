// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline testing.
//!
//! `TestHarness` wires a [`MockTransport`], a [`OneBotChannel`] and a
//! [`CollectingSink`] together the way the binary wires the real pieces, so
//! tests drive the pipeline by emitting raw events.

use std::sync::Arc;

use onebridge_config::model::OneBotConfig;
use onebridge_core::BridgeError;
use onebridge_onebot::OneBotChannel;
use serde_json::Value;

use crate::mock_transport::MockTransport;
use crate::sink::CollectingSink;

/// Builder for configuring the pipeline under test.
pub struct TestHarnessBuilder {
    config: OneBotConfig,
    transport: MockTransport,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: OneBotConfig::default(),
            transport: MockTransport::new(),
        }
    }

    /// Use these `[onebot]` settings instead of the defaults.
    pub fn with_config(mut self, config: OneBotConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the debounce window in seconds.
    pub fn with_debounce_secs(mut self, seconds: f64) -> Self {
        self.config.segment_debounce_seconds = seconds;
        self
    }

    /// Use a pre-scripted transport.
    pub fn with_transport(mut self, transport: MockTransport) -> Self {
        self.transport = transport;
        self
    }

    /// Build the harness and subscribe the adapter to the transport.
    pub fn build(self) -> Result<TestHarness, BridgeError> {
        let transport = Arc::new(self.transport);
        let sink = Arc::new(CollectingSink::new());
        let channel = Arc::new(OneBotChannel::new(
            &self.config,
            "onebot-test",
            transport.clone(),
            sink.clone(),
        )?);
        channel.attach(transport.as_ref());

        Ok(TestHarness {
            transport,
            sink,
            channel,
        })
    }
}

/// A wired pipeline: mock transport in, collecting sink out.
pub struct TestHarness {
    /// The scripted transport events are emitted through.
    pub transport: Arc<MockTransport>,
    /// Receives every finalized message.
    pub sink: Arc<CollectingSink>,
    /// The adapter under test.
    pub channel: Arc<OneBotChannel>,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Emit a raw event through the transport and wait for normalization to finish.
    ///
    /// Returns `false` if no handler accepted the event.
    pub async fn emit(&self, event: Value) -> bool {
        self.transport.emit(event).await
    }
}
