// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OneBot v11 channel adapter for onebridge.
//!
//! [`OneBotChannel`] subscribes to a transport's events, normalizes each one
//! into a [`CanonicalMessage`](onebridge_core::CanonicalMessage), and feeds it
//! through the per-session [`Scheduler`] to a dispatch sink.

pub mod aggregate;
pub mod api;
pub mod event;
pub mod http;
pub mod normalize;
pub mod registry;
pub mod resolve;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use onebridge_config::model::OneBotConfig;
use onebridge_core::traits::{DispatchSink, PluginAdapter};
use onebridge_core::types::{AdapterType, HealthStatus};
use onebridge_core::BridgeError;
use tracing::{debug, info};

pub use aggregate::{Scheduler, SchedulerSettings};
pub use api::OneBotApi;
pub use event::{EventKind, RawEvent};
pub use http::HttpApi;
pub use normalize::{Normalizer, NormalizerSettings};
pub use source::{EventHandler, EventSource, HandlerTable};

/// The adapter: normalizer and scheduler wired between a transport and a sink.
pub struct OneBotChannel {
    name: String,
    normalizer: Normalizer,
    scheduler: Scheduler,
}

impl OneBotChannel {
    /// Builds the adapter from `[onebot]` settings.
    ///
    /// Fails if the configured debounce window is not a valid duration.
    pub fn new(
        config: &OneBotConfig,
        name: impl Into<String>,
        api: Arc<dyn OneBotApi>,
        sink: Arc<dyn DispatchSink>,
    ) -> Result<Self, BridgeError> {
        let scheduler = Scheduler::new(SchedulerSettings::from_config(config)?, sink);
        Ok(Self {
            name: name.into(),
            normalizer: Normalizer::new(api, NormalizerSettings::from(config)),
            scheduler,
        })
    }

    /// Registers this adapter for every event kind on `source`.
    pub fn attach(self: &Arc<Self>, source: &dyn EventSource) {
        for kind in EventKind::ALL {
            source.subscribe(kind, self.clone());
        }
        info!(adapter = %self.name, "subscribed to transport events");
    }

    /// Normalizes one event and submits the result to the scheduler.
    pub async fn ingest(&self, event: RawEvent) {
        match self.normalizer.normalize(event).await {
            Some(message) => self.scheduler.submit(message),
            None => debug!("event discarded during normalization"),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}

#[async_trait]
impl EventHandler for OneBotChannel {
    async fn handle_event(&self, event: RawEvent) {
        self.ingest(event).await;
    }
}

#[async_trait]
impl PluginAdapter for OneBotChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, BridgeError> {
        if self.scheduler.is_shut_down() {
            Ok(HealthStatus::Unhealthy("scheduler has been shut down".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), BridgeError> {
        let abandoned = self.scheduler.shutdown();
        debug!(adapter = %self.name, abandoned, "OneBot channel shut down");
        Ok(())
    }
}
