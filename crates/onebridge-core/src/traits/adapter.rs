// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait shared by channel adapters and transports.

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, health and lifecycle for every pluggable adapter.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the kind of adapter.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, BridgeError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), BridgeError>;
}
