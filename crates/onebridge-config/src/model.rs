// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sender id of the platform's system-manager account, whose chat messages
/// are never forwarded.
pub const SYSTEM_MANAGER_ID: &str = "2854196310";

/// Top-level onebridge configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Instance identity and logging.
    #[serde(default)]
    pub bridge: BridgeSection,

    /// OneBot adapter behavior.
    #[serde(default)]
    pub onebot: OneBotConfig,
}

/// Instance identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeSection {
    /// Name of this adapter instance.
    #[serde(default = "default_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_name() -> String {
    "onebridge".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// OneBot adapter configuration: aggregation, session scoping and transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OneBotConfig {
    /// Quiet period, in seconds, after the last fragment before a session flushes.
    #[serde(default = "default_debounce_seconds")]
    pub segment_debounce_seconds: f64,

    /// Scope group sessions per sender instead of per group.
    #[serde(default)]
    pub unique_session: bool,

    /// Messages whose trimmed text starts with this prefix skip aggregation.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Sender ids whose chat messages are discarded.
    #[serde(default = "default_blocked_senders")]
    pub blocked_senders: Vec<String>,

    /// Resolve quoted messages through the transport.
    #[serde(default = "default_true")]
    pub fetch_quoted_messages: bool,

    /// Base URL of a OneBot HTTP API used for enrichment calls.
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Bearer token for the HTTP API.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Per-action timeout for transport calls.
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
}

impl Default for OneBotConfig {
    fn default() -> Self {
        Self {
            segment_debounce_seconds: default_debounce_seconds(),
            unique_session: false,
            command_prefix: default_command_prefix(),
            blocked_senders: default_blocked_senders(),
            fetch_quoted_messages: true,
            api_base_url: None,
            access_token: None,
            api_timeout_secs: default_api_timeout_secs(),
        }
    }
}

impl OneBotConfig {
    /// The debounce window, or `None` if the configured seconds are negative or not finite.
    pub fn debounce_window(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.segment_debounce_seconds).ok()
    }

    /// Per-action transport timeout.
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

fn default_debounce_seconds() -> f64 {
    10.0
}

fn default_command_prefix() -> String {
    "/".to_string()
}

fn default_blocked_senders() -> Vec<String> {
    vec![SYSTEM_MANAGER_ID.to_string()]
}

fn default_true() -> bool {
    true
}

fn default_api_timeout_secs() -> u64 {
    180
}
