// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::BridgeConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.bridge.name.trim().is_empty() {
        fail("bridge.name must not be empty".to_string());
    }

    let level = config.bridge.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        fail(format!(
            "bridge.log_level `{}` is not one of {}",
            config.bridge.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let onebot = &config.onebot;
    if onebot.debounce_window().is_none() {
        fail(format!(
            "onebot.segment_debounce_seconds must be a finite, non-negative number, got {}",
            onebot.segment_debounce_seconds
        ));
    }

    if onebot.command_prefix.trim().is_empty() {
        fail("onebot.command_prefix must contain a non-whitespace character".to_string());
    } else if onebot.command_prefix.trim() != onebot.command_prefix {
        fail(format!(
            "onebot.command_prefix `{}` must not start or end with whitespace",
            onebot.command_prefix
        ));
    }

    if let Some(url) = &onebot.api_base_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        fail(format!(
            "onebot.api_base_url `{url}` must start with http:// or https://"
        ));
    }

    if onebot.api_timeout_secs == 0 {
        fail("onebot.api_timeout_secs must be at least 1".to_string());
    }

    for (i, id) in onebot.blocked_senders.iter().enumerate() {
        if id.trim().is_empty() {
            fail(format!("onebot.blocked_senders[{i}] must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
