// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `onebridge check-config` command implementation.
//!
//! Configuration has already loaded and validated by the time this runs; the
//! checks here report the effective settings and contact the OneBot HTTP API.

use std::time::{Duration, Instant};

use onebridge_config::BridgeConfig;
use onebridge_core::traits::PluginAdapter;
use onebridge_core::types::HealthStatus;
use onebridge_onebot::{HttpApi, SchedulerSettings};

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Runs every check and prints a report. Returns `false` if any check failed.
pub async fn run_check(config: &BridgeConfig) -> bool {
    let results = vec![check_aggregation(config), check_transport(config).await];

    println!();
    println!("  onebridge check-config ({})", config.bridge.name);
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;
    for result in &results {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => {
                warn_count += 1;
                "[WARN]"
            }
            CheckStatus::Fail => {
                fail_count += 1;
                "[FAIL]"
            }
        };
        println!(
            "    {tag} {:<14} {} ({}ms)",
            result.name,
            result.message,
            result.duration.as_millis()
        );
    }
    println!();

    match (fail_count, warn_count) {
        (0, 0) => println!("  All checks passed."),
        (fails, warns) => println!("  {fails} failed, {warns} warning(s)."),
    }
    println!();

    fail_count == 0
}

/// Reports the effective debounce and session settings.
fn check_aggregation(config: &BridgeConfig) -> CheckResult {
    let start = Instant::now();
    match SchedulerSettings::from_config(&config.onebot) {
        Ok(settings) => CheckResult::new(
            "Aggregation",
            CheckStatus::Pass,
            format!(
                "debounce {:?}, command prefix {:?}, {} session scope",
                settings.debounce,
                settings.command_prefix,
                if config.onebot.unique_session {
                    "per-sender"
                } else {
                    "per-group"
                }
            ),
            start,
        ),
        Err(e) => CheckResult::new("Aggregation", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Checks that the configured OneBot HTTP API answers.
async fn check_transport(config: &BridgeConfig) -> CheckResult {
    let start = Instant::now();
    let api = match HttpApi::from_config(&config.onebot) {
        Ok(Some(api)) => api,
        Ok(None) => {
            return CheckResult::new(
                "OneBot API",
                CheckStatus::Warn,
                "api_base_url not set; enrichment disabled",
                start,
            );
        }
        Err(e) => return CheckResult::new("OneBot API", CheckStatus::Fail, e.to_string(), start),
    };

    match api.health_check().await {
        Ok(HealthStatus::Healthy) => {
            CheckResult::new("OneBot API", CheckStatus::Pass, "reachable", start)
        }
        Ok(HealthStatus::Degraded(reason)) => {
            CheckResult::new("OneBot API", CheckStatus::Warn, reason, start)
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            CheckResult::new("OneBot API", CheckStatus::Fail, reason, start)
        }
        Err(e) => CheckResult::new("OneBot API", CheckStatus::Fail, e.to_string(), start),
    }
}
