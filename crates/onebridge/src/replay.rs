// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `onebridge replay` command implementation.
//!
//! Reads recorded raw events (one JSON object per line), routes them through
//! a [`OneBotChannel`] exactly as a live transport would, and writes every
//! finalized message as one JSON line. Debounce windows are honored: the
//! command waits for open sessions to flush before exiting, unless a shutdown
//! signal abandons them first.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use onebridge_config::BridgeConfig;
use onebridge_core::types::CanonicalMessage;
use onebridge_core::{BridgeError, QueueSink};
use onebridge_onebot::{HandlerTable, HttpApi, OneBotApi, OneBotChannel, RawEvent};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::offline::OfflineApi;
use crate::shutdown;

/// How often to check whether every session has flushed.
const SETTLE_POLL: Duration = Duration::from_millis(50);

/// Counters reported when a replay finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    /// Non-blank input lines.
    pub events: usize,
    /// Lines that were not valid JSON.
    pub malformed: usize,
    /// Events no handler accepted (meta events, unknown post types).
    pub unrouted: usize,
    /// Finalized messages written to the output.
    pub emitted: usize,
    /// Buffered messages dropped by an interrupted replay.
    pub abandoned: usize,
}

/// Runs the `onebridge replay` command against `path`, writing to stdout.
pub async fn run_replay(config: &BridgeConfig, path: &Path) -> Result<ReplayStats, BridgeError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| BridgeError::Internal(format!("cannot open {}: {e}", path.display())))?;

    let api: Arc<dyn OneBotApi> = match HttpApi::from_config(&config.onebot)? {
        Some(api) => {
            info!("enrichment calls go to the configured OneBot HTTP API");
            Arc::new(api)
        }
        None => {
            warn!("onebot.api_base_url is not set; mentions, files and quotes will not be enriched");
            Arc::new(OfflineApi)
        }
    };

    let cancel = shutdown::install_signal_handler();
    let mut stdout = std::io::stdout();
    replay_events(config, api, BufReader::new(file), &mut stdout, cancel).await
}

/// Replays `input` through a fresh adapter and writes finalized messages to `out`.
pub async fn replay_events<R, W>(
    config: &BridgeConfig,
    api: Arc<dyn OneBotApi>,
    input: R,
    out: &mut W,
    cancel: CancellationToken,
) -> Result<ReplayStats, BridgeError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let (sink, mut rx) = QueueSink::channel();
    let source = HandlerTable::new();
    let channel = Arc::new(OneBotChannel::new(
        &config.onebot,
        config.bridge.name.clone(),
        api,
        Arc::new(sink),
    )?);
    channel.attach(&source);

    let mut stats = ReplayStats::default();
    let mut lines = input.lines();
    let mut line_no = 0usize;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line
                .map_err(|e| BridgeError::Internal(format!("failed to read events: {e}")))?,
            _ = cancel.cancelled() => break,
        };
        let Some(line) = line else { break };
        line_no += 1;

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.events += 1;

        let event: Value = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed event line");
                stats.malformed += 1;
                continue;
            }
        };
        if !source.route(RawEvent::from(event)).await {
            debug!(line = line_no, "event not routed");
            stats.unrouted += 1;
        }
        stats.emitted += drain_ready(&mut rx, out)?;
    }

    let scheduler = channel.scheduler().clone();
    while scheduler.pending_sessions() > 0 {
        tokio::select! {
            Some(message) = rx.recv() => {
                write_message(out, &message)?;
                stats.emitted += 1;
            }
            _ = tokio::time::sleep(SETTLE_POLL) => {}
            _ = cancel.cancelled() => break,
        }
    }
    stats.abandoned = scheduler.shutdown();

    // The queue closes once the last scheduler handle, including those held
    // by exiting timer tasks, is gone.
    drop(scheduler);
    drop(source);
    drop(channel);
    while let Some(message) = rx.recv().await {
        write_message(out, &message)?;
        stats.emitted += 1;
    }

    Ok(stats)
}

fn drain_ready<W: Write>(
    rx: &mut UnboundedReceiver<CanonicalMessage>,
    out: &mut W,
) -> Result<usize, BridgeError> {
    let mut written = 0;
    while let Ok(message) = rx.try_recv() {
        write_message(out, &message)?;
        written += 1;
    }
    Ok(written)
}

fn write_message<W: Write>(out: &mut W, message: &CanonicalMessage) -> Result<(), BridgeError> {
    let line = serde_json::to_string(message)
        .map_err(|e| BridgeError::Internal(format!("failed to serialize message: {e}")))?;
    writeln!(out, "{line}")
        .and_then(|()| out.flush())
        .map_err(|e| BridgeError::Internal(format!("failed to write output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use onebridge_test_utils::events;

    fn input(lines: &[String]) -> BufReader<std::io::Cursor<Vec<u8>>> {
        BufReader::new(std::io::Cursor::new(lines.join("\n").into_bytes()))
    }

    fn output_lines(out: &[u8]) -> Vec<Value> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn replay_merges_fragments_and_bypasses_commands() {
        let lines = vec![
            events::group_text("100", "42", "hi").to_string(),
            events::group_text("100", "42", "there").to_string(),
            String::new(),
            events::group_text("200", "43", "/ping").to_string(),
            events::heartbeat().to_string(),
            "{not json".to_string(),
        ];
        let mut out = Vec::new();

        let stats = replay_events(
            &BridgeConfig::default(),
            Arc::new(OfflineApi),
            input(&lines),
            &mut out,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(
            stats,
            ReplayStats {
                events: 5,
                malformed: 1,
                unrouted: 1,
                emitted: 2,
                abandoned: 0,
            }
        );
        let written = output_lines(&out);
        assert_eq!(written[0]["text_summary"], "/ping");
        assert_eq!(written[1]["text_summary"], "hi\nthere");
        assert_eq!(written[1]["session_id"], "100");
        assert!(written[1].get("raw_event").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn interrupted_replay_abandons_open_sessions() {
        let lines = vec![events::group_text("100", "42", "draft").to_string()];
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let mut out = Vec::new();
        let stats = replay_events(
            &BridgeConfig::default(),
            Arc::new(OfflineApi),
            input(&lines),
            &mut out,
            cancel,
        )
        .await
        .unwrap();

        assert_eq!(stats.abandoned, 1);
        assert_eq!(stats.emitted, 0);
        assert!(out.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unenriched_mention_keeps_its_target() {
        let lines = vec![
            events::group_message("100", "42", vec![events::at("7"), events::text("/hey")])
                .to_string(),
        ];
        let mut out = Vec::new();

        replay_events(
            &BridgeConfig::default(),
            Arc::new(OfflineApi),
            input(&lines),
            &mut out,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let written = output_lines(&out);
        let chain = written[0]["component_chain"].as_array().unwrap();
        assert_eq!(chain[0]["type"], "at");
        assert_eq!(chain[0]["target_id"], "7");
        assert_eq!(chain[0]["display_name"], "");
    }
}
