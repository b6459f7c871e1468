// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session debounce aggregation.
//!
//! Each session moves `Idle -> Buffering -> Flushing -> Idle`. All mutations of
//! a session's buffer happen under its registry entry lock. Every arm bumps the
//! buffer's generation, and a timer only flushes the buffer if the generation
//! it was armed for is still current (`remove_if`), so a new arrival and a
//! firing timer can never both claim the same messages.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use onebridge_config::model::OneBotConfig;
use onebridge_core::traits::DispatchSink;
use onebridge_core::types::{CanonicalMessage, SessionId};
use onebridge_core::BridgeError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Scheduler tuning.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Quiet period after the last fragment before a session flushes.
    pub debounce: Duration,
    /// Messages whose trimmed summary starts with this prefix skip buffering.
    pub command_prefix: String,
}

impl SchedulerSettings {
    pub fn from_config(config: &OneBotConfig) -> Result<Self, BridgeError> {
        let debounce = config.debounce_window().ok_or_else(|| {
            BridgeError::Config(format!(
                "onebot.segment_debounce_seconds must be finite and non-negative, got {}",
                config.segment_debounce_seconds
            ))
        })?;
        Ok(Self {
            debounce,
            command_prefix: config.command_prefix.clone(),
        })
    }
}

/// Why a message skipped buffering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bypass {
    /// Notices, requests and other non-chat events.
    NotChat,
    /// Chat message with neither summary nor components.
    Empty,
    Command,
}

/// Routing decision for a submitted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dispatch(Bypass),
    Buffer,
}

struct SessionBuffer {
    pending: Vec<CanonicalMessage>,
    generation: u64,
    timer: CancellationToken,
}

struct Inner {
    settings: SchedulerSettings,
    sink: Arc<dyn DispatchSink>,
    buffers: DashMap<SessionId, SessionBuffer>,
    next_generation: AtomicU64,
    root: CancellationToken,
}

/// Debounces chat fragments per session and hands finalized messages to a sink.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(settings: SchedulerSettings, sink: Arc<dyn DispatchSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                sink,
                buffers: DashMap::new(),
                next_generation: AtomicU64::new(0),
                root: CancellationToken::new(),
            }),
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.inner.settings
    }

    /// Decides whether `message` is dispatched now or buffered.
    pub fn route(&self, message: &CanonicalMessage) -> Route {
        if !message.category.is_chat() {
            Route::Dispatch(Bypass::NotChat)
        } else if !message.has_content() {
            Route::Dispatch(Bypass::Empty)
        } else if message
            .text_summary
            .trim()
            .starts_with(self.inner.settings.command_prefix.as_str())
        {
            Route::Dispatch(Bypass::Command)
        } else {
            Route::Buffer
        }
    }

    /// Accepts one normalized message. Never blocks and never fails; faults
    /// are logged and absorbed.
    pub fn submit(&self, message: CanonicalMessage) {
        match self.route(&message) {
            Route::Dispatch(Bypass::Command) => {
                info!(
                    session_id = %message.session_id,
                    command = %message.text_summary.trim(),
                    "dispatching command without buffering"
                );
                self.dispatch(message);
            }
            Route::Dispatch(reason) => {
                debug!(session_id = %message.session_id, ?reason, "dispatching without buffering");
                self.dispatch(message);
            }
            Route::Buffer => self.buffer(message),
        }
    }

    fn dispatch(&self, message: CanonicalMessage) {
        let session_id = message.session_id.clone();
        if let Err(e) = self.inner.sink.dispatch(message) {
            error!(session_id = %session_id, error = %e, "failed to dispatch message");
        }
    }

    fn buffer(&self, message: CanonicalMessage) {
        let session_id = message.session_id.clone();

        if self.inner.root.is_cancelled() {
            warn!(session_id = %session_id, "scheduler is shut down, dropping message");
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.discard(
                    &session_id,
                    None,
                    &BridgeError::Scheduling(format!("cannot arm debounce timer: {e}")),
                );
                return;
            }
        };

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let timer = self.inner.root.child_token();

        // Shutdown cancels the root before draining the registry, so checking
        // again under the entry lock keeps late arrivals out of a drained map.
        let entry = self.inner.buffers.entry(session_id.clone());
        if self.inner.root.is_cancelled() {
            drop(entry);
            warn!(session_id = %session_id, "scheduler is shut down, dropping message");
            return;
        }
        let pending = match entry {
            Entry::Occupied(mut entry) => {
                let buffer = entry.get_mut();
                buffer.timer.cancel();
                buffer.pending.push(message);
                buffer.generation = generation;
                buffer.timer = timer.clone();
                buffer.pending.len()
            }
            Entry::Vacant(entry) => {
                entry.insert(SessionBuffer {
                    pending: vec![message],
                    generation,
                    timer: timer.clone(),
                });
                1
            }
        };
        debug!(session_id = %session_id, pending, generation, "debounce timer armed");

        let scheduler = self.clone();
        let debounce = self.inner.settings.debounce;
        runtime.spawn(async move {
            let run = scheduler.run_timer(&session_id, generation, timer, debounce);
            if let Err(panic) = AssertUnwindSafe(run).catch_unwind().await {
                let reason = panic_reason(panic.as_ref());
                scheduler.discard(
                    &session_id,
                    Some(generation),
                    &BridgeError::Scheduling(format!("debounce task panicked: {reason}")),
                );
            }
        });
    }

    async fn run_timer(
        &self,
        session_id: &SessionId,
        generation: u64,
        timer: CancellationToken,
        debounce: Duration,
    ) {
        tokio::select! {
            _ = timer.cancelled() => {
                if self.inner.root.is_cancelled() {
                    debug!(session_id = %session_id, generation, "debounce timer abandoned");
                } else {
                    debug!(session_id = %session_id, generation, "debounce window reset");
                }
            }
            _ = tokio::time::sleep(debounce) => {
                self.flush(session_id, generation);
            }
        }
    }

    /// Takes the session's buffer if it is still at `generation` and
    /// dispatches the merged result. Returns whether a flush happened.
    fn flush(&self, session_id: &SessionId, generation: u64) -> bool {
        let Some((_, buffer)) = self
            .inner
            .buffers
            .remove_if(session_id, |_, buffer| buffer.generation == generation)
        else {
            debug!(session_id = %session_id, generation, "buffer superseded before flush");
            return false;
        };

        let count = buffer.pending.len();
        if let Some(message) = merge_pending(buffer.pending) {
            info!(
                session_id = %session_id,
                count,
                summary = %message.text_summary,
                "flushing aggregated message"
            );
            // The buffer is already out of the registry here, so a panicking
            // sink has to be accounted for before the timer task sees it.
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| self.dispatch(message))) {
                let fault = BridgeError::Scheduling(format!(
                    "sink panicked during flush: {}",
                    panic_reason(panic.as_ref())
                ));
                error!(
                    session_id = %session_id,
                    dropped = count,
                    error = %fault,
                    "scheduling fault, discarding session buffer"
                );
            }
        }
        true
    }

    /// Drops a session's buffer after a scheduling fault. With a generation,
    /// only the buffer that generation armed is dropped.
    fn discard(&self, session_id: &SessionId, generation: Option<u64>, fault: &BridgeError) {
        let removed = match generation {
            Some(generation) => self
                .inner
                .buffers
                .remove_if(session_id, |_, buffer| buffer.generation == generation),
            None => self.inner.buffers.remove(session_id),
        };
        let dropped = removed.map_or(0, |(_, buffer)| {
            buffer.timer.cancel();
            buffer.pending.len()
        });
        error!(
            session_id = %session_id,
            dropped,
            error = %fault,
            "scheduling fault, discarding session buffer"
        );
    }

    /// Cancels every pending window and abandons buffered messages.
    ///
    /// Returns the number of messages abandoned. Later bufferable
    /// submissions are dropped.
    pub fn shutdown(&self) -> usize {
        self.inner.root.cancel();
        let mut sessions = 0;
        let mut abandoned = 0;
        self.inner.buffers.retain(|_, buffer| {
            sessions += 1;
            abandoned += buffer.pending.len();
            false
        });
        if abandoned > 0 {
            warn!(abandoned, sessions, "abandoning buffered messages on shutdown");
        } else {
            debug!("scheduler shut down with no buffered messages");
        }
        abandoned
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.root.is_cancelled()
    }

    /// Number of sessions currently buffering.
    pub fn pending_sessions(&self) -> usize {
        self.inner.buffers.len()
    }

    /// Number of messages buffered for `session_id`.
    pub fn pending_len(&self, session_id: &SessionId) -> usize {
        self.inner
            .buffers
            .get(session_id)
            .map_or(0, |buffer| buffer.pending.len())
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into())
}

/// Merges a session's pending messages in arrival order.
///
/// The first message supplies identity and routing fields; the last supplies
/// `message_id`, `timestamp` and `raw_event`. A single message is returned
/// unchanged.
pub fn merge_pending(pending: Vec<CanonicalMessage>) -> Option<CanonicalMessage> {
    let mut pending = pending.into_iter();
    let mut merged = pending.next()?;

    let mut summaries = Vec::new();
    let mut merged_any = false;
    for message in pending {
        if !merged_any {
            summaries.push(std::mem::take(&mut merged.text_summary));
            merged_any = true;
        }
        merged.component_chain.extend(message.component_chain);
        summaries.push(message.text_summary);
        merged.message_id = message.message_id;
        merged.timestamp = message.timestamp;
        merged.raw_event = message.raw_event;
    }

    if merged_any {
        summaries.retain(|summary| !summary.is_empty());
        merged.text_summary = summaries.join("\n").trim().to_string();
    }
    Some(merged)
}
