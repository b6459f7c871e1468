// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock OneBot transport for deterministic testing.
//!
//! `MockTransport` answers enrichment actions from scripted tables, records
//! every call, captures diagnostic replies, and routes emitted events to the
//! handlers subscribed through [`EventSource`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use onebridge_core::traits::PluginAdapter;
use onebridge_core::types::{AdapterType, HealthStatus};
use onebridge_core::BridgeError;
use onebridge_onebot::api::{FileUrl, MemberInfo, OneBotApi, ReplyTarget, StrangerInfo};
use onebridge_onebot::{EventHandler, EventKind, EventSource, HandlerTable, RawEvent};
use serde_json::Value;

/// One recorded transport action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCall {
    pub action: String,
    pub args: Vec<String>,
}

impl ActionCall {
    fn new(action: &str, args: &[&str]) -> Self {
        Self {
            action: action.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// A scripted OneBot transport.
///
/// Unscripted lookups fail with [`BridgeError::Transport`], as do actions
/// registered with [`MockTransport::fail_action`].
#[derive(Default)]
pub struct MockTransport {
    messages: HashMap<String, Value>,
    members: HashMap<(String, String), MemberInfo>,
    strangers: HashMap<String, StrangerInfo>,
    files: HashMap<String, FileUrl>,
    delays: HashMap<String, Duration>,
    failing: Mutex<HashSet<String>>,
    calls: Arc<Mutex<Vec<ActionCall>>>,
    sent: Arc<Mutex<Vec<(ReplyTarget, String)>>>,
    handlers: HandlerTable,
}

impl MockTransport {
    /// Create a transport with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the raw event returned by `get_msg` for `message_id`.
    pub fn with_message(mut self, message_id: &str, event: Value) -> Self {
        self.messages.insert(message_id.to_string(), event);
        self
    }

    /// Script a group member profile.
    pub fn with_member(mut self, group_id: &str, user_id: &str, card: &str, nickname: &str) -> Self {
        self.members.insert(
            (group_id.to_string(), user_id.to_string()),
            MemberInfo {
                card: card.to_string(),
                nickname: nickname.to_string(),
            },
        );
        self
    }

    /// Script a global profile.
    pub fn with_stranger(mut self, user_id: &str, nickname: &str) -> Self {
        self.strangers.insert(
            user_id.to_string(),
            StrangerInfo {
                nick: String::new(),
                nickname: nickname.to_string(),
            },
        );
        self
    }

    /// Script the download URL for a file id (group and private lookups alike).
    pub fn with_file(mut self, file_id: &str, url: &str, name: &str) -> Self {
        self.files.insert(
            file_id.to_string(),
            FileUrl {
                url: Some(url.to_string()),
                file_name: Some(name.to_string()),
                name: None,
            },
        );
        self
    }

    /// Delay every call of `action` by `delay` before answering.
    pub fn with_delay(mut self, action: &str, delay: Duration) -> Self {
        self.delays.insert(action.to_string(), delay);
        self
    }

    /// Make every later call of `action` fail.
    pub async fn fail_action(&self, action: &str) {
        self.failing.lock().await.insert(action.to_string());
    }

    /// All actions called so far, in call order.
    pub async fn calls(&self) -> Vec<ActionCall> {
        self.calls.lock().await.clone()
    }

    /// Number of calls made to `action`.
    pub async fn call_count(&self, action: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.action == action)
            .count()
    }

    /// Plain-text replies sent through `send_text`.
    pub async fn sent_texts(&self) -> Vec<(ReplyTarget, String)> {
        self.sent.lock().await.clone()
    }

    /// Route an event to its subscribed handler, as a live transport would.
    ///
    /// Returns `false` if no handler accepted it.
    pub async fn emit(&self, event: impl Into<RawEvent>) -> bool {
        self.handlers.route(event.into()).await
    }

    pub fn is_subscribed(&self, kind: EventKind) -> bool {
        self.handlers.is_subscribed(kind)
    }

    async fn begin(&self, action: &str, args: &[&str]) -> Result<(), BridgeError> {
        self.calls.lock().await.push(ActionCall::new(action, args));
        if let Some(delay) = self.delays.get(action) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.lock().await.contains(action) {
            return Err(BridgeError::transport(action, "injected failure"));
        }
        Ok(())
    }

    fn scripted<K, T>(table: &HashMap<K, T>, key: &K, action: &str) -> Result<T, BridgeError>
    where
        K: std::hash::Hash + Eq + std::fmt::Debug,
        T: Clone,
    {
        table
            .get(key)
            .cloned()
            .ok_or_else(|| BridgeError::transport(action, format!("nothing scripted for {key:?}")))
    }
}

#[async_trait]
impl OneBotApi for MockTransport {
    async fn get_msg(&self, message_id: &str) -> Result<Value, BridgeError> {
        self.begin("get_msg", &[message_id]).await?;
        Self::scripted(&self.messages, &message_id.to_string(), "get_msg")
    }

    async fn get_group_member_info(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<MemberInfo, BridgeError> {
        self.begin("get_group_member_info", &[group_id, user_id]).await?;
        let key = (group_id.to_string(), user_id.to_string());
        Self::scripted(&self.members, &key, "get_group_member_info")
    }

    async fn get_stranger_info(&self, user_id: &str) -> Result<StrangerInfo, BridgeError> {
        self.begin("get_stranger_info", &[user_id]).await?;
        Self::scripted(&self.strangers, &user_id.to_string(), "get_stranger_info")
    }

    async fn get_group_file_url(
        &self,
        group_id: &str,
        file_id: &str,
    ) -> Result<FileUrl, BridgeError> {
        self.begin("get_group_file_url", &[group_id, file_id]).await?;
        Self::scripted(&self.files, &file_id.to_string(), "get_group_file_url")
    }

    async fn get_private_file_url(&self, file_id: &str) -> Result<FileUrl, BridgeError> {
        self.begin("get_private_file_url", &[file_id]).await?;
        Self::scripted(&self.files, &file_id.to_string(), "get_private_file_url")
    }

    async fn send_text(&self, target: &ReplyTarget, text: &str) -> Result<String, BridgeError> {
        self.begin("send_text", &[text]).await?;
        let mut sent = self.sent.lock().await;
        sent.push((target.clone(), text.to_string()));
        Ok(format!("mock-msg-{}", sent.len()))
    }
}

impl EventSource for MockTransport {
    fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        self.handlers.subscribe(kind, handler);
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, BridgeError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BridgeError> {
        Ok(())
    }
}
