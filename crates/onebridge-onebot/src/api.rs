// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport operations consumed for enrichment and diagnostics.

use async_trait::async_trait;
use onebridge_core::BridgeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::RawEvent;

/// Group-scoped profile returned by `get_group_member_info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberInfo {
    #[serde(default)]
    pub card: String,
    #[serde(default)]
    pub nickname: String,
}

/// Global profile returned by `get_stranger_info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrangerInfo {
    /// Some implementations report the nickname as `nick`.
    #[serde(default)]
    pub nick: String,
    #[serde(default)]
    pub nickname: String,
}

impl StrangerInfo {
    pub fn display_name(&self) -> &str {
        if self.nick.is_empty() {
            &self.nickname
        } else {
            &self.nick
        }
    }
}

/// Result of exchanging a file id for a download URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileUrl {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Where a plain-text diagnostic reply is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTarget {
    Group(String),
    Private(String),
}

impl ReplyTarget {
    /// The conversation an event came from, if it can be answered.
    pub fn from_event(event: &RawEvent) -> Option<Self> {
        match event.group_id() {
            Some(group) => Some(ReplyTarget::Group(group)),
            None => event.user_id().map(ReplyTarget::Private),
        }
    }
}

/// Enrichment and reply operations offered by a OneBot transport.
///
/// Every method is a network round-trip and a suspension point. Failures are
/// reported as [`BridgeError::Transport`]; callers decide how to degrade.
#[async_trait]
pub trait OneBotApi: Send + Sync {
    /// Fetch a message by its transport-assigned id, in raw event form
    /// (without `post_type`).
    async fn get_msg(&self, message_id: &str) -> Result<Value, BridgeError>;

    async fn get_group_member_info(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<MemberInfo, BridgeError>;

    async fn get_stranger_info(&self, user_id: &str) -> Result<StrangerInfo, BridgeError>;

    async fn get_group_file_url(&self, group_id: &str, file_id: &str)
    -> Result<FileUrl, BridgeError>;

    async fn get_private_file_url(&self, file_id: &str) -> Result<FileUrl, BridgeError>;

    /// Send a plain-text message, returning the new message id.
    async fn send_text(&self, target: &ReplyTarget, text: &str) -> Result<String, BridgeError>;
}
