// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical message model shared by the normalizer, scheduler and sinks.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Target id that addresses every member of a group.
pub const MENTION_ALL: &str = "all";

/// Key identifying one conversation scope (a group, a sender within a group,
/// or a direct conversation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter implementing [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    /// Inbound chat adapter (normalization and aggregation).
    Channel,
    /// Protocol transport used for enrichment calls.
    Transport,
}

/// Category of an inbound occurrence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageCategory {
    GroupMessage,
    DirectMessage,
    Notice,
    Request,
    Other,
}

impl MessageCategory {
    /// Whether this category carries conversational chat content.
    pub fn is_chat(self) -> bool {
        matches!(self, MessageCategory::GroupMessage | MessageCategory::DirectMessage)
    }
}

/// The account that produced a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub user_id: String,
    pub display_name: String,
}

/// A quoted message, either resolved through the transport or passed through
/// from the raw reply segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyRef {
    pub message_id: String,
    /// Content of the quoted message. Empty for raw passthrough replies.
    pub chain: Vec<Component>,
    pub sender_id: String,
    pub sender_name: String,
    pub timestamp: i64,
    pub text: String,
}

/// One typed piece of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Text {
        text: String,
    },
    At {
        target_id: String,
        display_name: String,
    },
    File {
        name: String,
        url: String,
    },
    Image {
        source: String,
    },
    /// Audio clip.
    Record {
        source: String,
    },
    Reply(Box<ReplyRef>),
    Poke {
        target_id: String,
    },
    /// Segment type without a dedicated variant; `fields` is the untouched payload.
    Other {
        kind: String,
        fields: serde_json::Map<String, serde_json::Value>,
    },
}

impl Component {
    /// Convenience constructor for [`Component::Text`].
    pub fn text(text: impl Into<String>) -> Self {
        Component::Text { text: text.into() }
    }

    /// Short lowercase name of the variant, used in logs.
    pub fn kind(&self) -> &str {
        match self {
            Component::Text { .. } => "text",
            Component::At { .. } => "at",
            Component::File { .. } => "file",
            Component::Image { .. } => "image",
            Component::Record { .. } => "record",
            Component::Reply(_) => "reply",
            Component::Poke { .. } => "poke",
            Component::Other { kind, .. } => kind,
        }
    }
}

/// The normalized, protocol-independent representation of one inbound occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMessage {
    /// Bot account that received the event.
    pub self_id: String,
    pub sender: Sender,
    pub category: MessageCategory,
    /// Present iff `category` is [`MessageCategory::GroupMessage`].
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    pub session_id: SessionId,
    pub component_chain: Vec<Component>,
    /// Flattened text view of the chain; see [`ChainBuilder`].
    pub text_summary: String,
    pub message_id: MessageId,
    /// Unix seconds at normalization time.
    pub timestamp: i64,
    /// Untranslated protocol event, kept for diagnostics only.
    #[serde(skip)]
    pub raw_event: serde_json::Value,
}

impl CanonicalMessage {
    /// A message has content if either its summary or its chain is non-empty.
    pub fn has_content(&self) -> bool {
        !self.text_summary.is_empty() || !self.component_chain.is_empty()
    }
}

/// Builds a component chain and its text summary together so the two can
/// never drift apart.
///
/// Summary rules: text contributes verbatim; a mention contributes
/// `" @name(id) "` unless it targets everyone, has no resolved name, or is the
/// first mention of the bot itself. Other components contribute nothing.
#[derive(Debug)]
pub struct ChainBuilder {
    self_id: String,
    chain: Vec<Component>,
    summary: String,
    self_mention_seen: bool,
}

impl ChainBuilder {
    pub fn new(self_id: impl Into<String>) -> Self {
        Self {
            self_id: self_id.into(),
            chain: Vec::new(),
            summary: String::new(),
            self_mention_seen: false,
        }
    }

    /// Appends a component and its summary contribution.
    pub fn push(&mut self, component: Component) {
        match &component {
            Component::Text { text } => self.summary.push_str(text),
            Component::At {
                target_id,
                display_name,
            } => {
                if target_id == MENTION_ALL {
                    // structural, not conversational
                } else if *target_id == self.self_id && !self.self_mention_seen {
                    self.self_mention_seen = true;
                } else if !display_name.is_empty() {
                    self.summary
                        .push_str(&format!(" @{display_name}({target_id}) "));
                }
            }
            _ => {}
        }
        self.chain.push(component);
    }

    /// Returns `(component_chain, text_summary)`.
    pub fn finish(self) -> (Vec<Component>, String) {
        (self.chain, self.summary)
    }
}

impl Extend<Component> for ChainBuilder {
    fn extend<I: IntoIterator<Item = Component>>(&mut self, iter: I) {
        for component in iter {
            self.push(component);
        }
    }
}

/// Recomputes the text summary of a chain from scratch.
pub fn summarize(self_id: &str, chain: &[Component]) -> String {
    let mut builder = ChainBuilder::new(self_id);
    builder.extend(chain.iter().cloned());
    builder.finish().1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(id: &str, name: &str) -> Component {
        Component::At {
            target_id: id.into(),
            display_name: name.into(),
        }
    }

    #[test]
    fn first_self_mention_is_structural() {
        let mut builder = ChainBuilder::new("10000");
        builder.push(at("10000", "bot"));
        builder.push(Component::text("hello"));
        builder.push(at("10000", "bot"));
        builder.push(at("42", "alice"));
        let (chain, summary) = builder.finish();

        assert_eq!(chain.len(), 4);
        assert_eq!(summary, "hello @bot(10000)  @alice(42) ");
    }

    #[test]
    fn mention_all_and_unresolved_names_are_silent() {
        let summary = summarize(
            "1",
            &[
                at(MENTION_ALL, "全体成员"),
                at("99", ""),
                Component::text("hi"),
            ],
        );
        assert_eq!(summary, "hi");
    }

    #[test]
    fn non_text_components_contribute_nothing() {
        let chain = vec![
            Component::Image {
                source: "http://img".into(),
            },
            Component::Poke {
                target_id: "1".into(),
            },
            Component::Reply(Box::new(ReplyRef {
                message_id: "7".into(),
                chain: vec![Component::text("quoted")],
                sender_id: "2".into(),
                sender_name: "bob".into(),
                timestamp: 0,
                text: "quoted".into(),
            })),
        ];
        assert_eq!(summarize("1", &chain), "");
    }

    #[test]
    fn category_chat_classification() {
        assert!(MessageCategory::GroupMessage.is_chat());
        assert!(MessageCategory::DirectMessage.is_chat());
        assert!(!MessageCategory::Notice.is_chat());
        assert!(!MessageCategory::Request.is_chat());
        assert!(!MessageCategory::Other.is_chat());
    }

    #[test]
    fn category_display_is_snake_case() {
        assert_eq!(MessageCategory::GroupMessage.to_string(), "group_message");
        assert_eq!(
            "direct_message".parse::<MessageCategory>().unwrap(),
            MessageCategory::DirectMessage
        );
    }

    #[test]
    fn component_serializes_with_type_tag() {
        let json = serde_json::to_value(at("5", "eve")).unwrap();
        assert_eq!(json["type"], "at");
        assert_eq!(json["target_id"], "5");

        let reply = Component::Reply(Box::new(ReplyRef {
            message_id: "9".into(),
            chain: vec![],
            sender_id: String::new(),
            sender_name: String::new(),
            timestamp: 0,
            text: String::new(),
        }));
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "reply");
        assert_eq!(json["message_id"], "9");
        let back: Component = serde_json::from_value(json).unwrap();
        assert_eq!(back, reply);
    }
}
