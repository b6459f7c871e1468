// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw OneBot event to [`CanonicalMessage`] conversion.
//!
//! Segments are grouped into runs of the same type, planned into jobs in
//! segment order, and enriched concurrently. The chain is assembled from the
//! job results in plan order, never completion order.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use onebridge_config::model::OneBotConfig;
use onebridge_core::types::{
    CanonicalMessage, ChainBuilder, Component, MessageCategory, MessageId, ReplyRef, Sender,
    SessionId,
};
use onebridge_core::BridgeError;
use tracing::{debug, error};

use crate::api::{OneBotApi, ReplyTarget};
use crate::event::{id_string, PostType, RawEvent, Segment};
use crate::registry;
use crate::resolve::{ReferenceResolver, Scope};

/// Sent back to the conversation when the transport posts CQ-code strings.
pub const POST_FORMAT_HINT: &str = "Unrecognized message payload; this message is ignored. \
If you are using go-cqhttp, set `message.post-format` to `array` in its configuration.";

/// Display name used when a sender has neither card nor nickname.
const UNKNOWN_SENDER_NAME: &str = "N/A";

/// Behavior switches for the normalizer.
#[derive(Debug, Clone, Default)]
pub struct NormalizerSettings {
    pub unique_session: bool,
    pub fetch_quoted_messages: bool,
    pub blocked_senders: HashSet<String>,
}

impl From<&OneBotConfig> for NormalizerSettings {
    fn from(config: &OneBotConfig) -> Self {
        Self {
            unique_session: config.unique_session,
            fetch_quoted_messages: config.fetch_quoted_messages,
            blocked_senders: config.blocked_senders.iter().cloned().collect(),
        }
    }
}

/// Session key for a conversation.
///
/// Group conversations are keyed by group, or by `{user}_{group}` when
/// sessions are unique per sender; everything else is keyed by user.
pub fn derive_session_id(group_id: Option<&str>, user_id: &str, unique_session: bool) -> SessionId {
    match group_id {
        Some(group) if unique_session => SessionId(format!("{user_id}_{group}")),
        Some(group) => SessionId(group.to_string()),
        None => SessionId(user_id.to_string()),
    }
}

/// What one planned slot of the chain needs.
enum Job<'a> {
    Ready(Component),
    File(&'a Segment),
    Mention(String),
    Reply(&'a Segment),
}

/// Facts about the message being converted that every job needs.
struct MessageContext<'a> {
    group_id: Option<&'a str>,
    scope: Scope<'a>,
    /// False for quoted messages, capping reply enrichment at depth 1.
    enrich: bool,
}

/// Converts raw events into canonical messages.
pub struct Normalizer {
    resolver: ReferenceResolver,
    settings: NormalizerSettings,
}

impl Normalizer {
    pub fn new(api: Arc<dyn OneBotApi>, settings: NormalizerSettings) -> Self {
        Self {
            resolver: ReferenceResolver::new(api),
            settings,
        }
    }

    pub fn settings(&self) -> &NormalizerSettings {
        &self.settings
    }

    /// Normalizes one event, or returns `None` if it is discarded.
    ///
    /// Never fails: enrichment errors degrade components, malformed message
    /// payloads are reported and dropped.
    pub async fn normalize(&self, event: RawEvent) -> Option<CanonicalMessage> {
        match event.post_type() {
            PostType::Message => {
                let segments = match event.segments() {
                    Ok(segments) => segments,
                    Err(e) => {
                        self.report_fatal(&event, &e).await;
                        return None;
                    }
                };
                let sender = message_sender(&event);
                if self.settings.blocked_senders.contains(&sender.user_id) {
                    debug!(user_id = %sender.user_id, "discarding message from blocked sender");
                    return None;
                }
                Some(self.convert_message(event, sender, &segments, true).await)
            }
            PostType::Notice => Some(self.convert_notice(event)),
            PostType::Request => Some(self.convert_request(event)),
            PostType::MetaEvent | PostType::Unknown => {
                debug!(post_type = ?event.post_type(), "discarding unroutable event");
                None
            }
        }
    }

    async fn report_fatal(&self, event: &RawEvent, e: &BridgeError) {
        error!(fatal = true, error = %e, "{}", POST_FORMAT_HINT);
        let Some(target) = ReplyTarget::from_event(event) else {
            debug!("no conversation to send the diagnostic to");
            return;
        };
        if let Err(send_err) = self.resolver.api().send_text(&target, POST_FORMAT_HINT).await {
            error!(error = %send_err, "failed to send diagnostic reply");
        }
    }

    async fn convert_message(
        &self,
        event: RawEvent,
        sender: Sender,
        segments: &[Segment],
        enrich: bool,
    ) -> CanonicalMessage {
        let group_id = event.group_id();
        let category = match (event.message_type(), &group_id) {
            (Some("group"), Some(_)) => MessageCategory::GroupMessage,
            (Some("private"), _) => MessageCategory::DirectMessage,
            _ => MessageCategory::Other,
        };
        let group_id = group_id.filter(|_| category == MessageCategory::GroupMessage);
        let scope = match (category, group_id.as_deref()) {
            (MessageCategory::GroupMessage, Some(group)) => Scope::Group(group),
            (MessageCategory::DirectMessage, _) => Scope::Direct,
            _ => Scope::Unscoped,
        };
        let context = MessageContext {
            group_id: group_id.as_deref(),
            scope,
            enrich,
        };

        let jobs = plan(segments);
        let resolved = join_all(jobs.into_iter().map(|job| self.run_job(job, &context))).await;

        let self_id = event.self_id();
        let mut builder = ChainBuilder::new(self_id.clone());
        builder.extend(resolved.into_iter().flatten());
        let (component_chain, text_summary) = builder.finish();

        let session_id =
            derive_session_id(group_id.as_deref(), &sender.user_id, self.settings.unique_session);
        let group_name = group_id.as_ref().and_then(|_| event.group_name());

        CanonicalMessage {
            self_id,
            sender,
            category,
            group_id,
            group_name,
            session_id,
            component_chain,
            text_summary,
            message_id: event.message_id().map(MessageId).unwrap_or_else(generated_id),
            timestamp: now(),
            raw_event: event.into_value(),
        }
    }

    async fn run_job(&self, job: Job<'_>, context: &MessageContext<'_>) -> Option<Component> {
        match job {
            Job::Ready(component) => Some(component),
            Job::File(segment) => self.resolver.resolve_file(segment, context.scope).await,
            Job::Mention(target) => Some(
                self.resolver
                    .resolve_mention(&target, context.group_id)
                    .await,
            ),
            Job::Reply(segment) => {
                if context.enrich && self.settings.fetch_quoted_messages {
                    Some(self.convert_reply(segment).await)
                } else {
                    Some(registry::construct("reply", &segment.data))
                }
            }
        }
    }

    /// Fetches and normalizes the quoted message, or passes the segment through raw.
    async fn convert_reply(&self, segment: &Segment) -> Component {
        let Some(message_id) = segment.str_field("id") else {
            return registry::construct("reply", &segment.data);
        };

        let fetched = self
            .resolver
            .fetch_quoted(&message_id)
            .await
            .and_then(|event| event.segments().map(|segments| (event, segments)));

        match fetched {
            Ok((event, segments)) => {
                let time = event.time();
                let sender = message_sender(&event);
                let quoted = self.convert_nested(event, sender, segments).await;
                Component::Reply(Box::new(ReplyRef {
                    message_id,
                    chain: quoted.component_chain,
                    sender_id: quoted.sender.user_id,
                    sender_name: quoted.sender.display_name,
                    timestamp: time.unwrap_or(quoted.timestamp),
                    text: quoted.text_summary,
                }))
            }
            Err(e) => {
                error!(message_id, error = %e, "failed to fetch quoted message");
                registry::construct("reply", &segment.data)
            }
        }
    }

    /// Converts a quoted message with reply enrichment disabled.
    fn convert_nested(
        &self,
        event: RawEvent,
        sender: Sender,
        segments: Vec<Segment>,
    ) -> BoxFuture<'_, CanonicalMessage> {
        Box::pin(async move { self.convert_message(event, sender, &segments, false).await })
    }

    fn convert_notice(&self, event: RawEvent) -> CanonicalMessage {
        let mut chain = Vec::new();
        if event.sub_type() == Some("poke")
            && let Some(target_id) = event.target_id()
        {
            chain.push(Component::Poke { target_id });
        }
        self.convert_side_event(event, MessageCategory::Notice, chain)
    }

    fn convert_request(&self, event: RawEvent) -> CanonicalMessage {
        self.convert_side_event(event, MessageCategory::Request, Vec::new())
    }

    /// Notices and requests: no enrichment, sender named by id, no `group_id`.
    fn convert_side_event(
        &self,
        event: RawEvent,
        category: MessageCategory,
        chain: Vec<Component>,
    ) -> CanonicalMessage {
        let self_id = event.self_id();
        let user_id = event.user_id().unwrap_or_default();
        let session_id = derive_session_id(
            event.group_id().as_deref(),
            &user_id,
            self.settings.unique_session,
        );

        let mut builder = ChainBuilder::new(self_id.clone());
        builder.extend(chain);
        let (component_chain, text_summary) = builder.finish();

        CanonicalMessage {
            self_id,
            sender: Sender {
                display_name: user_id.clone(),
                user_id,
            },
            category,
            group_id: None,
            group_name: None,
            session_id,
            component_chain,
            text_summary,
            message_id: generated_id(),
            timestamp: now(),
            raw_event: event.into_value(),
        }
    }
}

/// Groups segments into runs of one type and plans one job per chain slot.
fn plan(segments: &[Segment]) -> Vec<Job<'_>> {
    let mut jobs = Vec::with_capacity(segments.len());
    for run in segments.chunk_by(|a, b| a.kind == b.kind) {
        match run[0].kind.as_str() {
            "text" => {
                let text: String = run
                    .iter()
                    .filter_map(|segment| segment.data.get("text").and_then(|v| v.as_str()))
                    .collect();
                let text = text.trim();
                if !text.is_empty() {
                    jobs.push(Job::Ready(Component::text(text)));
                }
            }
            "file" => jobs.extend(run.iter().map(Job::File)),
            "reply" => jobs.extend(run.iter().map(Job::Reply)),
            "at" => jobs.extend(run.iter().map(|segment| match segment.str_field("qq") {
                Some(target) => Job::Mention(target),
                None => Job::Ready(registry::construct("at", &segment.data)),
            })),
            kind => jobs.extend(
                run.iter()
                    .map(|segment| Job::Ready(registry::construct(kind, &segment.data))),
            ),
        }
    }
    jobs
}

/// Sender of a message event: card, then nickname, then a placeholder.
fn message_sender(event: &RawEvent) -> Sender {
    let profile = event.sender();
    let text_field = |key: &str| {
        profile
            .and_then(|p| p.get(key))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let user_id = profile
        .and_then(|p| p.get("user_id"))
        .and_then(id_string)
        .or_else(|| event.user_id())
        .unwrap_or_default();
    let display_name = text_field("card")
        .or_else(|| text_field("nickname"))
        .unwrap_or_else(|| UNKNOWN_SENDER_NAME.to_string());

    Sender {
        user_id,
        display_name,
    }
}

fn generated_id() -> MessageId {
    MessageId(uuid::Uuid::new_v4().simple().to_string())
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
