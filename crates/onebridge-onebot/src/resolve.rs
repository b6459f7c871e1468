// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enrichment of reference-only segments through the transport.
//!
//! Every failure here degrades: a file that cannot be resolved is omitted, a
//! mention whose name cannot be looked up keeps an empty name. Errors are
//! logged and never returned to the normalizer, except for quoted-message
//! fetches whose fallback the normalizer builds itself.

use std::sync::Arc;

use onebridge_core::types::{Component, MENTION_ALL};
use onebridge_core::BridgeError;
use serde_json::Value;
use tracing::{debug, error};

use crate::api::OneBotApi;
use crate::event::{RawEvent, Segment};
use crate::registry::{self, MENTION_ALL_NAME};

/// Conversation a segment was received in; decides which lookup is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    Group(&'a str),
    Direct,
    /// Neither group nor direct; scoped lookups are unavailable.
    Unscoped,
}

/// Exchanges opaque references for populated components.
#[derive(Clone)]
pub struct ReferenceResolver {
    api: Arc<dyn OneBotApi>,
}

impl ReferenceResolver {
    pub fn new(api: Arc<dyn OneBotApi>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Arc<dyn OneBotApi> {
        &self.api
    }

    /// Resolves a `file` segment to a [`Component::File`], or `None` when the
    /// file cannot be resolved.
    pub async fn resolve_file(&self, segment: &Segment, scope: Scope<'_>) -> Option<Component> {
        if segment
            .str_field("url")
            .is_some_and(|url| url.starts_with("http"))
        {
            return Some(registry::construct("file", &segment.data));
        }

        let Some(file_id) = segment.str_field("file_id") else {
            error!(segment = ?segment.data, "file segment has neither url nor file_id");
            return None;
        };

        let result = match scope {
            Scope::Group(group_id) => self.api.get_group_file_url(group_id, &file_id).await,
            Scope::Direct => self.api.get_private_file_url(&file_id).await,
            Scope::Unscoped => {
                error!(file_id, "cannot resolve file outside a group or direct conversation");
                return None;
            }
        };

        match result {
            Ok(resolved) => match resolved.url.filter(|url| !url.is_empty()) {
                Some(url) => {
                    let name = [resolved.file_name, resolved.name]
                        .into_iter()
                        .flatten()
                        .chain(segment.str_field("file"))
                        .chain(segment.str_field("file_name"))
                        .find(|name| !name.is_empty())
                        .unwrap_or_default();
                    Some(Component::File { name, url })
                }
                None => {
                    error!(file_id, "file lookup returned no url");
                    None
                }
            },
            Err(e) => {
                error!(file_id, error = %e, "failed to resolve file url");
                None
            }
        }
    }

    /// Resolves the display name of a mentioned user.
    ///
    /// In a group the member card is used first; an empty card falls back to
    /// the global nickname. Outside a group only the global lookup is made.
    pub async fn resolve_mention(&self, target_id: &str, group_id: Option<&str>) -> Component {
        if target_id == MENTION_ALL {
            return Component::At {
                target_id: MENTION_ALL.into(),
                display_name: MENTION_ALL_NAME.into(),
            };
        }

        let display_name = match self.mention_name(target_id, group_id).await {
            Ok(name) => name,
            Err(e) => {
                error!(target_id, error = %e, "failed to resolve mentioned user");
                String::new()
            }
        };

        Component::At {
            target_id: target_id.to_string(),
            display_name,
        }
    }

    async fn mention_name(
        &self,
        target_id: &str,
        group_id: Option<&str>,
    ) -> Result<String, BridgeError> {
        let member_nickname = match group_id {
            Some(group_id) => {
                let member = self.api.get_group_member_info(group_id, target_id).await?;
                if !member.card.is_empty() {
                    return Ok(member.card);
                }
                Some(member.nickname)
            }
            None => None,
        };

        match self.api.get_stranger_info(target_id).await {
            Ok(stranger) => Ok(stranger.display_name().to_string()),
            Err(e) => match member_nickname.filter(|name| !name.is_empty()) {
                Some(nickname) => {
                    debug!(target_id, error = %e, "global lookup failed, using member nickname");
                    Ok(nickname)
                }
                None => Err(e),
            },
        }
    }

    /// Fetches a quoted message as a raw message event.
    pub async fn fetch_quoted(&self, message_id: &str) -> Result<RawEvent, BridgeError> {
        let mut data = self.api.get_msg(message_id).await?;
        match &mut data {
            Value::Object(fields) => {
                fields.insert("post_type".into(), Value::String("message".into()));
            }
            other => {
                return Err(BridgeError::transport(
                    "get_msg",
                    format!("expected a message object, got {other}"),
                ));
            }
        }
        Ok(RawEvent::new(data))
    }
}
