// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loosely-typed OneBot v11 events and message segments.
//!
//! Events are kept as raw JSON and read through accessors, because OneBot
//! implementations disagree on whether ids are numbers or strings and which
//! optional fields they send.

use onebridge_core::BridgeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, warn};

/// Top-level event discriminator (`post_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostType {
    Message,
    Notice,
    Request,
    MetaEvent,
    Unknown,
}

impl PostType {
    fn from_wire(name: Option<&str>) -> Self {
        match name {
            // `message_sent` (the bot's own outbound echo) falls through to Unknown
            Some("message") => PostType::Message,
            Some("notice") => PostType::Notice,
            Some("request") => PostType::Request,
            Some("meta_event") => PostType::MetaEvent,
            _ => PostType::Unknown,
        }
    }
}

/// Event category the transport routes to a subscribed handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GroupMessage,
    PrivateMessage,
    Notice,
    Request,
}

impl EventKind {
    /// Every kind the adapter subscribes to.
    pub const ALL: [EventKind; 4] = [
        EventKind::GroupMessage,
        EventKind::PrivateMessage,
        EventKind::Notice,
        EventKind::Request,
    ];

    /// The routing kind of an event, or `None` for events no handler accepts.
    pub fn of(event: &RawEvent) -> Option<EventKind> {
        match event.post_type() {
            PostType::Message => match event.message_type()? {
                "group" => Some(EventKind::GroupMessage),
                "private" => Some(EventKind::PrivateMessage),
                _ => None,
            },
            PostType::Notice => Some(EventKind::Notice),
            PostType::Request => Some(EventKind::Request),
            PostType::MetaEvent | PostType::Unknown => None,
        }
    }
}

/// One raw protocol event as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawEvent(pub Value);

impl RawEvent {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    pub fn post_type(&self) -> PostType {
        PostType::from_wire(self.str_field("post_type"))
    }

    pub fn message_type(&self) -> Option<&str> {
        self.str_field("message_type")
    }

    pub fn sub_type(&self) -> Option<&str> {
        self.str_field("sub_type")
    }

    pub fn self_id(&self) -> String {
        self.field("self_id").and_then(id_string).unwrap_or_default()
    }

    pub fn user_id(&self) -> Option<String> {
        self.field("user_id").and_then(id_string)
    }

    /// Group id, treating `0`, `null` and `""` as absent.
    pub fn group_id(&self) -> Option<String> {
        self.field("group_id")
            .and_then(id_string)
            .filter(|id| id != "0")
    }

    pub fn target_id(&self) -> Option<String> {
        self.field("target_id").and_then(id_string)
    }

    pub fn message_id(&self) -> Option<String> {
        self.field("message_id").and_then(id_string)
    }

    /// Event time in unix seconds, as reported by the transport.
    pub fn time(&self) -> Option<i64> {
        self.field("time").and_then(Value::as_i64)
    }

    pub fn group_name(&self) -> Option<String> {
        self.str_field("group_name")
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    /// The `sender` object of a message event, if any.
    pub fn sender(&self) -> Option<&Map<String, Value>> {
        self.field("sender").and_then(Value::as_object)
    }

    /// Parses the `message` payload as a segment sequence.
    ///
    /// Fails only when the payload is not an array, which happens when the
    /// transport posts messages as CQ-code strings. Individual elements that
    /// cannot be read as segments are logged and skipped.
    pub fn segments(&self) -> Result<Vec<Segment>, BridgeError> {
        match self.field("message") {
            Some(Value::Array(items)) => Ok(items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| match Segment::from_value(item) {
                    Ok(segment) => Some(segment),
                    Err(e) => {
                        error!(index, error = %e, "skipping malformed message segment");
                        None
                    }
                })
                .collect()),
            Some(other) => Err(BridgeError::Protocol(format!(
                "unrecognized message payload: {other}"
            ))),
            None => Err(BridgeError::Protocol(
                "message event has no `message` field".into(),
            )),
        }
    }
}

impl From<Value> for RawEvent {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// One element of a message event's segment array: `{"type": .., "data": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Segment {
    pub fn new(kind: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Reads one array element. `data` may be absent or `null`; any other
    /// non-object `data` is dropped with a warning.
    pub fn from_value(value: &Value) -> Result<Self, BridgeError> {
        let object = value
            .as_object()
            .ok_or_else(|| BridgeError::Protocol(format!("segment is not an object: {value}")))?;
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .filter(|kind| !kind.is_empty())
            .ok_or_else(|| BridgeError::Protocol(format!("segment has no `type`: {value}")))?;
        let data = match object.get("data") {
            Some(Value::Object(data)) => data.clone(),
            None | Some(Value::Null) => Map::new(),
            Some(other) => {
                warn!(kind, data = %other, "ignoring non-object segment data");
                Map::new()
            }
        };
        Ok(Self::new(kind, data))
    }

    /// A data field rendered as a string; numbers are stringified.
    pub fn str_field(&self, key: &str) -> Option<String> {
        self.data.get(key).and_then(id_string)
    }
}

/// Renders an id-like JSON value as a string. Empty strings and non-scalar
/// values yield `None`.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
