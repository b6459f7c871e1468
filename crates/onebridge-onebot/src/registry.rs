// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Segment type name to component constructor table.
//!
//! Constructors only read the segment's own fields; nothing here performs
//! enrichment. Unknown types and payloads a constructor rejects become
//! [`Component::Other`] with the payload untouched.

use onebridge_core::types::{Component, ReplyRef, MENTION_ALL};
use onebridge_core::BridgeError;
use serde_json::{Map, Value};
use tracing::warn;

use crate::event::id_string;

/// Display name given to a mention of everyone.
pub const MENTION_ALL_NAME: &str = "全体成员";

/// Builds a component from a segment's `data` map.
pub type Constructor = fn(&Map<String, Value>) -> Result<Component, BridgeError>;

const CONSTRUCTORS: &[(&str, Constructor)] = &[
    ("text", text),
    ("image", image),
    ("record", record),
    ("file", file),
    ("at", at),
    ("reply", reply),
    ("poke", poke),
    ("markdown", markdown),
];

/// Constructor registered for `kind`, if any.
pub fn lookup(kind: &str) -> Option<Constructor> {
    CONSTRUCTORS
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, ctor)| *ctor)
}

/// Builds the component for a segment, falling back to [`Component::Other`].
pub fn construct(kind: &str, fields: &Map<String, Value>) -> Component {
    let Some(ctor) = lookup(kind) else {
        return other(kind, fields);
    };
    match ctor(fields) {
        Ok(component) => component,
        Err(e) => {
            warn!(kind, error = %e, "segment payload rejected, keeping it raw");
            other(kind, fields)
        }
    }
}

fn other(kind: &str, fields: &Map<String, Value>) -> Component {
    Component::Other {
        kind: kind.to_string(),
        fields: fields.clone(),
    }
}

fn field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(id_string)
}

fn required(fields: &Map<String, Value>, kind: &str, key: &str) -> Result<String, BridgeError> {
    field(fields, key).ok_or_else(|| {
        BridgeError::Protocol(format!("`{kind}` segment is missing `{key}`"))
    })
}

/// First present field among `keys`.
fn first_of(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| field(fields, key))
}

fn text(fields: &Map<String, Value>) -> Result<Component, BridgeError> {
    Ok(Component::Text {
        text: fields
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

fn media_source(fields: &Map<String, Value>, kind: &str) -> Result<String, BridgeError> {
    first_of(fields, &["url", "file", "path"]).ok_or_else(|| {
        BridgeError::Protocol(format!("`{kind}` segment has no url, file or path"))
    })
}

fn image(fields: &Map<String, Value>) -> Result<Component, BridgeError> {
    Ok(Component::Image {
        source: media_source(fields, "image")?,
    })
}

fn record(fields: &Map<String, Value>) -> Result<Component, BridgeError> {
    Ok(Component::Record {
        source: media_source(fields, "record")?,
    })
}

fn file(fields: &Map<String, Value>) -> Result<Component, BridgeError> {
    Ok(Component::File {
        name: first_of(fields, &["file_name", "name", "file"]).unwrap_or_else(|| "file".into()),
        url: required(fields, "file", "url")?,
    })
}

fn at(fields: &Map<String, Value>) -> Result<Component, BridgeError> {
    let target_id = required(fields, "at", "qq")?;
    let display_name = if target_id == MENTION_ALL {
        MENTION_ALL_NAME.to_string()
    } else {
        field(fields, "name").unwrap_or_default()
    };
    Ok(Component::At {
        target_id,
        display_name,
    })
}

/// Raw passthrough reply: only what the segment itself carries.
fn reply(fields: &Map<String, Value>) -> Result<Component, BridgeError> {
    let text = field(fields, "text").unwrap_or_default();
    Ok(Component::Reply(Box::new(ReplyRef {
        message_id: required(fields, "reply", "id")?,
        chain: Vec::new(),
        sender_id: first_of(fields, &["qq", "user_id"]).unwrap_or_default(),
        sender_name: field(fields, "name").unwrap_or_default(),
        timestamp: fields.get("time").and_then(Value::as_i64).unwrap_or_default(),
        text,
    })))
}

fn poke(fields: &Map<String, Value>) -> Result<Component, BridgeError> {
    Ok(Component::Poke {
        target_id: first_of(fields, &["qq", "id", "target_id"])
            .ok_or_else(|| BridgeError::Protocol("`poke` segment has no target".into()))?,
    })
}

fn markdown(fields: &Map<String, Value>) -> Result<Component, BridgeError> {
    Ok(Component::Text {
        text: first_of(fields, &["markdown", "content"]).unwrap_or_default(),
    })
}
