// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for raw OneBot v11 events and message segments.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Value};

/// Bot account every builder uses as `self_id`.
pub const SELF_ID: i64 = 10000;

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

fn next_message_id() -> u64 {
    NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed)
}

pub fn text(text: &str) -> Value {
    json!({"type": "text", "data": {"text": text}})
}

pub fn at(qq: &str) -> Value {
    json!({"type": "at", "data": {"qq": qq}})
}

pub fn reply(message_id: &str) -> Value {
    json!({"type": "reply", "data": {"id": message_id}})
}

pub fn image(url: &str) -> Value {
    json!({"type": "image", "data": {"file": "image.png", "url": url}})
}

/// A file segment that only carries an opaque id.
pub fn file_ref(file_id: &str) -> Value {
    json!({"type": "file", "data": {"file": "upload.bin", "file_id": file_id}})
}

/// A file segment with a directly fetchable URL.
pub fn file_url(url: &str, name: &str) -> Value {
    json!({"type": "file", "data": {"url": url, "file_name": name}})
}

/// A group message event from `user_id` in `group_id`.
pub fn group_message(group_id: &str, user_id: &str, segments: Vec<Value>) -> Value {
    json!({
        "post_type": "message",
        "message_type": "group",
        "sub_type": "normal",
        "time": 1_700_000_000,
        "self_id": SELF_ID,
        "message_id": next_message_id(),
        "group_id": group_id,
        "group_name": format!("group {group_id}"),
        "user_id": user_id,
        "sender": {"user_id": user_id, "card": "", "nickname": format!("user {user_id}")},
        "message": segments,
    })
}

/// A group message made of a single text segment.
pub fn group_text(group_id: &str, user_id: &str, body: &str) -> Value {
    group_message(group_id, user_id, vec![text(body)])
}

/// A direct message event from `user_id`.
pub fn private_message(user_id: &str, segments: Vec<Value>) -> Value {
    json!({
        "post_type": "message",
        "message_type": "private",
        "sub_type": "friend",
        "time": 1_700_000_000,
        "self_id": SELF_ID,
        "message_id": next_message_id(),
        "user_id": user_id,
        "sender": {"user_id": user_id, "nickname": format!("user {user_id}")},
        "message": segments,
    })
}

/// A message event whose payload is a CQ-code string instead of segments.
pub fn string_payload_message(group_id: &str, user_id: &str, raw: &str) -> Value {
    let mut event = group_message(group_id, user_id, Vec::new());
    event["message"] = Value::String(raw.to_string());
    event
}

pub fn poke_notice(group_id: &str, user_id: &str, target_id: &str) -> Value {
    json!({
        "post_type": "notice",
        "notice_type": "notify",
        "sub_type": "poke",
        "self_id": SELF_ID,
        "group_id": group_id,
        "user_id": user_id,
        "target_id": target_id,
    })
}

pub fn friend_request(user_id: &str) -> Value {
    json!({
        "post_type": "request",
        "request_type": "friend",
        "self_id": SELF_ID,
        "user_id": user_id,
        "comment": "hello",
        "flag": "flag-1",
    })
}

pub fn heartbeat() -> Value {
    json!({
        "post_type": "meta_event",
        "meta_event_type": "heartbeat",
        "self_id": SELF_ID,
        "interval": 5000,
    })
}

/// The `get_msg` answer for a quoted message: a message event without `post_type`.
pub fn quoted_message(message_id: &str, group_id: &str, user_id: &str, body: &str) -> Value {
    json!({
        "message_id": message_id,
        "message_type": "group",
        "time": 1_690_000_000,
        "self_id": SELF_ID,
        "group_id": group_id,
        "sender": {"user_id": user_id, "nickname": format!("user {user_id}")},
        "message": [text(body)],
    })
}
