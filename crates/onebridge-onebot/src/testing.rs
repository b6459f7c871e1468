// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-crate transport stub for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use onebridge_core::BridgeError;
use serde_json::Value;

use crate::api::{FileUrl, MemberInfo, OneBotApi, ReplyTarget, StrangerInfo};

/// Answers from fixed tables; anything not scripted fails.
#[derive(Default)]
pub(crate) struct StubApi {
    messages: HashMap<String, Value>,
    members: HashMap<String, MemberInfo>,
    strangers: HashMap<String, StrangerInfo>,
    files: HashMap<String, FileUrl>,
    calls: Mutex<Vec<String>>,
    sent: Mutex<Vec<(ReplyTarget, String)>>,
}

impl StubApi {
    pub(crate) fn with_message(mut self, id: &str, event: Value) -> Self {
        self.messages.insert(id.into(), event);
        self
    }

    pub(crate) fn with_member(mut self, user_id: &str, info: MemberInfo) -> Self {
        self.members.insert(user_id.into(), info);
        self
    }

    pub(crate) fn with_stranger(mut self, user_id: &str, info: StrangerInfo) -> Self {
        self.strangers.insert(user_id.into(), info);
        self
    }

    pub(crate) fn with_file(mut self, file_id: &str, url: FileUrl) -> Self {
        self.files.insert(file_id.into(), url);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn sent(&self) -> Vec<(ReplyTarget, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn answer<T: Clone>(
        table: &HashMap<String, T>,
        key: &str,
        action: &str,
    ) -> Result<T, BridgeError> {
        table
            .get(key)
            .cloned()
            .ok_or_else(|| BridgeError::transport(action, format!("nothing scripted for {key}")))
    }
}

#[async_trait]
impl OneBotApi for StubApi {
    async fn get_msg(&self, message_id: &str) -> Result<Value, BridgeError> {
        self.record(format!("get_msg:{message_id}"));
        Self::answer(&self.messages, message_id, "get_msg")
    }

    async fn get_group_member_info(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<MemberInfo, BridgeError> {
        self.record(format!("get_group_member_info:{group_id}:{user_id}"));
        Self::answer(&self.members, user_id, "get_group_member_info")
    }

    async fn get_stranger_info(&self, user_id: &str) -> Result<StrangerInfo, BridgeError> {
        self.record(format!("get_stranger_info:{user_id}"));
        Self::answer(&self.strangers, user_id, "get_stranger_info")
    }

    async fn get_group_file_url(
        &self,
        group_id: &str,
        file_id: &str,
    ) -> Result<FileUrl, BridgeError> {
        self.record(format!("get_group_file_url:{group_id}:{file_id}"));
        Self::answer(&self.files, file_id, "get_group_file_url")
    }

    async fn get_private_file_url(&self, file_id: &str) -> Result<FileUrl, BridgeError> {
        self.record(format!("get_private_file_url:{file_id}"));
        Self::answer(&self.files, file_id, "get_private_file_url")
    }

    async fn send_text(&self, target: &ReplyTarget, text: &str) -> Result<String, BridgeError> {
        self.record("send_text".into());
        self.sent.lock().unwrap().push((target.clone(), text.to_string()));
        Ok("1".into())
    }
}
