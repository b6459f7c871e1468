// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport stand-in used when no OneBot HTTP API is configured.
//!
//! Every action fails, so enrichment degrades the way it would against an
//! unreachable implementation.

use async_trait::async_trait;
use onebridge_core::BridgeError;
use onebridge_onebot::api::{FileUrl, MemberInfo, OneBotApi, ReplyTarget, StrangerInfo};
use serde_json::Value;

#[derive(Debug, Default)]
pub struct OfflineApi;

fn unavailable(action: &str) -> BridgeError {
    BridgeError::transport(action, "no OneBot API configured (set onebot.api_base_url)")
}

#[async_trait]
impl OneBotApi for OfflineApi {
    async fn get_msg(&self, _message_id: &str) -> Result<Value, BridgeError> {
        Err(unavailable("get_msg"))
    }

    async fn get_group_member_info(
        &self,
        _group_id: &str,
        _user_id: &str,
    ) -> Result<MemberInfo, BridgeError> {
        Err(unavailable("get_group_member_info"))
    }

    async fn get_stranger_info(&self, _user_id: &str) -> Result<StrangerInfo, BridgeError> {
        Err(unavailable("get_stranger_info"))
    }

    async fn get_group_file_url(
        &self,
        _group_id: &str,
        _file_id: &str,
    ) -> Result<FileUrl, BridgeError> {
        Err(unavailable("get_group_file_url"))
    }

    async fn get_private_file_url(&self, _file_id: &str) -> Result<FileUrl, BridgeError> {
        Err(unavailable("get_private_file_url"))
    }

    async fn send_text(&self, _target: &ReplyTarget, _text: &str) -> Result<String, BridgeError> {
        Err(unavailable("send_text"))
    }
}
