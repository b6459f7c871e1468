// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OneBot v11 HTTP API client.
//!
//! Every action is `POST {base}/{action}` with a JSON parameter object; the
//! response is the standard `{status, retcode, data}` envelope.

use std::time::Duration;

use async_trait::async_trait;
use onebridge_config::model::OneBotConfig;
use onebridge_core::traits::PluginAdapter;
use onebridge_core::types::{AdapterType, HealthStatus};
use onebridge_core::BridgeError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::api::{FileUrl, MemberInfo, OneBotApi, ReplyTarget, StrangerInfo};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    retcode: i64,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    wording: Option<String>,
}

/// [`OneBotApi`] over the OneBot HTTP API.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpApi {
    /// Creates a client for `base_url`, sending `access_token` as a bearer token.
    pub fn new(
        base_url: &str,
        access_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, BridgeError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = access_token.filter(|t| !t.is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                    BridgeError::Config(format!("invalid access token header value: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Transport {
                action: "connect".into(),
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Builds a client from `[onebot]` settings, or `None` when no API URL is configured.
    pub fn from_config(config: &OneBotConfig) -> Result<Option<Self>, BridgeError> {
        config
            .api_base_url
            .as_deref()
            .map(|url| Self::new(url, config.access_token.as_deref(), config.api_timeout()))
            .transpose()
    }

    /// Invokes one action and returns the envelope's `data`.
    pub async fn call_action(&self, action: &str, params: Value) -> Result<Value, BridgeError> {
        let url = format!("{}/{action}", self.base_url);
        debug!(action, "calling OneBot action");

        let response = self
            .client
            .post(&url)
            .json(&params)
            .send()
            .await
            .map_err(|e| self.request_error(action, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::transport(
                action,
                format!("HTTP {status}: {body}"),
            ));
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| self.request_error(action, e))?;

        if envelope.status == "failed" || envelope.retcode != 0 {
            let reason = envelope
                .wording
                .or(envelope.message)
                .unwrap_or_else(|| "no message".into());
            return Err(BridgeError::transport(
                action,
                format!("retcode {}: {reason}", envelope.retcode),
            ));
        }

        Ok(envelope.data)
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Value,
    ) -> Result<T, BridgeError> {
        let data = self.call_action(action, params).await?;
        serde_json::from_value(data).map_err(|e| BridgeError::Transport {
            action: action.into(),
            message: format!("unexpected response data: {e}"),
            source: Some(Box::new(e)),
        })
    }

    fn request_error(&self, action: &str, e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::Timeout {
                duration: self.timeout,
            }
        } else {
            BridgeError::Transport {
                action: action.into(),
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }
}

/// OneBot implementations expect numeric ids; opaque ids stay strings.
fn id_param(id: &str) -> Value {
    id.parse::<i64>().map(Value::from).unwrap_or_else(|_| json!(id))
}

fn params<const N: usize>(pairs: [(&str, Value); N]) -> Value {
    Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<Map<_, _>>(),
    )
}

#[async_trait]
impl OneBotApi for HttpApi {
    async fn get_msg(&self, message_id: &str) -> Result<Value, BridgeError> {
        self.call_action("get_msg", params([("message_id", id_param(message_id))]))
            .await
    }

    async fn get_group_member_info(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<MemberInfo, BridgeError> {
        self.call_typed(
            "get_group_member_info",
            params([
                ("group_id", id_param(group_id)),
                ("user_id", id_param(user_id)),
                ("no_cache", json!(false)),
            ]),
        )
        .await
    }

    async fn get_stranger_info(&self, user_id: &str) -> Result<StrangerInfo, BridgeError> {
        self.call_typed("get_stranger_info", params([("user_id", id_param(user_id))]))
            .await
    }

    async fn get_group_file_url(
        &self,
        group_id: &str,
        file_id: &str,
    ) -> Result<FileUrl, BridgeError> {
        self.call_typed(
            "get_group_file_url",
            params([("group_id", id_param(group_id)), ("file_id", json!(file_id))]),
        )
        .await
    }

    async fn get_private_file_url(&self, file_id: &str) -> Result<FileUrl, BridgeError> {
        self.call_typed("get_private_file_url", params([("file_id", json!(file_id))]))
            .await
    }

    async fn send_text(&self, target: &ReplyTarget, text: &str) -> Result<String, BridgeError> {
        let (action, body) = match target {
            ReplyTarget::Group(group) => (
                "send_group_msg",
                params([("group_id", id_param(group)), ("message", json!(text))]),
            ),
            ReplyTarget::Private(user) => (
                "send_private_msg",
                params([("user_id", id_param(user)), ("message", json!(text))]),
            ),
        };
        let data = self.call_action(action, body).await?;
        Ok(data
            .get("message_id")
            .and_then(crate::event::id_string)
            .unwrap_or_default())
    }
}

#[async_trait]
impl PluginAdapter for HttpApi {
    fn name(&self) -> &str {
        "onebot-http"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, BridgeError> {
        match self.call_action("get_status", json!({})).await {
            Ok(status) if status.get("online") == Some(&Value::Bool(false)) => {
                Ok(HealthStatus::Degraded("bot account is offline".into()))
            }
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "OneBot HTTP API unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), BridgeError> {
        debug!("OneBot HTTP client shutting down");
        Ok(())
    }
}
