// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client tests against a mock OneBot implementation.

use std::sync::Arc;
use std::time::Duration;

use onebridge_config::model::OneBotConfig;
use onebridge_core::traits::PluginAdapter;
use onebridge_core::types::{Component, HealthStatus};
use onebridge_core::BridgeError;
use onebridge_onebot::api::{OneBotApi, ReplyTarget};
use onebridge_onebot::{HttpApi, Normalizer, NormalizerSettings};
use onebridge_test_utils::events;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "ok",
        "retcode": 0,
        "data": data,
    }))
}

fn client(server: &MockServer) -> HttpApi {
    HttpApi::new(&server.uri(), Some("secret"), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn member_info_is_parsed_from_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/get_group_member_info"))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(json!({"group_id": 100, "user_id": 42, "no_cache": false})))
        .respond_with(ok(json!({"card": "Alice", "nickname": "alice", "role": "member"})))
        .expect(1)
        .mount(&server)
        .await;

    let member = client(&server)
        .get_group_member_info("100", "42")
        .await
        .unwrap();
    assert_eq!(member.card, "Alice");
    assert_eq!(member.nickname, "alice");
}

#[tokio::test]
async fn failed_retcode_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/get_msg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "failed",
            "retcode": 1404,
            "data": null,
            "wording": "message not found",
        })))
        .mount(&server)
        .await;

    let err = client(&server).get_msg("42").await.unwrap_err();
    match err {
        BridgeError::Transport { action, message, .. } => {
            assert_eq!(action, "get_msg");
            assert!(message.contains("1404"), "got: {message}");
            assert!(message.contains("message not found"), "got: {message}");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn http_error_status_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let err = client(&server).get_stranger_info("42").await.unwrap_err();
    assert!(matches!(err, BridgeError::Transport { .. }));
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok(json!({})).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let api = HttpApi::new(&server.uri(), None, Duration::from_millis(100)).unwrap();
    let err = api.get_msg("1").await.unwrap_err();
    assert!(matches!(err, BridgeError::Timeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn opaque_file_ids_stay_strings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/get_group_file_url"))
        .and(body_json(json!({"group_id": 100, "file_id": "/a1b2-c3"})))
        .respond_with(ok(json!({"url": "https://dl/x"})))
        .expect(1)
        .mount(&server)
        .await;

    let file = client(&server)
        .get_group_file_url("100", "/a1b2-c3")
        .await
        .unwrap();
    assert_eq!(file.url.as_deref(), Some("https://dl/x"));
}

#[tokio::test]
async fn send_text_targets_group_or_private() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send_group_msg"))
        .and(body_json(json!({"group_id": 100, "message": "hello"})))
        .respond_with(ok(json!({"message_id": 777})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/send_private_msg"))
        .and(body_json(json!({"user_id": 42, "message": "hello"})))
        .respond_with(ok(json!({"message_id": 778})))
        .mount(&server)
        .await;

    let api = client(&server);
    let group = api
        .send_text(&ReplyTarget::Group("100".into()), "hello")
        .await
        .unwrap();
    let private = api
        .send_text(&ReplyTarget::Private("42".into()), "hello")
        .await
        .unwrap();
    assert_eq!(group, "777");
    assert_eq!(private, "778");
}

#[tokio::test]
async fn health_reflects_bot_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/get_status"))
        .respond_with(ok(json!({"online": false, "good": true})))
        .mount(&server)
        .await;

    let status = client(&server).health_check().await.unwrap();
    assert!(matches!(status, HealthStatus::Degraded(_)));

    let unreachable =
        HttpApi::new("http://127.0.0.1:9", None, Duration::from_millis(200)).unwrap();
    assert!(matches!(
        unreachable.health_check().await.unwrap(),
        HealthStatus::Unhealthy(_)
    ));
}

#[tokio::test]
async fn from_config_uses_configured_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/get_stranger_info"))
        .respond_with(ok(json!({"nickname": "bob"})))
        .mount(&server)
        .await;

    let config = OneBotConfig {
        api_base_url: Some(server.uri()),
        ..OneBotConfig::default()
    };
    let api = HttpApi::from_config(&config).unwrap().expect("client configured");
    assert_eq!(api.get_stranger_info("7").await.unwrap().display_name(), "bob");
}

#[tokio::test]
async fn normalizer_enriches_through_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/get_group_member_info"))
        .respond_with(ok(json!({"card": "", "nickname": "member-nick"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/get_stranger_info"))
        .respond_with(ok(json!({"nick": "global-nick"})))
        .mount(&server)
        .await;

    let api: Arc<dyn OneBotApi> = Arc::new(client(&server));
    let normalizer = Normalizer::new(api, NormalizerSettings::from(&OneBotConfig::default()));
    let message = normalizer
        .normalize(events::group_message("100", "1", vec![events::at("7")]).into())
        .await
        .expect("message normalized");

    assert_eq!(
        message.component_chain,
        vec![Component::At {
            target_id: "7".into(),
            display_name: "global-nick".into(),
        }]
    );
}
