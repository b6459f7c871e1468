// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: raw events in through the mock transport, finalized
//! messages out of the collecting sink.

use std::time::Duration;

use onebridge_config::model::OneBotConfig;
use onebridge_core::types::{Component, MessageCategory, SessionId};
use onebridge_onebot::api::ReplyTarget;
use onebridge_onebot::normalize::POST_FORMAT_HINT;
use onebridge_test_utils::events::{self, SELF_ID};
use onebridge_test_utils::{MockTransport, TestHarness};

fn harness() -> TestHarness {
    TestHarness::builder().build().expect("harness builds")
}

fn harness_with(transport: MockTransport) -> TestHarness {
    TestHarness::builder()
        .with_transport(transport)
        .build()
        .expect("harness builds")
}

#[tokio::test(start_paused = true)]
async fn fragments_merge_after_quiet_period() {
    let h = harness();
    assert!(h.emit(events::group_text("100", "42", "hi")).await);
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(h.emit(events::group_text("100", "42", "there")).await);

    tokio::time::sleep(Duration::from_millis(9_900)).await;
    assert_eq!(h.sink.count(), 0, "nothing may flush inside the window");

    let flushed = h
        .sink
        .wait_for(1, Duration::from_secs(1))
        .await
        .expect("one flush after the window");
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].text_summary, "hi\nthere");
    assert_eq!(
        flushed[0].component_chain,
        vec![Component::text("hi"), Component::text("there")]
    );
    assert_eq!(flushed[0].session_id, SessionId("100".into()));
    assert_eq!(h.channel.scheduler().pending_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn command_is_dispatched_immediately() {
    let h = harness();
    h.emit(events::group_text("100", "42", "/status")).await;

    let messages = h.sink.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text_summary, "/status");
    assert_eq!(h.channel.scheduler().pending_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn command_does_not_touch_an_open_buffer() {
    let h = harness();
    h.emit(events::group_text("100", "42", "draft")).await;
    h.emit(events::group_text("100", "42", "/help")).await;

    assert_eq!(h.sink.count(), 1);
    assert_eq!(
        h.channel
            .scheduler()
            .pending_len(&SessionId("100".into())),
        1
    );

    let all = h.sink.wait_for(2, Duration::from_secs(11)).await.unwrap();
    assert_eq!(all[1].text_summary, "draft");
}

#[tokio::test(start_paused = true)]
async fn failed_quote_fetch_falls_back_to_raw_reply() {
    let h = harness();
    h.emit(events::group_message(
        "100",
        "42",
        vec![events::reply("42"), events::text("/ack")],
    ))
    .await;

    let message = &h.sink.messages()[0];
    let Component::Reply(reply) = &message.component_chain[0] else {
        panic!("expected a reply component, got {:?}", message.component_chain);
    };
    assert_eq!(reply.message_id, "42");
    assert!(reply.chain.is_empty());
    assert_eq!(h.transport.call_count("get_msg").await, 1);
}

#[tokio::test(start_paused = true)]
async fn quoted_message_is_embedded() {
    let transport = MockTransport::new().with_message(
        "42",
        events::quoted_message("42", "100", "7", "original words"),
    );
    let h = harness_with(transport);
    h.emit(events::group_message(
        "100",
        "42",
        vec![events::reply("42"), events::text("/agree")],
    ))
    .await;

    let message = &h.sink.messages()[0];
    let Component::Reply(reply) = &message.component_chain[0] else {
        panic!("expected a reply component");
    };
    assert_eq!(reply.sender_id, "7");
    assert_eq!(reply.sender_name, "user 7");
    assert_eq!(reply.text, "original words");
    assert_eq!(reply.chain, vec![Component::text("original words")]);
    assert_eq!(message.text_summary, "/agree");
}

#[tokio::test(start_paused = true)]
async fn failed_middle_enrichment_keeps_sibling_order() {
    let transport = MockTransport::new()
        .with_file("first", "https://dl/first", "first.txt")
        .with_file("third", "https://dl/third", "third.txt")
        .with_delay("get_group_file_url", Duration::from_millis(50));
    let h = harness_with(transport);

    h.emit(events::group_message(
        "100",
        "42",
        vec![
            events::file_ref("first"),
            events::file_ref("second"),
            events::file_ref("third"),
        ],
    ))
    .await;

    let flushed = h.sink.wait_for(1, Duration::from_secs(11)).await.unwrap();
    assert_eq!(
        flushed[0].component_chain,
        vec![
            Component::File {
                name: "first.txt".into(),
                url: "https://dl/first".into()
            },
            Component::File {
                name: "third.txt".into(),
                url: "https://dl/third".into()
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn slow_earlier_slot_still_leads_the_chain() {
    let transport = MockTransport::new()
        .with_member("100", "7", "slow", "")
        .with_file("quick", "https://dl/quick", "quick.txt")
        .with_delay("get_group_member_info", Duration::from_secs(2));
    let h = harness_with(transport);

    let started = tokio::time::Instant::now();
    h.emit(events::group_message(
        "100",
        "42",
        vec![events::at("7"), events::file_ref("quick")],
    ))
    .await;
    // lookups overlap: the whole message took one slow lookup, not two
    assert!(started.elapsed() < Duration::from_secs(3));

    let flushed = h.sink.wait_for(1, Duration::from_secs(11)).await.unwrap();
    assert_eq!(
        flushed[0].component_chain,
        vec![
            Component::At {
                target_id: "7".into(),
                display_name: "slow".into()
            },
            Component::File {
                name: "quick.txt".into(),
                url: "https://dl/quick".into()
            },
        ]
    );
    let calls = h.transport.calls().await;
    assert_eq!(calls[0].action, "get_group_member_info");
    assert_eq!(calls[1].action, "get_group_file_url");
}

#[tokio::test(start_paused = true)]
async fn own_outbound_echo_is_never_dispatched() {
    let h = harness();
    let mut echo = events::group_text("100", &SELF_ID.to_string(), "bot reply");
    echo["post_type"] = "message_sent".into();

    assert!(!h.emit(echo).await);
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(h.sink.count(), 0);
    assert_eq!(h.channel.scheduler().pending_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn null_segment_data_does_not_drop_the_message() {
    let h = harness();
    h.emit(events::group_message(
        "100",
        "42",
        vec![
            events::text("hello"),
            serde_json::json!({"type": "face", "data": null}),
        ],
    ))
    .await;

    let flushed = h.sink.wait_for(1, Duration::from_secs(11)).await.unwrap();
    assert_eq!(flushed[0].text_summary, "hello");
    assert_eq!(flushed[0].component_chain.len(), 2);
    assert!(h.transport.sent_texts().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_mention_lookup_degrades_in_place() {
    let transport = MockTransport::new()
        .with_member("100", "7", "seven", "")
        .with_member("100", "9", "nine", "")
        .with_delay("get_group_member_info", Duration::from_millis(20));
    let h = harness_with(transport);
    h.transport.fail_action("get_stranger_info").await;

    h.emit(events::group_message(
        "100",
        "42",
        vec![events::at("7"), events::at("8"), events::at("9")],
    ))
    .await;

    let flushed = h.sink.wait_for(1, Duration::from_secs(11)).await.unwrap();
    let names: Vec<_> = flushed[0]
        .component_chain
        .iter()
        .map(|c| match c {
            Component::At {
                target_id,
                display_name,
            } => (target_id.as_str(), display_name.as_str()),
            other => panic!("unexpected component {other:?}"),
        })
        .collect();
    assert_eq!(names, vec![("7", "seven"), ("8", ""), ("9", "nine")]);
    assert_eq!(flushed[0].text_summary, " @seven(7)  @nine(9) ");
}

#[tokio::test(start_paused = true)]
async fn self_mention_is_excluded_from_summary() {
    let self_id = SELF_ID.to_string();
    let transport = MockTransport::new().with_member("100", &self_id, "bot", "");
    let h = harness_with(transport);

    h.emit(events::group_message(
        "100",
        "42",
        vec![events::at(&self_id), events::text(" /weather ")],
    ))
    .await;

    let message = &h.sink.messages()[0];
    assert_eq!(message.text_summary, "/weather");
    assert_eq!(message.component_chain.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn independent_sessions_flush_independently() {
    let h = harness();
    let groups: Vec<String> = (1..=5).map(|i| format!("g{i}")).collect();

    for round in ["one", "two"] {
        for group in &groups {
            h.emit(events::group_text(group, "42", &format!("{group}-{round}")))
                .await;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    let flushed = h.sink.wait_for(5, Duration::from_secs(11)).await.unwrap();
    assert_eq!(flushed.len(), 5);
    for group in &groups {
        let message = flushed
            .iter()
            .find(|m| m.session_id.0 == *group)
            .expect("every session flushes");
        assert_eq!(message.text_summary, format!("{group}-one\n{group}-two"));
    }

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.sink.count(), 5);
}

#[tokio::test(start_paused = true)]
async fn arrival_at_the_flush_instant_is_neither_lost_nor_duplicated() {
    let h = harness();
    h.emit(events::group_text("100", "42", "a")).await;
    tokio::time::advance(Duration::from_secs(10)).await;
    h.emit(events::group_text("100", "42", "b")).await;
    tokio::time::sleep(Duration::from_secs(11)).await;

    let texts: Vec<String> = h
        .sink
        .messages()
        .iter()
        .flat_map(|m| m.text_summary.lines().map(str::to_string).collect::<Vec<_>>())
        .collect();
    assert_eq!(texts, vec!["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn unique_session_scopes_per_sender() {
    let config = OneBotConfig {
        unique_session: true,
        ..OneBotConfig::default()
    };
    let h = TestHarness::builder().with_config(config).build().unwrap();
    h.emit(events::group_text("100", "1", "from one")).await;
    h.emit(events::group_text("100", "2", "from two")).await;

    let flushed = h.sink.wait_for(2, Duration::from_secs(11)).await.unwrap();
    let mut sessions: Vec<_> = flushed.iter().map(|m| m.session_id.0.clone()).collect();
    sessions.sort();
    assert_eq!(sessions, vec!["1_100", "2_100"]);
}

#[tokio::test(start_paused = true)]
async fn notices_and_requests_bypass_buffering() {
    let h = harness();
    h.emit(events::poke_notice("100", "42", &SELF_ID.to_string())).await;
    h.emit(events::friend_request("42")).await;

    let messages = h.sink.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].category, MessageCategory::Notice);
    assert_eq!(
        messages[0].component_chain,
        vec![Component::Poke {
            target_id: SELF_ID.to_string()
        }]
    );
    assert_eq!(messages[1].category, MessageCategory::Request);
    assert_eq!(h.channel.scheduler().pending_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn string_payload_is_dropped_with_diagnostic() {
    let h = harness();
    h.emit(events::string_payload_message("100", "42", "[CQ:face,id=1]"))
        .await;

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(h.sink.count(), 0);
    assert_eq!(
        h.transport.sent_texts().await,
        vec![(ReplyTarget::Group("100".into()), POST_FORMAT_HINT.to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn system_manager_messages_are_discarded() {
    let h = harness();
    h.emit(events::group_text("100", "2854196310", "/notice"))
        .await;
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(h.sink.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn direct_file_reference_uses_private_lookup() {
    let transport = MockTransport::new().with_file("f1", "https://dl/f1", "notes.md");
    let h = harness_with(transport);
    h.emit(events::private_message("42", vec![events::file_ref("f1")]))
        .await;

    let flushed = h.sink.wait_for(1, Duration::from_secs(11)).await.unwrap();
    assert_eq!(flushed[0].category, MessageCategory::DirectMessage);
    assert_eq!(flushed[0].session_id.0, "42");
    assert_eq!(h.transport.call_count("get_private_file_url").await, 1);
    assert_eq!(h.transport.call_count("get_group_file_url").await, 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_abandons_open_windows() {
    let h = harness();
    h.emit(events::group_text("100", "42", "pending")).await;
    assert_eq!(h.channel.scheduler().shutdown(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.sink.count(), 0);
}
