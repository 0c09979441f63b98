// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the channel facade.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tether_core::{ManualClock, NORMAL_CLOSURE};

use super::client::{Channel, ConnectionState, SendOptions};
use super::events::{self, ChannelEvent};
use super::test_helpers::{
    make_channel, make_channel_with_clock, next_event, server_envelope, test_config, wait_until,
};
use super::transport::TransportEvent;
use super::transport_tests::MockNetwork;
use crate::config::ChannelConfig;
use crate::error::Error;

#[tokio::test]
async fn test_connect_disconnect() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    let mut connected = channel.subscribe(events::CONNECTED);
    let mut disconnected = channel.subscribe(events::DISCONNECTED);

    assert_eq!(channel.state(), ConnectionState::Disconnected);
    assert!(!channel.is_connected());

    channel.connect().await.unwrap();
    assert_eq!(channel.state(), ConnectionState::Connected);
    assert!(channel.is_connected());
    assert_eq!(next_event(&mut connected).await, ChannelEvent::Connected);

    channel.disconnect();
    assert_eq!(channel.state(), ConnectionState::Disconnected);
    match next_event(&mut disconnected).await {
        ChannelEvent::Disconnected(frame) => assert_eq!(frame.code, NORMAL_CLOSURE),
        other => panic!("expected disconnected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_close_sends_normal_close_frame() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    channel.connect().await.unwrap();

    channel.close().await;

    let closes = network.client_closes();
    assert_eq!(closes.len(), 1);
    assert!(closes[0].is_intentional());
    assert!(!network.has_open_connection());
}

#[tokio::test]
async fn test_connect_when_connected_is_noop() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());

    channel.connect().await.unwrap();
    channel.connect().await.unwrap();

    assert_eq!(network.connect_attempts(), 1);
    assert_eq!(channel.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_concurrent_connects_share_one_attempt() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());

    let (a, b) = tokio::join!(channel.connect(), channel.connect());
    a.unwrap();
    b.unwrap();
    assert_eq!(network.connect_attempts(), 1);
}

#[tokio::test]
async fn test_send_while_disconnected_is_queued() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());

    let id = channel.send("ping", json!({"n": 1}));

    assert_eq!(channel.queue_size(), 1);
    assert_eq!(channel.queued()[0].id(), id);
    assert!(network.sent().is_empty());
}

#[tokio::test]
async fn test_queued_envelope_flushed_on_connect() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());

    let id = channel.send("ping", json!({"n": 1}));
    channel.connect().await.unwrap();

    assert_eq!(channel.queue_size(), 0);
    let sent = network.sent_envelopes();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id(), id);
    assert_eq!(sent[0].kind(), "ping");
    assert_eq!(sent[0].payload(), &json!({"n": 1}));
}

#[tokio::test]
async fn test_send_while_connected_transmits() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    channel.connect().await.unwrap();

    let id = channel.send("chat", json!("hi"));

    assert_eq!(channel.queue_size(), 0);
    wait_until(|| network.sent().len() == 1).await;
    assert_eq!(network.sent_ids(), vec![id]);
}

#[tokio::test]
async fn test_envelope_wire_format() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    channel.send("ping", json!({"n": 1}));
    channel.connect().await.unwrap();

    let frame: serde_json::Value = serde_json::from_str(&network.sent()[0]).unwrap();
    let object = frame.as_object().unwrap();
    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["id", "payload", "timestamp", "type"]);
    assert_eq!(frame["type"], "ping");
    assert!(frame["timestamp"].is_u64());
}

#[tokio::test(start_paused = true)]
async fn test_first_connect_failure_rejects_and_keeps_retrying() {
    let network = MockNetwork::new();
    network.fail_next_connects(1);
    let channel = make_channel(&network, test_config());
    let mut errors = channel.subscribe(events::ERROR);
    let mut reconnected = channel.subscribe(events::RECONNECTED);

    let result = channel.connect().await;
    assert!(matches!(result, Err(Error::Transport(_))));
    assert!(matches!(next_event(&mut errors).await, ChannelEvent::Error { .. }));

    assert_eq!(
        next_event(&mut reconnected).await,
        ChannelEvent::Reconnected { attempts: 1 }
    );
    assert_eq!(channel.state(), ConnectionState::Connected);
    assert_eq!(network.connect_attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_server_normal_close_does_not_reconnect() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    let mut disconnected = channel.subscribe(events::DISCONNECTED);
    channel.connect().await.unwrap();

    assert!(network.drop_connection(NORMAL_CLOSURE));
    match next_event(&mut disconnected).await {
        ChannelEvent::Disconnected(frame) => assert!(frame.is_intentional()),
        other => panic!("expected disconnected, got {other:?}"),
    }

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(channel.state(), ConnectionState::Disconnected);
    assert_eq!(network.connect_attempts(), 1);
}

#[tokio::test]
async fn test_inbound_message_dispatched_by_name_and_type() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    let mut messages = channel.subscribe(events::MESSAGE);
    let mut typed = channel.subscribe("chat");
    channel.connect().await.unwrap();

    let envelope = server_envelope("chat", json!({"text": "hello"}));
    assert!(network.push_envelope(&envelope));

    assert_eq!(
        next_event(&mut messages).await,
        ChannelEvent::Message(envelope.clone())
    );
    assert_eq!(next_event(&mut typed).await, ChannelEvent::Message(envelope));
}

#[tokio::test]
async fn test_message_typed_envelope_dispatched_once() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    channel.on(events::MESSAGE, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let mut messages = channel.subscribe(events::MESSAGE);
    channel.connect().await.unwrap();

    network.push_envelope(&server_envelope("message", json!(1)));
    network.push_envelope(&server_envelope("chat", json!(2)));
    next_event(&mut messages).await;
    next_event(&mut messages).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cacheable_inbound_payload_cached_by_id() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    let mut messages = channel.subscribe(events::MESSAGE);
    channel.connect().await.unwrap();

    let status = server_envelope("system_status", json!({"ok": true}));
    let chat = server_envelope("chat", json!({"text": "hi"}));
    network.push_envelope(&status);
    network.push_envelope(&chat);
    next_event(&mut messages).await;
    next_event(&mut messages).await;

    assert_eq!(channel.cached(status.id()), Some(json!({"ok": true})));
    assert_eq!(channel.cached(chat.id()), None);
    assert_eq!(channel.cache_stats().keys, vec![status.id().to_string()]);
}

#[tokio::test]
async fn test_malformed_frame_dropped_without_error_event() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    let mut messages = channel.subscribe(events::MESSAGE);
    let mut errors = channel.subscribe(events::ERROR);
    channel.connect().await.unwrap();

    network.push(TransportEvent::Message("not json".to_string()));
    network.push(TransportEvent::Message(r#"{"type":"","id":"x","timestamp":1}"#.to_string()));
    let valid = server_envelope("chat", json!(1));
    network.push_envelope(&valid);

    assert_eq!(next_event(&mut messages).await, ChannelEvent::Message(valid));
    assert!(errors.try_recv().is_err());
    assert!(channel.is_connected());
}

#[tokio::test]
async fn test_send_with_cache_option() {
    let network = MockNetwork::new();
    let clock = ManualClock::new(1_700_000_000_000);
    let channel = make_channel_with_clock(&network, test_config(), &clock);

    let id = channel.send_with(
        "ping",
        json!({"n": 1}),
        SendOptions::cached_for(Duration::from_millis(10)),
    );
    let key = format!("msg_{id}");

    let cached = channel.cached(&key).unwrap();
    assert_eq!(cached["id"], id.as_str());
    assert_eq!(cached["type"], "ping");
    assert_eq!(cached["payload"], json!({"n": 1}));
    assert_eq!(cached["timestamp"], 1_700_000_000_000u64);

    clock.advance(10);
    assert!(channel.cached(&key).is_some());
    clock.advance(1);
    assert_eq!(channel.cached(&key), None);
}

#[tokio::test]
async fn test_send_without_cache_option_not_cached() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());

    let id = channel.send("ping", json!(null));
    assert_eq!(channel.cached(&format!("msg_{id}")), None);
    assert_eq!(channel.cache_stats().size, 0);
}

#[tokio::test]
async fn test_id_format() {
    let network = MockNetwork::new();
    let clock = ManualClock::new(1_700_000_000_123);
    let channel = make_channel_with_clock(&network, test_config(), &clock);

    let id = channel.send("ping", json!(null));
    let (millis, suffix) = id.split_once('_').unwrap();
    assert_eq!(millis, "1700000000123");
    assert_eq!(suffix.len(), 9);
    assert!(suffix
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
}

#[tokio::test]
async fn test_clear_queue_and_cache() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    channel.send_with("a", json!(1), SendOptions::cached());
    channel.send("b", json!(2));
    channel.cache("manual", json!("x"), None);

    assert_eq!(channel.clear_queue(), 2);
    assert_eq!(channel.queue_size(), 0);
    assert_eq!(channel.cache_stats().size, 2);

    channel.clear_cache();
    assert_eq!(channel.cache_stats().size, 0);
}

#[tokio::test]
async fn test_sweep_cache_reclaims_expired_entries() {
    let network = MockNetwork::new();
    let clock = ManualClock::new(0);
    let channel = make_channel_with_clock(&network, test_config(), &clock);
    channel.cache("short", json!(1), Some(Duration::from_millis(5)));
    channel.cache("long", json!(2), None);

    clock.advance(6);
    assert_eq!(channel.sweep_cache(), 1);
    assert_eq!(channel.cache_stats().keys, vec!["long".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_sweep_runs_after_connect() {
    let network = MockNetwork::new();
    let clock = ManualClock::new(0);
    let config = ChannelConfig {
        cleanup_interval_ms: 1_000,
        ..test_config()
    };
    let channel = make_channel_with_clock(&network, config, &clock);
    channel.cache("short", json!(1), Some(Duration::from_millis(5)));
    channel.connect().await.unwrap();

    clock.advance(6);
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(channel.cache_stats().size, 0);
}

#[tokio::test]
async fn test_dropped_subscription_does_not_disturb_others() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    channel.on(events::CONNECTED, move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    let rx = channel.subscribe(events::CONNECTED);
    drop(rx);
    channel.connect().await.unwrap();
    channel.disconnect();
    channel.connect().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_off_stops_delivery() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let subscription = channel.on(events::CONNECTED, move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    assert!(channel.off(&subscription));
    channel.connect().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_callback_may_call_back_into_channel() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    let weak = channel.downgrade();
    channel.on(events::CONNECTED, move |_| {
        if let Some(inner) = weak.upgrade() {
            inner.send("hello", json!(null));
        }
    });

    channel.connect().await.unwrap();
    wait_until(|| network.sent().len() == 1).await;
    assert_eq!(network.sent_envelopes()[0].kind(), "hello");
}

#[test]
fn test_new_rejects_invalid_config() {
    let result = Channel::new(ChannelConfig::new("http://example.com"));
    assert!(matches!(result, Err(Error::Config(_))));

    let result = Channel::new(ChannelConfig::default());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_connection_state_display() {
    assert_eq!(ConnectionState::Connected.to_string(), "connected");
    assert_eq!(
        ConnectionState::Reconnecting { attempt: 2 }.to_string(),
        "reconnecting (attempt 2)"
    );
    assert_eq!(ConnectionState::Failed.to_string(), "failed");
}

#[tokio::test]
async fn test_dropping_last_handle_closes_connection() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    channel.connect().await.unwrap();
    assert!(network.has_open_connection());

    drop(channel);
    wait_until(|| !network.has_open_connection()).await;
    assert_eq!(network.client_closes().len(), 1);
}

#[tokio::test]
async fn test_callback_with_weak_handle_does_not_keep_channel_open() {
    let network = MockNetwork::new();
    let channel = make_channel(&network, test_config());
    let weak = channel.downgrade();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    channel.on(events::MESSAGE, move |_| {
        if let Some(inner) = weak.upgrade() {
            counter.fetch_add(inner.queue_size() + 1, Ordering::SeqCst);
        }
    });
    let weak = channel.downgrade();

    channel.connect().await.unwrap();
    network.push_envelope(&server_envelope("note", json!(1)));
    wait_until(|| seen.load(Ordering::SeqCst) == 1).await;

    drop(channel);
    wait_until(|| !network.has_open_connection()).await;
    assert_eq!(network.client_closes().len(), 1);
    assert_eq!(network.client_closes()[0].code, NORMAL_CLOSURE);
    assert!(weak.upgrade().is_none());
}
