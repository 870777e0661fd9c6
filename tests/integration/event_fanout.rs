#[path = "support.rs"]
mod support;

use gabp_protocol::Message;
use serde_json::json;
use support::{expect_result, start_test_server, GabpTestClient, TEST_TOKEN};

/// S6 — subscribe, then receive ordered events.
#[tokio::test]
async fn subscriber_receives_events_in_order_with_strictly_increasing_seq() {
    let server = start_test_server().await;
    let mut client = GabpTestClient::connect(server.port()).await;
    expect_result(client.hello(TEST_TOKEN).await);

    client
        .send(&Message::request(
            "events/subscribe",
            Some(json!({ "channels": ["system/status", "ghost"] })),
        ))
        .await;
    let response = client.recv().await;
    let result = expect_result(response);
    assert_eq!(result["subscribed"], json!(["system/status"]));

    server
        .events()
        .emit("system/status", json!({ "k": 1 }), None)
        .await;
    server
        .events()
        .emit("system/status", json!({ "k": 2 }), None)
        .await;

    let first = client.recv().await;
    let second = client.recv().await;

    match (first, second) {
        (
            Message::Event { seq: s1, payload: p1, channel: c1, .. },
            Message::Event { seq: s2, payload: p2, channel: c2, .. },
        ) => {
            assert_eq!(s1, 1);
            assert_eq!(s2, 2);
            assert_eq!(p1, json!({ "k": 1 }));
            assert_eq!(p2, json!({ "k": 2 }));
            assert_eq!(c1, "system/status");
            assert_eq!(c2, "system/status");
        }
        other => panic!("expected two ordered events, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn unsubscribe_stops_future_delivery() {
    let server = start_test_server().await;
    let mut client = GabpTestClient::connect(server.port()).await;
    expect_result(client.hello(TEST_TOKEN).await);

    client
        .send(&Message::request(
            "events/subscribe",
            Some(json!({ "channels": ["system/log"] })),
        ))
        .await;
    expect_result(client.recv().await);

    client
        .send(&Message::request(
            "events/unsubscribe",
            Some(json!({ "channels": ["system/log"] })),
        ))
        .await;
    let result = expect_result(client.recv().await);
    assert_eq!(result["unsubscribed"], json!(["system/log"]));

    assert_eq!(server.events().subscriber_count("system/log").await, 0);

    server.stop().await;
}

#[tokio::test]
async fn emit_on_unregistered_channel_reaches_no_one_and_does_not_error() {
    let server = start_test_server().await;
    let seq = server.events().emit("ghost", json!({}), None).await;
    assert!(seq.is_none());
    server.stop().await;
}
