#[path = "support.rs"]
mod support;

use gabp_protocol::Message;
use support::{expect_error_code, expect_result, start_test_server, GabpTestClient, TEST_TOKEN};

/// S1 — successful handshake.
#[tokio::test]
async fn successful_handshake_returns_welcome_with_builtin_channels() {
    let server = start_test_server().await;
    let mut client = GabpTestClient::connect(server.port()).await;

    let response = client.hello(TEST_TOKEN).await;
    let result = expect_result(response);

    assert_eq!(result["agentId"], "gabp-test");
    assert_eq!(result["schemaVersion"], "1.0");
    let events = result["capabilities"]["events"].as_array().unwrap();
    let events: Vec<&str> = events.iter().map(|v| v.as_str().unwrap()).collect();
    assert!(events.contains(&"system/status"));
    assert!(events.contains(&"system/log"));

    server.stop().await;
}

/// S2 — pre-auth rejection.
#[tokio::test]
async fn request_before_handshake_is_rejected_with_session_not_established() {
    let server = start_test_server().await;
    let mut client = GabpTestClient::connect(server.port()).await;

    client
        .send(&Message::request("tools/list", None))
        .await;
    let response = client.recv().await;

    assert_eq!(expect_error_code(response), -31001);
    server.stop().await;
}

/// S3 — bad token, then a correct handshake still succeeds.
#[tokio::test]
async fn bad_token_fails_then_correct_token_still_succeeds() {
    let server = start_test_server().await;
    let mut client = GabpTestClient::connect(server.port()).await;

    let rejected = client.hello("wrong").await;
    assert_eq!(expect_error_code(rejected), -31000);

    let accepted = client.hello(TEST_TOKEN).await;
    let result = expect_result(accepted);
    assert_eq!(result["agentId"], "gabp-test");

    server.stop().await;
}

#[tokio::test]
async fn re_handshake_after_auth_is_method_not_allowed() {
    let server = start_test_server().await;
    let mut client = GabpTestClient::connect(server.port()).await;

    let first = client.hello(TEST_TOKEN).await;
    expect_result(first);

    let second = client.hello(TEST_TOKEN).await;
    assert_eq!(expect_error_code(second), -31005);

    server.stop().await;
}

#[tokio::test]
async fn unknown_method_after_auth_is_method_not_found() {
    let server = start_test_server().await;
    let mut client = GabpTestClient::connect(server.port()).await;
    expect_result(client.hello(TEST_TOKEN).await);

    client
        .send(&Message::request("no/such/method", None))
        .await;
    let response = client.recv().await;
    assert_eq!(expect_error_code(response), -32601);

    server.stop().await;
}
