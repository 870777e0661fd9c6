#[path = "support.rs"]
mod support;

use gabp_protocol::{FrameCodec, Message};
use support::{expect_result, start_test_server, GabpTestClient, TEST_TOKEN};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Property 2 — k concatenated frames written in one burst are all
/// processed, each receiving exactly one response with the matching `id`.
#[tokio::test]
async fn concatenated_requests_each_receive_exactly_one_response() {
    let server = start_test_server().await;
    let mut client = GabpTestClient::connect(server.port()).await;
    expect_result(client.hello(TEST_TOKEN).await);

    let mut burst = Vec::new();
    for i in 0..5 {
        let message = Message::Request {
            v: gabp_protocol::PROTOCOL_VERSION.to_owned(),
            id: format!("burst-{i}"),
            method: "tools/list".to_owned(),
            params: None,
        };
        let payload = serde_json::to_vec(&message).unwrap();
        burst.extend_from_slice(&FrameCodec::encode(&payload));
    }
    client.send_raw(&burst).await;

    for i in 0..5 {
        let response = client.recv().await;
        match response {
            Message::Response { id, .. } => assert_eq!(id, format!("burst-{i}")),
            other => panic!("expected a response, got {other:?}"),
        }
    }

    server.stop().await;
}

/// A malformed header (non-numeric `Content-Length`) closes the connection
/// rather than leaving it open to deadlock, per the recorded open-question
/// decision in `spec.md` §9.
#[tokio::test]
async fn malformed_frame_header_closes_the_connection() {
    let server = start_test_server().await;
    let mut stream = TcpStream::connect(("127.0.0.1", server.port())).await.unwrap();
    stream
        .write_all(b"Content-Length: not-a-number\r\n\r\n{}")
        .await
        .unwrap();
    stream.flush().await.unwrap();

    // The server should close its end; reads now return EOF (0 bytes) or an
    // error instead of hanging.
    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(std::time::Duration::from_secs(2), stream.read(&mut buf))
        .await
        .expect("server should close promptly, not hang")
        .unwrap_or(0);
    assert_eq!(n, 0);

    server.stop().await;
}

/// A JSON payload that fails to parse is dropped with a warning; the
/// connection stays open and a subsequent well-formed request still works.
#[tokio::test]
async fn malformed_json_payload_is_dropped_without_closing_the_connection() {
    let server = start_test_server().await;
    let mut client = GabpTestClient::connect(server.port()).await;

    client.send_raw(&FrameCodec::encode(b"{not-json")).await;
    let response = client.hello(TEST_TOKEN).await;
    let result = expect_result(response);
    assert_eq!(result["agentId"], "gabp-test");

    server.stop().await;
}
