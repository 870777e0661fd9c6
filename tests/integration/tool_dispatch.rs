#[path = "support.rs"]
mod support;

use gabp::tool::{BoxFuture, GabpTool, ToolDescriptor, ToolError, ToolHandler, ToolParameter};
use serde_json::{json, Value};
use std::sync::Arc;
use support::{expect_error_code, expect_result, start_test_server, GabpTestClient, TEST_TOKEN};

/// S4 — tool dispatch.
#[tokio::test]
async fn registered_tool_call_returns_handler_result() {
    let server = start_test_server().await;

    let add: ToolHandler = Arc::new(|args: Value| {
        Box::pin(async move {
            let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
            let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
            Ok(json!(a + b))
        })
    });
    server
        .tools()
        .register_tool("math/add", add, None)
        .await
        .unwrap();

    let mut client = GabpTestClient::connect(server.port()).await;
    expect_result(client.hello(TEST_TOKEN).await);

    let response = client
        .call_tool("r4", "math/add", json!({ "a": 5, "b": 3 }))
        .await;
    assert_eq!(expect_result(response), json!(8));

    server.stop().await;
}

/// S5 — unknown tool.
#[tokio::test]
async fn unknown_tool_name_yields_tool_not_found() {
    let server = start_test_server().await;
    let mut client = GabpTestClient::connect(server.port()).await;
    expect_result(client.hello(TEST_TOKEN).await);

    let response = client.call_tool("r5", "no/such", Value::Null).await;
    assert_eq!(expect_error_code(response), -31002);

    server.stop().await;
}

#[tokio::test]
async fn missing_tool_name_yields_invalid_params() {
    let server = start_test_server().await;
    let mut client = GabpTestClient::connect(server.port()).await;
    expect_result(client.hello(TEST_TOKEN).await);

    let response = client.call_tool("r6", "", Value::Null).await;
    assert_eq!(expect_error_code(response), -32602);

    server.stop().await;
}

#[tokio::test]
async fn handler_failure_surfaces_as_internal_error() {
    let server = start_test_server().await;

    let failing: ToolHandler = Arc::new(|_: Value| {
        Box::pin(async move { Err(gabp::ToolError::new("handler exploded")) })
    });
    server
        .tools()
        .register_tool("boom/tool", failing, None)
        .await
        .unwrap();

    let mut client = GabpTestClient::connect(server.port()).await;
    expect_result(client.hello(TEST_TOKEN).await);

    let response = client.call_tool("r7", "boom/tool", Value::Null).await;
    assert_eq!(expect_error_code(response), -32603);

    server.stop().await;
}

#[tokio::test]
async fn tools_list_enumerates_registered_tools_in_insertion_order() {
    let server = start_test_server().await;
    let noop: ToolHandler = Arc::new(|_: Value| Box::pin(async move { Ok(Value::Null) }));
    server
        .tools()
        .register_tool("b/second", Arc::clone(&noop), None)
        .await
        .unwrap();
    server
        .tools()
        .register_tool("a/first", noop, None)
        .await
        .unwrap();

    let mut client = GabpTestClient::connect(server.port()).await;
    expect_result(client.hello(TEST_TOKEN).await);

    client
        .send(&gabp_protocol::Message::request("tools/list", None))
        .await;
    let response = client.recv().await;
    let result = expect_result(response);
    let names: Vec<&str> = result["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["b/second", "a/first"]);

    server.stop().await;
}

/// A host type implementing [`GabpTool`] directly, registered through
/// `register_tools_from` rather than the `register_tool` builder.
struct GreetTool;

impl GabpTool for GreetTool {
    fn name(&self) -> &str {
        "greet/hello"
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("greet/hello")
            .with_description("Greets the caller by name")
            .with_parameters(vec![ToolParameter::required("name", "string")])
    }

    fn call(&self, args: Value) -> BoxFuture<'static, Result<Value, ToolError>> {
        Box::pin(async move {
            let name = args.get("name").and_then(Value::as_str).unwrap_or("stranger").to_owned();
            Ok(json!({ "greeting": format!("hello, {name}") }))
        })
    }
}

#[tokio::test]
async fn gabp_tool_registered_via_register_tools_from_is_callable_over_the_wire() {
    let server = start_test_server().await;
    let tools: Vec<Box<dyn GabpTool>> = vec![Box::new(GreetTool)];
    server.tools().register_tools_from(tools).await.unwrap();

    let mut client = GabpTestClient::connect(server.port()).await;
    expect_result(client.hello(TEST_TOKEN).await);

    let response = client
        .call_tool("r8", "greet/hello", json!({ "name": "ada" }))
        .await;
    assert_eq!(expect_result(response), json!({ "greeting": "hello, ada" }));

    server.stop().await;
}
