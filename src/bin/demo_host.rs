//! Illustrative host integration: a handful of sample "game tools"
//! (`inventory/get`, `world/place_block`) and a periodic `system/status`
//! emitter, wired against a real [`gabp::GabpServer`]. Not part of the
//! library's public contract — `spec.md` §1 calls these tools illustrative.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gabp::tool::{ToolDescriptor, ToolHandler, ToolParameter};
use gabp::{GabpConfig, GabpServer};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = GabpConfig::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_filter.clone()))
        .init();

    let server = GabpServer::new(config);
    register_demo_tools(&server).await;

    server.start().await.expect("failed to start gabp server");
    tracing::info!(port = server.port(), token = server.token(), "demo host ready");

    let events = Arc::clone(server.events());
    let status_task = tokio::spawn(async move {
        let mut tick: u64 = 0;
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            tick += 1;
            events
                .emit("system/status", json!({ "tick": tick }), None)
                .await;
        }
    });

    tokio::signal::ctrl_c().await.expect("failed to listen for ctrl-c");
    status_task.abort();
    server.stop().await;
}

async fn register_demo_tools(server: &GabpServer) {
    let inventory: Arc<Mutex<Vec<String>>> =
        Arc::new(Mutex::new(vec!["torch".to_owned(), "pickaxe".to_owned()]));

    let inventory_get = Arc::clone(&inventory);
    let inventory_handler: ToolHandler = Arc::new(move |_args: Value| {
        let inventory = Arc::clone(&inventory_get);
        Box::pin(async move {
            let items = inventory.lock().expect("inventory lock poisoned").clone();
            Ok(json!({ "items": items }))
        })
    });
    server
        .tools()
        .register_tool(
            "inventory/get",
            inventory_handler,
            Some(
                ToolDescriptor::new("inventory/get")
                    .with_description("Lists items currently held by the player"),
            ),
        )
        .await
        .expect("tool name is non-empty");

    let place_block_handler: ToolHandler = Arc::new(|args: Value| {
        Box::pin(async move {
            let x = args.get("x").and_then(Value::as_i64).unwrap_or(0);
            let y = args.get("y").and_then(Value::as_i64).unwrap_or(0);
            let z = args.get("z").and_then(Value::as_i64).unwrap_or(0);
            let block = args
                .get("block")
                .and_then(Value::as_str)
                .unwrap_or("stone")
                .to_owned();
            Ok(json!({ "placed": block, "at": { "x": x, "y": y, "z": z } }))
        })
    });
    server
        .tools()
        .register_tool(
            "world/place_block",
            place_block_handler,
            Some(
                ToolDescriptor::new("world/place_block")
                    .with_description("Places a block at the given coordinates")
                    .with_parameters(vec![
                        ToolParameter::required("x", "integer"),
                        ToolParameter::required("y", "integer"),
                        ToolParameter::required("z", "integer"),
                        ToolParameter::optional("block", "string", json!("stone")),
                    ]),
            ),
        )
        .await
        .expect("tool name is non-empty");
}
