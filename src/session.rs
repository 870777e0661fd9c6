//! Per-connection session state and post-handshake method routing
//! (`spec.md` §4.4).

use std::sync::Arc;

use gabp_protocol::{AppInfo, Capabilities, GabpError, HelloParams, Platform};
use gabp_protocol::{Message, WelcomeResult, SCHEMA_VERSION};
use serde_json::Value;
use tracing::info;

use crate::server::GabpServerInner;
use crate::tool::ToolCallError;

/// `NEW → AUTHENTICATED → CLOSED`. `Closed` is implicit (the connection
/// task simply ends) and is not a state this type needs to represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    New,
    Authenticated,
}

/// Per-connection session state, owned exclusively by that connection's
/// read loop — no lock is needed since only one task ever mutates it.
pub struct Session {
    pub connection_id: String,
    state: SessionState,
    pub bridge_version: Option<String>,
    pub platform: Option<Platform>,
    pub launch_id: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new(connection_id: String) -> Self {
        Self {
            connection_id,
            state: SessionState::New,
            bridge_version: None,
            platform: None,
            launch_id: None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }
}

/// Routes one decoded [`Message`] through the session state machine,
/// returning the response to send back (if any). `response` and `event`
/// messages arriving from a client are ignored per `spec.md` §4.4 — this
/// protocol has no client-originated responses or events.
pub async fn dispatch(
    session: &mut Session,
    message: Message,
    server: &Arc<GabpServerInner>,
) -> Option<Message> {
    let Message::Request { id, method, params, .. } = message else {
        return None;
    };

    if !session.is_authenticated() {
        return Some(handle_pre_auth(session, server, &id, &method, params).await);
    }

    Some(handle_authenticated(session, server, &id, &method, params).await)
}

async fn handle_pre_auth(
    session: &mut Session,
    server: &Arc<GabpServerInner>,
    id: &str,
    method: &str,
    params: Option<Value>,
) -> Message {
    if method != "session/hello" {
        return error_response(id, GabpError::SessionNotEstablished);
    }

    let hello: HelloParams = match params.and_then(|v| serde_json::from_value(v).ok()) {
        Some(hello) => hello,
        None => return error_response(id, GabpError::InvalidParams("missing hello params".into())),
    };

    if hello.token != server.config.token {
        return error_response(id, GabpError::AuthenticationFailed);
    }

    session.state = SessionState::Authenticated;
    session.bridge_version = Some(hello.bridge_version);
    session.platform = Some(hello.platform);
    session.launch_id = Some(hello.launch_id);

    info!(connection_id = %session.connection_id, "session authenticated");

    let tools = server.tools.list().await.into_iter().map(|d| d.name).collect();
    let events = server.events.list_channels().await;

    let welcome = WelcomeResult {
        agent_id: server.config.agent_id.clone(),
        app: AppInfo {
            name: server.config.agent_id.clone(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        },
        capabilities: Capabilities {
            tools,
            events,
            resources: Vec::new(),
        },
        schema_version: SCHEMA_VERSION.to_owned(),
    };

    Message::response_ok(id, serde_json::to_value(welcome).expect("WelcomeResult serializes"))
}

async fn handle_authenticated(
    session: &Session,
    server: &Arc<GabpServerInner>,
    id: &str,
    method: &str,
    params: Option<Value>,
) -> Message {
    match method {
        "session/hello" => error_response(id, GabpError::MethodNotAllowed),
        "tools/list" => {
            let tools = server.tools.list().await;
            let value = serde_json::json!({ "tools": tools });
            Message::response_ok(id, value)
        }
        "tools/call" => handle_tools_call(server, id, params).await,
        "events/subscribe" => handle_events_subscribe(session, server, id, params).await,
        "events/unsubscribe" => handle_events_unsubscribe(session, server, id, params).await,
        _ => error_response(id, GabpError::MethodNotFound(method.to_owned())),
    }
}

async fn handle_tools_call(server: &Arc<GabpServerInner>, id: &str, params: Option<Value>) -> Message {
    let Some(params) = params else {
        return error_response(id, GabpError::InvalidParams("missing params".into()));
    };
    let name = params.get("name").and_then(Value::as_str).unwrap_or("").trim().to_owned();
    if name.is_empty() {
        return error_response(id, GabpError::InvalidParams("missing tool name".into()));
    }
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

    match server.tools.call(&name, arguments).await {
        Ok(result) => Message::response_ok(id, result),
        Err(ToolCallError::NotFound) => error_response(id, GabpError::ToolNotFound(name)),
        Err(ToolCallError::Handler(err)) => error_response(id, GabpError::Internal(err.0)),
    }
}

async fn handle_events_subscribe(
    session: &Session,
    server: &Arc<GabpServerInner>,
    id: &str,
    params: Option<Value>,
) -> Message {
    let Some(channels) = extract_channels(&params) else {
        return error_response(id, GabpError::InvalidParams("missing channels".into()));
    };
    let Some(connection) = server.connections.read().await.get(&session.connection_id).cloned() else {
        return error_response(id, GabpError::Internal("connection not registered".into()));
    };
    let subscribed = server.events.subscribe(&connection, &channels).await;
    Message::response_ok(id, serde_json::json!({ "subscribed": subscribed }))
}

async fn handle_events_unsubscribe(
    session: &Session,
    server: &Arc<GabpServerInner>,
    id: &str,
    params: Option<Value>,
) -> Message {
    let Some(channels) = extract_channels(&params) else {
        return error_response(id, GabpError::InvalidParams("missing channels".into()));
    };
    let unsubscribed = server.events.unsubscribe(&session.connection_id, &channels).await;
    Message::response_ok(id, serde_json::json!({ "unsubscribed": unsubscribed }))
}

fn extract_channels(params: &Option<Value>) -> Option<Vec<String>> {
    let channels = params.as_ref()?.get("channels")?.as_array()?;
    Some(
        channels
            .iter()
            .filter_map(Value::as_str)
            .map(ToOwned::to_owned)
            .collect(),
    )
}

fn error_response(id: &str, error: GabpError) -> Message {
    Message::response_err(id, error.into_object())
}
