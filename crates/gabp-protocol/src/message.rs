//! The GABP message envelope: request / response / event, tagged on `type`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Literal protocol version carried on every envelope.
pub const PROTOCOL_VERSION: &str = "gabp/1";

/// Schema version reported in the `session/hello` welcome result.
pub const SCHEMA_VERSION: &str = "1.0";

/// One GABP wire message. Serializes with the exact field names from the
/// protocol: `v`, `id`, `type`, and the variant-specific fields.
///
/// The `type` field drives a serde-internally-tagged union, the same
/// discriminated-enum shape the teacher's `rt_protocol::WsMessage` uses for
/// its `kind` tag, and the example pack's `abp_protocol::Envelope` uses for
/// its `t` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Request {
        v: String,
        id: String,
        method: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<Value>,
    },
    Response {
        v: String,
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorObject>,
    },
    Event {
        v: String,
        id: String,
        channel: String,
        seq: u64,
        payload: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
}

impl Message {
    /// Builds a `request` envelope with a fresh id.
    #[must_use]
    pub fn request(method: impl Into<String>, params: Option<Value>) -> Self {
        Message::Request {
            v: PROTOCOL_VERSION.to_owned(),
            id: Uuid::new_v4().to_string(),
            method: method.into(),
            params,
        }
    }

    /// Builds a successful `response` echoing `request_id`.
    #[must_use]
    pub fn response_ok(request_id: impl Into<String>, result: Value) -> Self {
        Message::Response {
            v: PROTOCOL_VERSION.to_owned(),
            id: request_id.into(),
            result: Some(result),
            error: None,
        }
    }

    /// Builds a failed `response` echoing `request_id`.
    #[must_use]
    pub fn response_err(request_id: impl Into<String>, error: ErrorObject) -> Self {
        Message::Response {
            v: PROTOCOL_VERSION.to_owned(),
            id: request_id.into(),
            result: None,
            error: Some(error),
        }
    }

    /// Builds an `event` envelope with a fresh id.
    #[must_use]
    pub fn event(
        channel: impl Into<String>,
        seq: u64,
        payload: Value,
        timestamp: Option<String>,
    ) -> Self {
        Message::Event {
            v: PROTOCOL_VERSION.to_owned(),
            id: Uuid::new_v4().to_string(),
            channel: channel.into(),
            seq,
            payload,
            timestamp,
        }
    }

    /// The envelope's `id` field, regardless of variant.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Message::Request { id, .. } | Message::Response { id, .. } | Message::Event { id, .. } => id,
        }
    }
}

/// The `{code, message, data}` error object carried in a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// `session/hello` request params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelloParams {
    pub token: String,
    #[serde(rename = "bridgeVersion")]
    pub bridge_version: String,
    pub platform: Platform,
    #[serde(rename = "launchId")]
    pub launch_id: String,
}

/// Platforms a bridge may report in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Macos,
    Linux,
}

/// The capability set and identity returned by a successful `session/hello`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelcomeResult {
    #[serde(rename = "agentId")]
    pub agent_id: String,
    pub app: AppInfo,
    pub capabilities: Capabilities,
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    pub tools: Vec<String>,
    pub events: Vec<String>,
    pub resources: Vec<String>,
}
