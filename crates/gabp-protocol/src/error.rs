//! The GABP error taxonomy: JSON-RPC-style codes plus GABP-specific codes.

use crate::message::ErrorObject;

/// Numeric error codes, grouped the way `spec.md` §7 tables them.
pub mod error_codes {
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const SERVER_ERROR: i64 = -32000;

    pub const AUTHENTICATION_FAILED: i64 = -31000;
    pub const SESSION_NOT_ESTABLISHED: i64 = -31001;
    pub const TOOL_NOT_FOUND: i64 = -31002;
    pub const EVENT_CHANNEL_NOT_FOUND: i64 = -31003;
    pub const RESOURCE_NOT_FOUND: i64 = -31004;
    pub const METHOD_NOT_ALLOWED: i64 = -31005;
}

/// Errors surfaced to a client as a `response.error` object.
///
/// Every variant maps to exactly one code in [`error_codes`]; `Display`
/// produces the human-readable `error.message` text, never a raw Rust debug
/// representation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GabpError {
    #[error("envelope does not match any known message shape")]
    InvalidRequest,

    #[error("unknown method {0:?}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Server(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("session has not completed the handshake")]
    SessionNotEstablished,

    #[error("tool {0:?} is not registered")]
    ToolNotFound(String),

    #[error("event channel {0:?} is not registered")]
    EventChannelNotFound(String),

    #[error("resource {0:?} not found")]
    ResourceNotFound(String),

    #[error("method not allowed in the current session state")]
    MethodNotAllowed,
}

impl GabpError {
    #[must_use]
    pub fn code(&self) -> i64 {
        use error_codes::*;
        match self {
            GabpError::InvalidRequest => INVALID_REQUEST,
            GabpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            GabpError::InvalidParams(_) => INVALID_PARAMS,
            GabpError::Internal(_) => INTERNAL_ERROR,
            GabpError::Server(_) => SERVER_ERROR,
            GabpError::AuthenticationFailed => AUTHENTICATION_FAILED,
            GabpError::SessionNotEstablished => SESSION_NOT_ESTABLISHED,
            GabpError::ToolNotFound(_) => TOOL_NOT_FOUND,
            GabpError::EventChannelNotFound(_) => EVENT_CHANNEL_NOT_FOUND,
            GabpError::ResourceNotFound(_) => RESOURCE_NOT_FOUND,
            GabpError::MethodNotAllowed => METHOD_NOT_ALLOWED,
        }
    }

    /// Normalizes this error into the wire `{code, message}` object.
    #[must_use]
    pub fn into_object(self) -> ErrorObject {
        let code = self.code();
        ErrorObject::new(code, self.to_string())
    }
}
