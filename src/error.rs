//! Errors from the server facade and tool registry — distinct from the
//! wire-level [`gabp_protocol::GabpError`], which only ever describes a
//! response `error` object sent to a client.

use thiserror::Error;

/// Failures from [`crate::server::GabpServer::start`] and related facade
/// operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server is already running")]
    AlreadyRunning,

    #[error("failed to bind loopback listener: {0}")]
    Bind(#[source] std::io::Error),
}

/// A tool handler's failure, carried as the message text of `InternalError`.
///
/// Handlers return this instead of an arbitrary error type so the session
/// layer never has to guess how to render a failure to the client.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ToolError(pub String);

impl ToolError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failures registering a tool or channel with an invalid name.
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    #[error("name must not be empty")]
    EmptyName,
}
