//! gabp-server: the session state machine, tool registry, event manager,
//! transport, and server facade for the Game Agent Bridge Protocol.
//!
//! `gabp_protocol` (the `crates/gabp-protocol` workspace member) owns the
//! wire types and framing; this crate turns those into a running, connected
//! server a game or host application can embed.

pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod server;
pub mod session;
pub mod tool;

pub use config::GabpConfig;
pub use connection::ConnectionHandle;
pub use error::{RegistrationError, ServerError, ToolError};
pub use events::EventManager;
pub use server::GabpServer;
pub use tool::{BoxFuture, GabpTool, ToolCallError, ToolDescriptor, ToolHandler, ToolParameter, ToolRegistry};
