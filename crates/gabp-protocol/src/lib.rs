//! gabp-protocol: wire types and framing for the Game Agent Bridge Protocol.
//!
//! This crate has no knowledge of sockets, registries, or sessions — it only
//! turns bytes into [`Message`] values and back. The session state machine,
//! tool registry, and event manager live in the `gabp-server` crate one layer
//! up.

pub mod error;
pub mod frame;
pub mod message;

pub use error::{error_codes, GabpError};
pub use frame::{FrameCodec, FrameError};
pub use message::{
    AppInfo, Capabilities, ErrorObject, HelloParams, Message, Platform, WelcomeResult,
    PROTOCOL_VERSION, SCHEMA_VERSION,
};
