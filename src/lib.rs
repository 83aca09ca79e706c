//! Tord client - resilient request/response channel for the Tord gateway.
//!
//! This library provides a client-side messaging channel that talks to a
//! Tord gateway over a WebSocket (optionally SockJS-framed) connection.
//!
//! # Architecture
//!
//! The channel follows a handle + event-loop model:
//!
//! - **Handle ([`Channel`])**: cheap to clone, every call returns at once
//! - **Event loop**: one task per channel handles timers, transport events,
//!   response dispatch and plugin hooks in arrival order
//! - **Transport ([`Connector`])**: one live socket per channel, replaced on
//!   every reconnection
//!
//! Key design principles:
//!
//! - Requests sent while offline are queued and flushed in order on open
//! - Responses are correlated by `_id_`; streamed responses keep their
//!   callback until the final part
//! - Lost connections are retried with exponential backoff that wraps
//! - Plugins hook into the connection lifecycle without touching the channel
//!
//! # Quick Start
//!
//! ```no_run
//! use serde_json::json;
//! use tord_client::{Channel, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Build a channel against the gateway
//!     let channel = Channel::builder()
//!         .url("http://localhost:8888/ws")
//!         .session_id("sessionXXX")
//!         .build()?;
//!
//!     channel.connect();
//!
//!     // Callback style
//!     channel.request("/api/user/1/", json!({"a": "x"}), |_, response| {
//!         println!("user: {}", response.get_string("user_id"));
//!     })?;
//!
//!     // Async style
//!     let response = channel.call("/api/user/2/", json!({})).await?;
//!     println!("user: {}", response.get_string("user_id"));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`channel`] | [`Channel`], builder, options and connection state |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`plugin`] | [`Plugin`] trait and registry |
//! | [`protocol`] | Request/response envelopes and handshake |
//! | [`transport`] | Transport contract, WebSocket and SockJS |

// ============================================================================
// Modules
// ============================================================================

/// Channel handle, connection state machine and request API.
///
/// Use [`Channel::builder()`] to create a configured channel.
pub mod channel;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for requests, sessions, tabs and users.
pub mod identifiers;

/// Lifecycle plugins.
pub mod plugin;

/// Wire envelopes.
///
/// Defines the `_id_`/`_path_`/`_data_` request and response shapes.
pub mod protocol;

/// Transport layer.
///
/// Connector/transport contract plus the default WebSocket connector.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Channel types
pub use channel::{
    Channel, ChannelBuilder, ChannelOptions, ConnectionState, PathHandler, ResponseCallback,
    ResponseStream, WeakChannel,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{RequestId, SessionId, TabId, UserId};

// Plugin types
pub use plugin::{Plugin, PluginRegistry};

// Protocol types
pub use protocol::{ChannelOpen, Request, Response};

// Transport types
pub use transport::{
    CloseEvent, Connector, EventSink, Framing, Transport, TransportEvent, TransportOptions,
    WsConnector,
};
