//! Transport layer.
//!
//! This module defines the contract between the channel and the socket
//! that carries its messages, plus the WebSocket implementation used by
//! default.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   connect(url, options, sink)   ┌─────────────────┐
//! │     Channel     │────────────────────────────────►│    Connector    │
//! │  (event loop)   │                                 └────────┬────────┘
//! │                 │◄──── opened/message/error/closed ────────┤
//! │                 │                                 ┌────────▼────────┐
//! │                 │──────────── send(text) ────────►│    Transport    │◄──► gateway
//! └─────────────────┘                                 └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `adapter` | `Connector`/`Transport` traits and transport events |
//! | `sockjs` | SockJS frame codec and endpoint layout |
//! | `websocket` | `tokio-tungstenite` connector |

// ============================================================================
// Submodules
// ============================================================================

/// Transport contract.
pub mod adapter;

/// SockJS framing.
pub mod sockjs;

/// WebSocket connector.
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use adapter::{CloseEvent, Connector, EventSink, Transport, TransportEvent, TransportOptions};
pub use websocket::{Framing, WsConnector, WsTransport};
