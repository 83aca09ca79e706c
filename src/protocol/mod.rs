//! Wire message types.
//!
//! This module defines the JSON messages exchanged between the channel
//! (client) and the messaging gateway (server).
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Client → Gateway | Routed request with correlation id |
//! | `Response` | Gateway → Client | Reply part, or unsolicited push |
//! | `ChannelOpen` | Gateway → Client | Identifiers assigned on open |
//!
//! # Reserved Fields
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `_id_` | Correlation id |
//! | `_path_` | Route |
//! | `_data_` | Payload object |
//! | `_async_` | Reply produced asynchronously |
//! | `_final_` | `false` while more parts follow |

// ============================================================================
// Submodules
// ============================================================================

/// Channel-open handshake.
pub mod handshake;

/// Outbound request envelope.
pub mod request;

/// Inbound response message.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use handshake::{CHANNEL_OPEN_PATH, ChannelOpen};
pub use request::Request;
pub use response::Response;
