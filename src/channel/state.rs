//! Connection state of a channel.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// Where a channel is in its connection lifecycle.
///
/// ```text
/// Idle ──connect──► Connecting ──open──► Connected
///                       ▲                    │
///                       │                 close/error
///                       └──backoff── Disconnected
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Constructed, never connected.
    #[default]
    Idle,
    /// A transport is being established.
    Connecting,
    /// Transport open; requests are sent immediately.
    Connected,
    /// Transport lost or closed; requests are queued.
    Disconnected,
}

impl ConnectionState {
    /// Returns `true` if requests go straight to the transport.
    #[inline]
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns the state name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
