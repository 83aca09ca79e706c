//! Channel: one resilient logical connection to the gateway.
//!
//! Module structure:
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Channel`] handle, event loop, public API |
//! | `builder` | [`ChannelBuilder`] |
//! | `options` | [`ChannelOptions`] |
//! | `state` | [`ConnectionState`] |
//! | `backoff` | Reconnection delay policy |
//! | `correlation` | Request ids and pending callbacks |
//! | `queue` | Requests waiting for a connection |
//! | `stream` | [`ResponseStream`] |

// ============================================================================
// Submodules
// ============================================================================

/// Reconnection backoff.
pub mod backoff;

/// Channel builder.
pub mod builder;

/// Channel options.
pub mod options;

/// Connection state.
pub mod state;

mod core;
mod correlation;
mod queue;
mod stream;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Channel, PathHandler, WeakChannel};
pub use backoff::Backoff;
pub use builder::ChannelBuilder;
pub use correlation::ResponseCallback;
pub use options::ChannelOptions;
pub use state::ConnectionState;
pub use stream::ResponseStream;
