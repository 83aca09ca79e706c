//! Channel plugins.
//!
//! A plugin adds behavior to every channel without touching the channel
//! itself. Plugins are registered by name before channels are built; each
//! channel then gets its own instance of every registered plugin.
//!
//! # Lifecycle Hooks
//!
//! | Hook | When |
//! |------|------|
//! | `initialize` | Synchronously during channel construction |
//! | `opened` | Transport opened, after the outbound queue was flushed |
//! | `connected` | Handshake received; session/tab/user ids are set |
//! | `closed` | Transport closed; a reconnection is already scheduled |
//! | `disconnected` | After an explicit [`Channel::disconnect`] |
//!
//! Hooks run in registration order on the channel's event loop (except
//! `initialize`, which runs inside the constructor). Every hook has an
//! empty default, so a plugin implements only what it needs.
//!
//! # Example
//!
//! ```ignore
//! use tord_client::{Channel, Plugin, plugin};
//!
//! #[derive(Default)]
//! struct Presence;
//!
//! impl Plugin for Presence {
//!     fn connected(&mut self, channel: &Channel) {
//!         let _ = channel.notify("/presence/online/", serde_json::json!({}));
//!     }
//! }
//!
//! plugin::register_default::<Presence>("presence");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;

use crate::channel::Channel;
use crate::transport::CloseEvent;

// ============================================================================
// Submodules
// ============================================================================

/// Plugin registry.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use registry::{PluginFactory, PluginRegistry, register, register_default, snapshot};

// ============================================================================
// Plugin
// ============================================================================

/// Per-channel extension with optional lifecycle hooks.
///
/// Hooks receive the owning channel, so a plugin can issue requests and
/// read connection identifiers without storing a handle. A hook must not
/// call [`Channel::with_plugin`] for its own plugin: the instance is locked
/// while the hook runs.
pub trait Plugin: Any + Send {
    /// Called once while the channel is being constructed.
    ///
    /// A plugin that needs the channel outside its hooks must keep a
    /// [`WeakChannel`](crate::channel::WeakChannel) from
    /// [`Channel::downgrade`]. Storing a cloned [`Channel`] keeps the
    /// channel, its transport and its event loop alive forever.
    fn initialize(&mut self, channel: &Channel) {
        let _ = channel;
    }

    /// Called when the transport opens.
    fn opened(&mut self, channel: &Channel) {
        let _ = channel;
    }

    /// Called after the channel-open handshake.
    fn connected(&mut self, channel: &Channel) {
        let _ = channel;
    }

    /// Called when the transport closes.
    fn closed(&mut self, channel: &Channel, event: &CloseEvent) {
        let _ = (channel, event);
    }

    /// Called after an explicit disconnect.
    fn disconnected(&mut self, channel: &Channel) {
        let _ = channel;
    }
}
