//! Builder pattern for channel configuration.
//!
//! Provides a fluent API for configuring and creating [`Channel`] instances.
//!
//! # Example
//!
//! ```no_run
//! use tord_client::{Channel, ChannelOptions};
//!
//! # async fn example() -> tord_client::Result<()> {
//! let channel = Channel::builder()
//!     .url("https://gateway.example.com/ws")
//!     .session_id("sessionXXX")
//!     .options(ChannelOptions::new().with_max_retry(6))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{SessionId, TabId};
use crate::plugin::{self, PluginRegistry};
use crate::transport::{Connector, WsConnector};

use super::core::{Channel, ChannelParts};
use super::options::ChannelOptions;

// ============================================================================
// Constants
// ============================================================================

/// Gateway URL used when none is set.
pub const DEFAULT_URL: &str = "http://localhost:8888/ws";

// ============================================================================
// ChannelBuilder
// ============================================================================

/// Builder for configuring a [`Channel`] instance.
///
/// Use [`Channel::builder()`] to create a new builder.
#[derive(Default)]
pub struct ChannelBuilder {
    /// Gateway URL.
    url: Option<String>,
    /// Session id sent with the first attempt.
    session_id: Option<SessionId>,
    /// Tab id override.
    tab_id: Option<TabId>,
    /// Tuning options.
    options: ChannelOptions,
    /// Plugin registry override.
    plugins: Option<PluginRegistry>,
    /// Connector override.
    connector: Option<Arc<dyn Connector>>,
}

// ============================================================================
// ChannelBuilder Implementation
// ============================================================================

impl ChannelBuilder {
    /// Creates a new builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gateway URL (`http`, `https`, `ws` or `wss`).
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the session id used for server affinity.
    #[inline]
    #[must_use]
    pub fn session_id(mut self, session_id: impl Into<SessionId>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Overrides the generated tab id.
    #[inline]
    #[must_use]
    pub fn tab_id(mut self, tab_id: impl Into<TabId>) -> Self {
        self.tab_id = Some(tab_id.into());
        self
    }

    /// Sets the tuning options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ChannelOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses `registry` instead of the process-wide plugin registry.
    #[inline]
    #[must_use]
    pub fn plugins(mut self, registry: PluginRegistry) -> Self {
        self.plugins = Some(registry);
        self
    }

    /// Uses a custom transport connector.
    ///
    /// Defaults to a [`WsConnector`] with the configured framing.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Builds the channel with validation.
    ///
    /// Plugins are instantiated and initialized before this returns.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if the URL does not parse
    /// - [`Error::Config`] if the URL scheme is unsupported, an option is
    ///   out of range, or no tokio runtime is running
    pub fn build(self) -> Result<Channel> {
        let url = self.validate_url()?;
        self.options.validate()?;

        let runtime = Handle::try_current().map_err(|_| {
            Error::config(
                "Channel must be built inside a tokio runtime.\n\
                 Example: call Channel::builder().build() from an async fn",
            )
        })?;

        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector::new(self.options.framing)));

        Ok(Channel::new(ChannelParts {
            url,
            session_id: self.session_id,
            tab_id: self.tab_id.unwrap_or_else(TabId::generate),
            options: self.options,
            plugins: self.plugins.unwrap_or_else(plugin::snapshot),
            connector,
            runtime,
        }))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ChannelBuilder {
    /// Validates the URL configuration.
    fn validate_url(&self) -> Result<Url> {
        let url = Url::parse(self.url.as_deref().unwrap_or(DEFAULT_URL))?;

        match url.scheme() {
            "http" | "https" | "ws" | "wss" => Ok(url),
            other => Err(Error::config(format!(
                "Unsupported URL scheme: {other}\n\
                 Use http, https, ws or wss."
            ))),
        }
    }
}

impl fmt::Debug for ChannelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelBuilder")
            .field("url", &self.url)
            .field("session_id", &self.session_id)
            .field("tab_id", &self.tab_id)
            .field("options", &self.options)
            .field("plugins", &self.plugins)
            .field("custom_connector", &self.connector.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::mock::MockConnector;

    #[test]
    fn test_new_creates_default_builder() {
        let builder = ChannelBuilder::new();
        assert!(builder.url.is_none());
        assert!(builder.session_id.is_none());
        assert!(builder.tab_id.is_none());
        assert_eq!(builder.options, ChannelOptions::default());
    }

    #[test]
    fn test_default_url() {
        let url = ChannelBuilder::new().validate_url().expect("default url");
        assert_eq!(url.as_str(), DEFAULT_URL);
    }

    #[test]
    fn test_rejects_unsupported_scheme() {
        let result = ChannelBuilder::new().url("ftp://example.com/ws").validate_url();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_rejects_unparseable_url() {
        let result = ChannelBuilder::new().url("not a url").validate_url();
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_build_outside_runtime_fails() {
        let result = ChannelBuilder::new()
            .connector(MockConnector::default())
            .build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_options() {
        let result = ChannelBuilder::new()
            .options(ChannelOptions::new().with_id_ceiling(0))
            .connector(MockConnector::default())
            .build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_build_without_session_uses_tab_id_alone() {
        let channel = ChannelBuilder::new()
            .tab_id("tab42")
            .plugins(PluginRegistry::new())
            .connector(MockConnector::default())
            .build()
            .expect("build");

        assert_eq!(channel.session_id(), None);
        assert_eq!(channel.server_id(), "tab42");
        assert!(channel.plugin_names().is_empty());
    }

    #[tokio::test]
    async fn test_generated_tab_id_is_numeric() {
        let channel = ChannelBuilder::new()
            .connector(MockConnector::default())
            .build()
            .expect("build");

        assert!(channel.tab_id().as_str().parse::<u32>().is_ok());
    }
}
