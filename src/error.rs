//! Error types for the channel client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use tord_client::{Channel, Result};
//!
//! async fn example(channel: &Channel) -> Result<()> {
//!     let response = channel.call("/api/user/1/", serde_json::json!({})).await?;
//!     println!("{}", response.data);
//!     Ok(())
//! }
//! ```
//!
//! Most failures never reach the caller: malformed inbound messages,
//! transport errors and connection loss are logged and recovered from
//! inside the channel. The variants below cover what does surface.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::InvalidEnvelope`], [`Error::ReservedPath`] |
//! | Correlation | [`Error::TooManyPending`], [`Error::IdSpaceExhausted`], [`Error::RequestTimeout`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by [`ChannelBuilder::build`](crate::ChannelBuilder::build)
    /// when options fail validation.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Channel URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Transport closed while an operation needed it.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or undecodable frame.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Outbound envelope without a usable id or path.
    #[error("Invalid envelope: id={id}, path={path:?}")]
    InvalidEnvelope {
        /// Id carried by the envelope.
        id: RequestId,
        /// Path carried by the envelope.
        path: String,
    },

    /// Attempt to replace the reserved handshake handler.
    #[error("Path is reserved: {path}")]
    ReservedPath {
        /// The reserved path.
        path: String,
    },

    // ========================================================================
    // Correlation Errors
    // ========================================================================
    /// Pending callback limit reached.
    #[error("Too many pending requests: {pending}/{max}")]
    TooManyPending {
        /// Callbacks currently registered.
        pending: usize,
        /// Configured limit.
        max: usize,
    },

    /// Every id in the configured range is held by a pending request.
    #[error("Request id space exhausted (ceiling {ceiling})")]
    IdSpaceExhausted {
        /// Largest id the channel may issue.
        ceiling: u32,
    },

    /// No response arrived within the caller's deadline.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request id that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// The response callback was dropped before answering.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an invalid envelope error.
    #[inline]
    pub fn invalid_envelope(id: RequestId, path: impl Into<String>) -> Self {
        Self::InvalidEnvelope {
            id,
            path: path.into(),
        }
    }

    /// Creates a reserved path error.
    #[inline]
    pub fn reserved_path(path: impl Into<String>) -> Self {
        Self::ReservedPath { path: path.into() }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
