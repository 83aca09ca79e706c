//! Transport adapter contract.
//!
//! A [`Connector`] creates one [`Transport`] per connection attempt. The
//! transport owns the actual network I/O and reports what happens to it
//! through the [`EventSink`] it was given: `opened`, `message`, `error`
//! and finally `closed`.
//!
//! Every sink is stamped with the generation of the attempt that created
//! it. The channel ignores events from any generation but the live one,
//! which is how a discarded transport's late close event is suppressed.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use tracing::trace;
use url::Url;

use crate::error::Result;

// ============================================================================
// TransportOptions
// ============================================================================

/// Per-attempt options handed to the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Session/tab affinity string (`sid_tid`, or `tid` alone).
    pub server_id: String,
    /// Verbose transport logging.
    pub debug: bool,
}

// ============================================================================
// CloseEvent
// ============================================================================

/// Why a transport closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// WebSocket-style close code.
    pub code: u16,
    /// Human-readable reason, possibly empty.
    pub reason: String,
}

impl CloseEvent {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;

    /// Connection dropped without a close frame.
    pub const ABNORMAL: u16 = 1006;

    /// Creates a close event.
    #[inline]
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Creates a normal (1000) close event.
    #[inline]
    #[must_use]
    pub fn normal() -> Self {
        Self::new(Self::NORMAL, "")
    }

    /// Creates an abnormal (1006) close event.
    #[inline]
    #[must_use]
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(Self::ABNORMAL, reason)
    }
}

// ============================================================================
// TransportEvent
// ============================================================================

/// Something that happened to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection is ready for `send`.
    Opened,
    /// Connection is gone. Always the last event of a transport.
    Closed(CloseEvent),
    /// One inbound text message.
    Message(String),
    /// Transport-level error. A `Closed` event follows.
    Error(String),
}

/// A transport event stamped with its attempt generation.
#[derive(Debug)]
pub(crate) struct SinkEvent {
    pub(crate) generation: u64,
    pub(crate) event: TransportEvent,
}

// ============================================================================
// EventSink
// ============================================================================

/// Where a transport reports its events.
///
/// Cheap to clone. Emitting after the owning channel is gone is a no-op.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl EventSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<SinkEvent>) -> Self {
        Self { generation, tx }
    }

    /// Creates a detached sink and the receiver of its events.
    #[cfg(test)]
    pub(crate) fn detached(generation: u64) -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(generation, tx), rx)
    }

    /// Returns the attempt generation this sink belongs to.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` once nobody listens to this sink anymore.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Reports that the transport is open.
    pub fn opened(&self) {
        self.emit(TransportEvent::Opened);
    }

    /// Reports an inbound text message.
    pub fn message(&self, text: impl Into<String>) {
        self.emit(TransportEvent::Message(text.into()));
    }

    /// Reports a transport error.
    pub fn error(&self, data: impl Into<String>) {
        self.emit(TransportEvent::Error(data.into()));
    }

    /// Reports that the transport closed.
    pub fn closed(&self, event: CloseEvent) {
        self.emit(TransportEvent::Closed(event));
    }

    fn emit(&self, event: TransportEvent) {
        let generation = self.generation;
        if self.tx.send(SinkEvent { generation, event }).is_err() {
            trace!(generation, "Transport event dropped, channel gone");
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A live transport for one connection attempt.
pub trait Transport: Send {
    /// Sends one text message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`](crate::Error::ConnectionClosed)
    /// if the transport can no longer send.
    fn send(&self, text: String) -> Result<()>;

    /// Closes the transport. Idempotent.
    fn close(&mut self);
}

/// Factory for transports.
///
/// `connect` must not block: it starts the attempt and returns at once,
/// reporting progress through `events`.
pub trait Connector: Send + Sync + 'static {
    /// Starts a connection attempt to `url`.
    fn connect(
        &self,
        url: &Url,
        options: &TransportOptions,
        events: EventSink,
    ) -> Box<dyn Transport>;
}

// ============================================================================
// Tests
// ============================================================================
