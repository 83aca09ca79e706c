//! Channel handle and event loop.
//!
//! A [`Channel`] is a cheap, cloneable handle to one logical connection.
//! Public calls mutate the channel's state under a lock and return at once;
//! everything asynchronous (connect timers, transport events, disconnect
//! notices) is funnelled into a single event-loop task and handled in
//! arrival order.
//!
//! # Event Loop
//!
//! The loop task handles:
//!
//! - Connect timers scheduled with exponential backoff
//! - Transport `opened`/`message`/`error`/`closed` events
//! - Dispatch of responses to callbacks or path handlers
//! - Plugin lifecycle hooks
//!
//! Callbacks, path handlers and plugin hooks run on the loop with no
//! channel lock held, so they may call back into the channel.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, SessionId, TabId, UserId};
use crate::plugin::{Plugin, PluginRegistry};
use crate::protocol::{CHANNEL_OPEN_PATH, ChannelOpen, Request, Response};
use crate::transport::adapter::SinkEvent;
use crate::transport::{CloseEvent, Connector, EventSink, Transport, TransportEvent, TransportOptions};

use super::backoff::Backoff;
use super::builder::ChannelBuilder;
use super::correlation::{CorrelationTable, ResponseCallback};
use super::options::ChannelOptions;
use super::queue::OutboundQueue;
use super::state::ConnectionState;
use super::stream::ResponseStream;

// ============================================================================
// Types
// ============================================================================

/// Handler for uncorrelated messages routed by `_path_`.
pub type PathHandler = Arc<dyn Fn(&Channel, &Response) + Send + Sync>;

/// Events fed to the loop by the channel itself.
enum ControlEvent {
    /// A scheduled connect timer fired.
    ConnectDue { attempt: u64 },
    /// `disconnect()` ran; plugins must be told.
    Disconnected,
}

/// The pending connect timer.
struct ScheduledConnect {
    attempt: u64,
    handle: JoinHandle<()>,
}

/// The single live transport.
struct LiveTransport {
    generation: u64,
    transport: Box<dyn Transport>,
}

/// Everything needed to build a channel.
pub(crate) struct ChannelParts {
    pub(crate) url: Url,
    pub(crate) session_id: Option<SessionId>,
    pub(crate) tab_id: TabId,
    pub(crate) options: ChannelOptions,
    pub(crate) plugins: PluginRegistry,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) runtime: Handle,
}

// ============================================================================
// ChannelState
// ============================================================================

/// Mutable state, guarded by one lock.
struct ChannelState {
    connection: ConnectionState,
    session_id: Option<SessionId>,
    tab_id: TabId,
    user_id: Option<UserId>,
    backoff: Backoff,
    correlation: CorrelationTable,
    queue: OutboundQueue,
    transport: Option<LiveTransport>,
    scheduled: Option<ScheduledConnect>,
    attempts: u64,
    generations: u64,
}

impl ChannelState {
    /// Affinity string: `sid_tid` with a session, `tid` without.
    fn server_id(&self) -> String {
        match &self.session_id {
            Some(session_id) => format!("{session_id}_{}", self.tab_id),
            None => self.tab_id.to_string(),
        }
    }

    /// Returns `true` if `generation` is the live transport.
    fn is_live(&self, generation: u64) -> bool {
        self.transport
            .as_ref()
            .is_some_and(|live| live.generation == generation)
    }

    fn cancel_scheduled(&mut self) {
        if let Some(scheduled) = self.scheduled.take() {
            scheduled.handle.abort();
        }
    }

    /// Sends now if connected, queues otherwise.
    fn submit(&mut self, envelope: Request) -> Result<()> {
        envelope.validate()?;

        let envelope = if self.connection.is_connected() {
            match self.transmit(envelope) {
                Ok(()) => return Ok(()),
                Err(envelope) => envelope,
            }
        } else {
            envelope
        };

        self.queue.push(envelope)
    }

    /// Writes one envelope to the transport.
    ///
    /// Hands the envelope back when the connection is unusable. Any other
    /// send error drops it along with its callback.
    fn transmit(&mut self, envelope: Request) -> std::result::Result<(), Request> {
        let text = match envelope.to_text() {
            Ok(text) => text,
            Err(e) => {
                warn!(id = %envelope.id, error = %e, "Dropping unserializable request");
                self.correlation.remove(envelope.id);
                return Ok(());
            }
        };

        let Some(live) = self.transport.as_ref() else {
            return Err(envelope);
        };

        match live.transport.send(text) {
            Ok(()) => {
                trace!(id = %envelope.id, path = %envelope.path, "Request sent");
                Ok(())
            }
            Err(e) if e.is_connection_error() => {
                warn!(id = %envelope.id, error = %e, "Transport refused request, requeuing");
                Err(envelope)
            }
            Err(e) => {
                warn!(id = %envelope.id, error = %e, "Transport rejected request, dropping");
                self.correlation.remove(envelope.id);
                Ok(())
            }
        }
    }

    /// Sends every queued envelope in order. Returns how many went out.
    fn flush_queue(&mut self) -> usize {
        let mut queued = self.queue.take().into_iter();
        let mut sent = 0;

        while let Some(envelope) = queued.next() {
            match self.transmit(envelope) {
                Ok(()) => sent += 1,
                Err(envelope) => {
                    self.queue
                        .requeue_front(std::iter::once(envelope).chain(queued));
                    break;
                }
            }
        }

        sent
    }
}

// ============================================================================
// ChannelInner
// ============================================================================

/// Per-plugin instance slot.
struct PluginSlot {
    name: String,
    instance: Mutex<Box<dyn Plugin>>,
}

struct ChannelInner {
    url: Url,
    options: ChannelOptions,
    connector: Arc<dyn Connector>,
    runtime: Handle,
    state: Mutex<ChannelState>,
    handlers: RwLock<FxHashMap<String, PathHandler>>,
    plugins: Vec<PluginSlot>,
    control_tx: mpsc::UnboundedSender<ControlEvent>,
    transport_tx: mpsc::UnboundedSender<SinkEvent>,
}

impl Drop for ChannelInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.cancel_scheduled();
        if let Some(mut live) = state.transport.take() {
            live.transport.close();
        }
    }
}

// ============================================================================
// Channel
// ============================================================================

/// One resilient logical connection to the messaging gateway.
///
/// Build with [`Channel::builder`]. Must be created inside a tokio runtime;
/// the channel spawns its event loop on that runtime.
///
/// # Thread Safety
///
/// `Channel` is `Send + Sync` and cheap to clone. All operations are
/// non-blocking.
///
/// # Example
///
/// ```no_run
/// use serde_json::json;
/// use tord_client::Channel;
///
/// # async fn example() -> tord_client::Result<()> {
/// let channel = Channel::builder().url("http://localhost:8888/ws").build()?;
/// channel.connect();
///
/// channel.request("/api/user/1/", json!({"a": "x"}), |_, response| {
///     println!("user: {}", response.get_string("user_id"));
/// })?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

/// Non-owning handle to a [`Channel`].
///
/// Does not keep the channel alive. Plugins that hold on to their channel
/// use this.
#[derive(Clone)]
pub struct WeakChannel {
    inner: Weak<ChannelInner>,
}

impl WeakChannel {
    /// Returns the channel if any strong handle still exists.
    #[must_use]
    pub fn upgrade(&self) -> Option<Channel> {
        self.inner.upgrade().map(|inner| Channel { inner })
    }
}

impl fmt::Debug for WeakChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakChannel")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

// ============================================================================
// Channel - Constructor
// ============================================================================

impl Channel {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn builder() -> ChannelBuilder {
        ChannelBuilder::new()
    }

    /// Creates a handle that does not keep the channel alive.
    #[inline]
    #[must_use]
    pub fn downgrade(&self) -> WeakChannel {
        WeakChannel {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Builds the channel, spawns its event loop and initializes plugins.
    pub(crate) fn new(parts: ChannelParts) -> Self {
        let ChannelParts {
            url,
            session_id,
            tab_id,
            options,
            plugins,
            connector,
            runtime,
        } = parts;

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();

        let state = ChannelState {
            connection: ConnectionState::Idle,
            session_id,
            tab_id,
            user_id: None,
            backoff: Backoff::new(options.base_delay, options.max_retry),
            correlation: CorrelationTable::new(options.id_ceiling, options.max_pending),
            queue: OutboundQueue::default(),
            transport: None,
            scheduled: None,
            attempts: 0,
            generations: 0,
        };

        let plugins = plugins
            .instantiate()
            .into_iter()
            .map(|(name, instance)| PluginSlot {
                name,
                instance: Mutex::new(instance),
            })
            .collect();

        let inner = Arc::new(ChannelInner {
            url,
            options,
            connector,
            runtime: runtime.clone(),
            state: Mutex::new(state),
            handlers: RwLock::new(FxHashMap::default()),
            plugins,
            control_tx,
            transport_tx,
        });

        runtime.spawn(run_event_loop(
            Arc::downgrade(&inner),
            control_rx,
            transport_rx,
        ));

        let channel = Self { inner };

        for slot in &channel.inner.plugins {
            slot.instance.lock().initialize(&channel);
            debug!(plugin = %slot.name, "Plugin initialized");
        }

        channel
    }
}

// ============================================================================
// Channel - Connection
// ============================================================================

impl Channel {
    /// Schedules a connection attempt after the current backoff delay.
    ///
    /// Cancels any attempt already scheduled. Does nothing while a
    /// transport is connecting or connected.
    pub fn connect(&self) {
        let mut state = self.inner.state.lock();

        if state.transport.is_some() && state.connection != ConnectionState::Disconnected {
            debug!(state = %state.connection, "Connect ignored, transport active");
            return;
        }

        self.schedule_connect(&mut state);
    }

    /// Closes the connection and discards queued requests.
    ///
    /// Cancels any scheduled attempt, closes the live transport without
    /// triggering a reconnection and resets the backoff. Callbacks of
    /// requests that were queued but never sent are dropped.
    pub fn disconnect(&self) {
        let mut state = self.inner.state.lock();

        state.cancel_scheduled();
        if let Some(mut live) = state.transport.take() {
            live.transport.close();
        }

        state.connection = ConnectionState::Disconnected;
        state.backoff.reset();

        let discarded = state.queue.clear();
        for envelope in &discarded {
            state.correlation.remove(envelope.id);
        }

        info!(discarded = discarded.len(), "Channel disconnected");
        drop(state);

        let _ = self.inner.control_tx.send(ControlEvent::Disconnected);
    }

    /// Disconnects, then schedules a fresh attempt at the base delay.
    pub fn reconnect(&self) {
        self.disconnect();
        self.connect();
    }

    fn schedule_connect(&self, state: &mut ChannelState) {
        state.cancel_scheduled();

        let retry = state.backoff.retry_count();
        let delay = state.backoff.next_delay();
        state.attempts += 1;
        let attempt = state.attempts;

        let deadline = Instant::now() + delay;
        let control_tx = self.inner.control_tx.clone();
        let handle = self.inner.runtime.spawn(async move {
            sleep_until(deadline).await;
            let _ = control_tx.send(ControlEvent::ConnectDue { attempt });
        });

        state.scheduled = Some(ScheduledConnect { attempt, handle });

        debug!(
            attempt,
            retry,
            delay_ms = delay.as_millis() as u64,
            "Connection attempt scheduled"
        );
    }

    /// Starts the transport for a due attempt.
    fn open_transport(&self, attempt: u64) {
        let mut state = self.inner.state.lock();

        if state.scheduled.as_ref().map(|s| s.attempt) != Some(attempt) {
            trace!(attempt, "Stale connect timer ignored");
            return;
        }
        state.scheduled = None;

        if let Some(mut stale) = state.transport.take() {
            stale.transport.close();
        }

        state.generations += 1;
        let generation = state.generations;
        state.connection = ConnectionState::Connecting;

        let options = TransportOptions {
            server_id: state.server_id(),
            debug: self.inner.options.debug,
        };
        let sink = EventSink::new(generation, self.inner.transport_tx.clone());

        info!(
            url = %self.inner.url,
            server_id = %options.server_id,
            generation,
            "Connecting"
        );

        let transport = self.inner.connector.connect(&self.inner.url, &options, sink);
        state.transport = Some(LiveTransport {
            generation,
            transport,
        });
    }
}

// ============================================================================
// Channel - Requests
// ============================================================================

impl Channel {
    /// Sends a request and registers `callback` for its response parts.
    ///
    /// The callback runs once per response carrying the returned id, and
    /// is dropped after the terminal part. While disconnected the request
    /// is queued and sent on the next open.
    ///
    /// An empty `path` makes the envelope invalid: it is logged and
    /// dropped, the callback is not registered, and the id is still
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`Error::TooManyPending`] if the callback limit is reached
    /// - [`Error::IdSpaceExhausted`] if no request id is free
    pub fn request<F>(&self, path: impl Into<String>, data: Value, callback: F) -> Result<RequestId>
    where
        F: FnMut(&Channel, &Response) + Send + 'static,
    {
        self.submit(path.into(), data, Some(Box::new(callback)))
    }

    /// Sends a request without waiting for any response.
    ///
    /// # Errors
    ///
    /// - [`Error::IdSpaceExhausted`] if no request id is free
    pub fn notify(&self, path: impl Into<String>, data: Value) -> Result<RequestId> {
        self.submit(path.into(), data, None)
    }

    /// Sends a request and waits for its first response.
    ///
    /// No deadline applies; see [`Channel::call_with_timeout`].
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] if the request was discarded by
    ///   [`Channel::disconnect`] or cancelled
    /// - any error of [`Channel::request`]
    pub async fn call(&self, path: impl Into<String>, data: Value) -> Result<Response> {
        let (_, response_rx) = self.call_inner(path.into(), data)?;
        Ok(response_rx.await?)
    }

    /// Sends a request and waits for its first response, up to a deadline.
    ///
    /// On timeout the pending callback is cancelled.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestTimeout`] if nothing arrived in time
    /// - any error of [`Channel::call`]
    pub async fn call_with_timeout(
        &self,
        path: impl Into<String>,
        data: Value,
        request_timeout: Duration,
    ) -> Result<Response> {
        let (request_id, response_rx) = self.call_inner(path.into(), data)?;

        match timeout(request_timeout, response_rx).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                self.cancel(request_id);
                Err(Error::request_timeout(
                    request_id,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Sends a request and returns a stream of all its response parts.
    ///
    /// The stream ends after the terminal part.
    ///
    /// # Errors
    ///
    /// Same as [`Channel::request`].
    pub fn stream(&self, path: impl Into<String>, data: Value) -> Result<ResponseStream> {
        let (parts_tx, parts_rx) = mpsc::unbounded_channel();
        let request_id = self.request(path, data, move |_, response| {
            let _ = parts_tx.send(response.clone());
        })?;

        Ok(ResponseStream::new(request_id, parts_rx))
    }

    /// Drops the callback registered for `id`.
    ///
    /// Returns `true` if a callback was pending. A response arriving later
    /// for this id falls through to path handlers.
    pub fn cancel(&self, id: RequestId) -> bool {
        self.inner.state.lock().correlation.remove(id)
    }

    fn call_inner(
        &self,
        path: String,
        data: Value,
    ) -> Result<(RequestId, oneshot::Receiver<Response>)> {
        let (response_tx, response_rx) = oneshot::channel();
        let mut response_tx = Some(response_tx);

        let request_id = self.submit(
            path,
            data,
            Some(Box::new(move |_: &Channel, response: &Response| {
                if let Some(tx) = response_tx.take() {
                    let _ = tx.send(response.clone());
                }
            })),
        )?;

        Ok((request_id, response_rx))
    }

    fn submit(
        &self,
        path: String,
        data: Value,
        callback: Option<ResponseCallback>,
    ) -> Result<RequestId> {
        let mut state = self.inner.state.lock();

        if callback.is_some() {
            state.correlation.check_capacity()?;
        }
        let id = state.correlation.allocate()?;
        let envelope = Request::new(id, path, data);

        if let Some(callback) = callback {
            state.correlation.register(id, callback);
        }

        if let Err(e) = state.submit(envelope) {
            state.correlation.remove(id);
            warn!(error = %e, "Invalid packet dropped");
        }

        Ok(id)
    }
}

// ============================================================================
// Channel - Path Handlers
// ============================================================================

impl Channel {
    /// Routes uncorrelated messages with `_path_ == path` to `handler`.
    ///
    /// Replaces any handler already set for the path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReservedPath`] for the handshake path.
    pub fn set_handler<F>(&self, path: impl Into<String>, handler: F) -> Result<()>
    where
        F: Fn(&Channel, &Response) + Send + Sync + 'static,
    {
        let path = path.into();
        if path == CHANNEL_OPEN_PATH {
            return Err(Error::reserved_path(path));
        }

        self.inner.handlers.write().insert(path, Arc::new(handler));
        Ok(())
    }

    /// Removes the handler for `path`. Returns `true` if one was set.
    pub fn remove_handler(&self, path: &str) -> bool {
        self.inner.handlers.write().remove(path).is_some()
    }
}

// ============================================================================
// Channel - Accessors
// ============================================================================

impl Channel {
    /// Returns the gateway URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state.lock().connection
    }

    /// Returns `true` while requests go straight to the transport.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Returns the session id, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.state.lock().session_id.clone()
    }

    /// Returns the tab id.
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.inner.state.lock().tab_id.clone()
    }

    /// Returns the user id assigned by the gateway, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.inner.state.lock().user_id.clone()
    }

    /// Returns the affinity string sent with each connection attempt.
    #[must_use]
    pub fn server_id(&self) -> String {
        self.inner.state.lock().server_id()
    }

    /// Returns the current backoff retry counter.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.inner.state.lock().backoff.retry_count()
    }

    /// Returns the number of registered callbacks.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().correlation.len()
    }

    /// Returns the number of requests waiting for a connection.
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Returns plugin names in registration order.
    #[must_use]
    pub fn plugin_names(&self) -> Vec<&str> {
        self.inner
            .plugins
            .iter()
            .map(|slot| slot.name.as_str())
            .collect()
    }

    /// Runs `f` with the plugin registered as `name`, if it is a `P`.
    ///
    /// Must not be called from within a hook of the same plugin.
    pub fn with_plugin<P, R>(&self, name: &str, f: impl FnOnce(&mut P) -> R) -> Option<R>
    where
        P: Plugin,
    {
        let slot = self.inner.plugins.iter().find(|slot| slot.name == name)?;
        let mut instance = slot.instance.lock();
        let any: &mut dyn std::any::Any = &mut **instance;
        any.downcast_mut::<P>().map(f)
    }

    /// Writes a message to the channel's log.
    pub fn log(&self, message: impl AsRef<str>) {
        let tab_id = self.tab_id();
        info!(tab_id = %tab_id, "{}", message.as_ref());
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Channel")
            .field("url", &self.inner.url.as_str())
            .field("state", &state.connection)
            .field("server_id", &state.server_id())
            .field("pending", &state.correlation.len())
            .field("queued", &state.queue.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Channel - Event Handling
// ============================================================================

impl Channel {
    fn handle_control(&self, event: ControlEvent) {
        match event {
            ControlEvent::ConnectDue { attempt } => self.open_transport(attempt),
            ControlEvent::Disconnected => {
                self.notify_plugins("disconnected", |plugin, channel| {
                    plugin.disconnected(channel);
                });
            }
        }
    }

    fn handle_transport(&self, event: SinkEvent) {
        let SinkEvent { generation, event } = event;

        match event {
            TransportEvent::Opened => self.on_open(generation),
            TransportEvent::Closed(close) => self.on_close(generation, close),
            TransportEvent::Message(text) => self.on_message(generation, &text),
            TransportEvent::Error(data) => self.on_error(generation, &data),
        }
    }

    fn on_open(&self, generation: u64) {
        let mut state = self.inner.state.lock();
        if !state.is_live(generation) {
            trace!(generation, "Open from discarded transport ignored");
            return;
        }

        state.connection = ConnectionState::Connected;
        state.backoff.reset();
        let flushed = state.flush_queue();
        drop(state);

        info!(flushed, "Channel connected");
        self.notify_plugins("opened", |plugin, channel| plugin.opened(channel));
    }

    fn on_close(&self, generation: u64, close: CloseEvent) {
        let mut state = self.inner.state.lock();
        if !state.is_live(generation) {
            trace!(generation, "Close from discarded transport ignored");
            return;
        }

        state.transport = None;
        state.connection = ConnectionState::Disconnected;
        info!(code = close.code, reason = %close.reason, "Connection closed");

        self.schedule_connect(&mut state);
        drop(state);

        self.notify_plugins("closed", |plugin, channel| plugin.closed(channel, &close));
    }

    fn on_error(&self, generation: u64, data: &str) {
        let mut state = self.inner.state.lock();
        if !state.is_live(generation) {
            return;
        }

        state.connection = ConnectionState::Disconnected;
        warn!(error = %data, "Connection error");
    }

    fn on_message(&self, generation: u64, text: &str) {
        if !self.inner.state.lock().is_live(generation) {
            trace!(generation, "Message from discarded transport ignored");
            return;
        }

        match Response::parse(text) {
            Ok(response) => self.dispatch(&response),
            Err(e) => warn!(error = %e, "Malformed message discarded"),
        }
    }

    /// Routes a response to its callback, the handshake, or a path handler.
    fn dispatch(&self, response: &Response) {
        if let Some(id) = response.request_id() {
            let callback = self.inner.state.lock().correlation.checkout(id);

            if let Some(mut callback) = callback {
                callback(self, response);
                self.inner
                    .state
                    .lock()
                    .correlation
                    .checkin(id, callback, response.is_terminal());
                return;
            }
        }

        if ChannelOpen::matches(response) {
            self.apply_handshake(response);
            return;
        }

        let handler = response
            .path
            .as_deref()
            .and_then(|path| self.inner.handlers.read().get(path).cloned());

        match handler {
            Some(handler) => handler(self, response),
            None => debug!(id = ?response.id, path = ?response.path, "Unhandled message"),
        }
    }

    fn apply_handshake(&self, response: &Response) {
        let open = ChannelOpen::from_response(response);

        {
            let mut state = self.inner.state.lock();
            if let Some(session_id) = open.session_id {
                state.session_id = Some(session_id);
            }
            if let Some(tab_id) = open.tab_id {
                state.tab_id = tab_id;
            }
            state.user_id = open.user_id;

            info!(
                session_id = ?state.session_id,
                tab_id = %state.tab_id,
                user_id = ?state.user_id,
                "Channel open handshake"
            );
        }

        self.notify_plugins("connected", |plugin, channel| plugin.connected(channel));
    }

    fn notify_plugins(&self, hook: &'static str, mut call: impl FnMut(&mut dyn Plugin, &Channel)) {
        for slot in &self.inner.plugins {
            trace!(plugin = %slot.name, hook, "Plugin hook");
            let mut instance = slot.instance.lock();
            call(&mut **instance, self);
        }
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Serializes every asynchronous event of one channel.
///
/// Holds only a weak reference. Ends once the control queue closes, which
/// happens when the last [`Channel`] is dropped.
async fn run_event_loop(
    inner: Weak<ChannelInner>,
    mut control_rx: mpsc::UnboundedReceiver<ControlEvent>,
    mut transport_rx: mpsc::UnboundedReceiver<SinkEvent>,
) {
    loop {
        tokio::select! {
            event = control_rx.recv() => {
                let Some(event) = event else { break };
                let Some(inner) = inner.upgrade() else { break };
                Channel { inner }.handle_control(event);
            }

            Some(event) = transport_rx.recv() => {
                let Some(inner) = inner.upgrade() else { break };
                Channel { inner }.handle_transport(event);
            }
        }
    }

    debug!("Channel event loop terminated");
}

// ============================================================================
// Tests
// ============================================================================
