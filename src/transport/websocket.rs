//! WebSocket transport built on `tokio-tungstenite`.
//!
//! Each connection attempt spawns one task that owns the socket. The task
//! handles:
//!
//! - Connecting to the endpoint derived from the channel URL
//! - Decoding inbound frames (raw or SockJS) into messages
//! - Writing outbound messages queued by [`WsTransport::send`]
//! - Reporting `opened`/`message`/`error`/`closed` through the sink

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::adapter::{CloseEvent, Connector, EventSink, Transport, TransportOptions};
use super::sockjs::{self, Frame};

// ============================================================================
// Framing
// ============================================================================

/// How application messages are laid out on the WebSocket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framing {
    /// SockJS framing over its raw WebSocket endpoint.
    #[default]
    SockJs,
    /// One text frame per message, no envelope.
    Raw,
}

impl Framing {
    /// Builds the endpoint to dial for a channel URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL cannot be turned into a
    /// WebSocket endpoint.
    pub fn endpoint(self, base: &Url, server_id: &str) -> Result<Url> {
        match self {
            Self::SockJs => sockjs::endpoint(base, server_id),
            Self::Raw => {
                let mut url = to_ws_scheme(base)?;
                url.query_pairs_mut().append_pair("server", server_id);
                Ok(url)
            }
        }
    }

    fn encode(self, text: &str) -> Result<String> {
        match self {
            Self::SockJs => sockjs::encode(text),
            Self::Raw => Ok(text.to_string()),
        }
    }
}

/// Maps `http`/`https` to `ws`/`wss`, leaving WebSocket schemes alone.
pub(crate) fn to_ws_scheme(base: &Url) -> Result<Url> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(Error::config(format!("Unsupported URL scheme: {other}"))),
    };

    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|()| Error::config(format!("Cannot use scheme {scheme} for {base}")))?;
    Ok(url)
}

// ============================================================================
// WsConnector
// ============================================================================

/// [`Connector`] producing WebSocket transports.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector {
    framing: Framing,
}

impl WsConnector {
    /// Creates a connector using the given framing.
    #[inline]
    #[must_use]
    pub const fn new(framing: Framing) -> Self {
        Self { framing }
    }

    /// Returns the framing in use.
    #[inline]
    #[must_use]
    pub const fn framing(&self) -> Framing {
        self.framing
    }
}

impl Connector for WsConnector {
    fn connect(
        &self,
        url: &Url,
        options: &TransportOptions,
        events: EventSink,
    ) -> Box<dyn Transport> {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

        match self.framing.endpoint(url, &options.server_id) {
            Ok(endpoint) => {
                debug!(%endpoint, server_id = %options.server_id, "Dialing WebSocket");
                tokio::spawn(run_transport(
                    endpoint,
                    self.framing,
                    options.debug,
                    events,
                    outgoing_rx,
                ));
            }
            Err(e) => events.closed(report_failure(&events, &e)),
        }

        Box::new(WsTransport { outgoing_tx })
    }
}

// ============================================================================
// WsTransport
// ============================================================================

/// Commands for the socket task.
enum Outgoing {
    /// Send one message.
    Text(String),
    /// Close the socket.
    Close,
}

/// Handle to a socket task.
pub struct WsTransport {
    outgoing_tx: mpsc::UnboundedSender<Outgoing>,
}

impl Transport for WsTransport {
    fn send(&self, text: String) -> Result<()> {
        self.outgoing_tx
            .send(Outgoing::Text(text))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&mut self) {
        let _ = self.outgoing_tx.send(Outgoing::Close);
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Socket Task
// ============================================================================

/// Owns one WebSocket until it closes.
async fn run_transport(
    endpoint: Url,
    framing: Framing,
    verbose: bool,
    events: EventSink,
    mut outgoing_rx: mpsc::UnboundedReceiver<Outgoing>,
) {
    let stream = match connect_async(endpoint.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            warn!(%endpoint, error = %e, "WebSocket connect failed");
            let failure = Error::connection(format!("{endpoint}: {e}"));
            events.closed(report_failure(&events, &failure));
            return;
        }
    };

    if framing == Framing::Raw {
        events.opened();
    }

    let (mut ws_write, mut ws_read) = stream.split();

    let close = loop {
        tokio::select! {
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if verbose {
                            trace!(text = %text, "Frame received");
                        }
                        if let Some(close) = handle_frame(framing, &text, &events) {
                            break close;
                        }
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!("WebSocket closed by remote");
                        break frame.map_or_else(CloseEvent::normal, |frame| {
                            CloseEvent::new(u16::from(frame.code), frame.reason.as_str())
                        });
                    }

                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break report_failure(&events, &Error::from(e));
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break CloseEvent::abnormal("stream ended");
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            command = outgoing_rx.recv() => {
                match command {
                    Some(Outgoing::Text(text)) => {
                        let payload = match framing.encode(&text) {
                            Ok(payload) => payload,
                            Err(e) => {
                                warn!(error = %e, "Failed to frame outgoing message");
                                continue;
                            }
                        };

                        if let Err(e) = ws_write.send(Message::Text(payload.into())).await {
                            warn!(error = %e, "Failed to send message");
                            break report_failure(&events, &Error::from(e));
                        }
                    }

                    Some(Outgoing::Close) | None => {
                        debug!("Closing WebSocket");
                        let _ = ws_write.close().await;
                        break CloseEvent::normal();
                    }
                }
            }
        }
    };

    events.closed(close);
    debug!("Socket task terminated");
}

/// Reports `error` through the sink and returns the matching abnormal close.
fn report_failure(events: &EventSink, error: &Error) -> CloseEvent {
    let text = error.to_string();
    events.error(text.as_str());
    CloseEvent::abnormal(text)
}

/// Routes one inbound text frame. Returns a close event when the frame
/// ends the session.
fn handle_frame(framing: Framing, text: &str, events: &EventSink) -> Option<CloseEvent> {
    if framing == Framing::Raw {
        events.message(text);
        return None;
    }

    match sockjs::decode(text) {
        Ok(Frame::Open) => events.opened(),
        Ok(Frame::Heartbeat) => trace!("SockJS heartbeat"),
        Ok(Frame::Messages(messages)) => {
            for message in messages {
                events.message(message);
            }
        }
        Ok(Frame::Close { code, reason }) => {
            debug!(code, reason = %reason, "SockJS session closed");
            return Some(CloseEvent::new(code, reason));
        }
        Err(e) => warn!(error = %e, "Undecodable SockJS frame"),
    }

    None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;
    use tokio::time::{Duration, timeout};

    use crate::transport::adapter::TransportEvent;

    #[test]
    fn test_ws_scheme_mapping() {
        let http = Url::parse("http://localhost:8888/ws").expect("url");
        assert_eq!(to_ws_scheme(&http).expect("ws").scheme(), "ws");

        let wss = Url::parse("wss://example.com/ws").expect("url");
        assert_eq!(to_ws_scheme(&wss).expect("wss").scheme(), "wss");

        let ftp = Url::parse("ftp://example.com/").expect("url");
        assert!(to_ws_scheme(&ftp).is_err());
    }

    #[test]
    fn test_raw_endpoint_carries_server_id() {
        let base = Url::parse("http://localhost:8888/ws").expect("url");
        let url = Framing::Raw.endpoint(&base, "s_1").expect("endpoint");
        assert_eq!(url.as_str(), "ws://localhost:8888/ws?server=s_1");
    }

    #[test]
    fn test_handle_frame_sockjs_batch() {
        let (sink, mut rx) = EventSink::detached(1);
        assert!(handle_frame(Framing::SockJs, r#"a["one","two"]"#, &sink).is_none());

        assert_eq!(rx.try_recv().expect("one").event, TransportEvent::Message("one".into()));
        assert_eq!(rx.try_recv().expect("two").event, TransportEvent::Message("two".into()));
    }

    #[test]
    fn test_report_failure_emits_error_and_abnormal_close() {
        let (sink, mut rx) = EventSink::detached(2);
        let failure = Error::from(tokio_tungstenite::tungstenite::Error::ConnectionClosed);

        let close = report_failure(&sink, &failure);

        assert_eq!(close.code, CloseEvent::ABNORMAL);
        assert!(close.reason.starts_with("WebSocket error"));
        assert_eq!(
            rx.try_recv().expect("error event").event,
            TransportEvent::Error(close.reason.clone())
        );
    }

    #[test]
    fn test_handle_frame_sockjs_close() {
        let (sink, _rx) = EventSink::detached(1);
        let close = handle_frame(Framing::SockJs, r#"c[3000,"Go away!"]"#, &sink);
        assert_eq!(close, Some(CloseEvent::new(3000, "Go away!")));
    }

    #[tokio::test]
    async fn test_connect_failure_reports_error_then_close() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let url = Url::parse(&format!("http://127.0.0.1:{port}/ws")).expect("url");
        let options = TransportOptions {
            server_id: "1".to_string(),
            debug: false,
        };
        let (sink, mut rx) = EventSink::detached(3);
        let _transport = WsConnector::new(Framing::Raw).connect(&url, &options, sink);

        let first = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event in time")
            .expect("event");
        assert!(matches!(
            &first.event,
            TransportEvent::Error(text) if text.starts_with("Connection failed")
        ));

        let second = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event in time")
            .expect("event");
        assert!(matches!(
            second.event,
            TransportEvent::Closed(CloseEvent { code: 1006, .. })
        ));
    }

    #[tokio::test]
    async fn test_raw_roundtrip_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(tcp).await.expect("handshake");
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(format!("echo:{text}").into()))
                    .await
                    .expect("send");
            }
        });

        let url = Url::parse(&format!("ws://127.0.0.1:{port}/")).expect("url");
        let options = TransportOptions {
            server_id: "1".to_string(),
            debug: true,
        };
        let (sink, mut rx) = EventSink::detached(1);
        let transport = WsConnector::new(Framing::Raw).connect(&url, &options, sink);

        let opened = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event in time")
            .expect("event");
        assert_eq!(opened.event, TransportEvent::Opened);

        transport.send("ping".to_string()).expect("send");

        let echoed = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event in time")
            .expect("event");
        assert_eq!(echoed.event, TransportEvent::Message("echo:ping".to_string()));
    }
}
