//! SockJS WebSocket framing.
//!
//! Gateways built on SockJS speak a thin framing layer on top of the raw
//! WebSocket. Each server frame starts with a one-letter type:
//!
//! | Frame | Meaning |
//! |-------|---------|
//! | `o` | Session open |
//! | `h` | Heartbeat |
//! | `a["m1","m2"]` | Batch of messages |
//! | `m"m1"` | Single message |
//! | `c[3000,"Go away!"]` | Session closed |
//!
//! Client messages are sent as a JSON array of strings. The endpoint path
//! carries the server id, which is how session/tab affinity reaches the
//! backend without cookies or custom headers.

// ============================================================================
// Imports
// ============================================================================

use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::websocket::to_ws_scheme;

// ============================================================================
// Frame
// ============================================================================

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Session opened.
    Open,
    /// Keep-alive.
    Heartbeat,
    /// One or more application messages.
    Messages(Vec<String>),
    /// Session closed by the server.
    Close {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
}

/// Decodes one server frame.
///
/// # Errors
///
/// Returns [`Error::Protocol`] for an unknown frame type and
/// [`Error::Json`] for a malformed frame body.
pub fn decode(raw: &str) -> Result<Frame> {
    let mut chars = raw.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::protocol("empty SockJS frame"))?;
    let body = chars.as_str();

    match kind {
        'o' => Ok(Frame::Open),
        'h' => Ok(Frame::Heartbeat),
        'a' => Ok(Frame::Messages(serde_json::from_str(body)?)),
        'm' => Ok(Frame::Messages(vec![serde_json::from_str(body)?])),
        'c' => {
            let (code, reason): (u16, String) = serde_json::from_str(body)?;
            Ok(Frame::Close { code, reason })
        }
        other => Err(Error::protocol(format!("unknown SockJS frame type {other:?}"))),
    }
}

/// Encodes one outbound message.
///
/// # Errors
///
/// Returns [`Error::Json`] if encoding fails.
pub fn encode(text: &str) -> Result<String> {
    Ok(serde_json::to_string(&[text])?)
}

/// Builds the raw WebSocket endpoint for a SockJS base URL.
///
/// `http://host/ws` becomes `ws://host/ws/{server_id}/{session}/websocket`.
///
/// # Errors
///
/// Returns [`Error::Config`] if the URL cannot carry a path.
pub fn endpoint(base: &Url, server_id: &str) -> Result<Url> {
    let mut url = to_ws_scheme(base)?;
    let session = session_segment();

    url.path_segments_mut()
        .map_err(|()| Error::config(format!("URL cannot carry a path: {base}")))?
        .pop_if_empty()
        .extend([server_id, session.as_str(), "websocket"]);

    Ok(url)
}

/// Random per-connection session segment.
fn session_segment() -> String {
    let mut session = Uuid::new_v4().simple().to_string();
    session.truncate(8);
    session
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_control_frames() {
        assert_eq!(decode("o").expect("open"), Frame::Open);
        assert_eq!(decode("h").expect("heartbeat"), Frame::Heartbeat);
        assert_eq!(
            decode(r#"c[3000,"Go away!"]"#).expect("close"),
            Frame::Close {
                code: 3000,
                reason: "Go away!".to_string()
            }
        );
    }

    #[test]
    fn test_decode_message_frames() {
        assert_eq!(
            decode(r#"a["{\"_id_\":1}","{\"_id_\":2}"]"#).expect("batch"),
            Frame::Messages(vec![r#"{"_id_":1}"#.to_string(), r#"{"_id_":2}"#.to_string()])
        );
        assert_eq!(
            decode(r#"m"hello""#).expect("single"),
            Frame::Messages(vec!["hello".to_string()])
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("").is_err());
        assert!(decode("x").is_err());
        assert!(decode("a{").is_err());
    }

    #[test]
    fn test_encode_wraps_in_array() {
        assert_eq!(
            encode(r#"{"_id_":1}"#).expect("encode"),
            r#"["{\"_id_\":1}"]"#
        );
    }

    #[test]
    fn test_endpoint_layout() {
        let base = Url::parse("http://localhost:8888/ws").expect("url");
        let url = endpoint(&base, "sessionXXX_42").expect("endpoint");

        assert_eq!(url.scheme(), "ws");
        let segments: Vec<_> = url.path_segments().expect("segments").collect();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], "ws");
        assert_eq!(segments[1], "sessionXXX_42");
        assert_eq!(segments[2].len(), 8);
        assert_eq!(segments[3], "websocket");
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let base = Url::parse("https://example.com/ws/").expect("url");
        let url = endpoint(&base, "42").expect("endpoint");
        assert_eq!(url.scheme(), "wss");
        assert!(url.path().starts_with("/ws/42/"));
    }
}
