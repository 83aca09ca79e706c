//! Response message received from the gateway.
//!
//! Responses are either correlated (carrying the `_id_` of an earlier
//! request) or pushed by the server and routed by `_path_`. A correlated
//! response may be one part of a stream; `_final_: false` marks that more
//! parts follow under the same id.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::Result;
use crate::identifiers::RequestId;

// ============================================================================
// Response
// ============================================================================

/// A message from gateway to client.
///
/// # Format
///
/// ```json
/// {
///   "_id_": 3141592653,
///   "_path_": "/api/user/1/streaming/",
///   "_data_": { "i": 1 },
///   "_async_": true,
///   "_final_": false
/// }
/// ```
///
/// Every field is optional. Top-level fields outside the reserved set are
/// kept in [`Response::extra`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Raw `_id_`, absent for server pushes.
    ///
    /// Kept as a JSON number so ids outside the request id range (server
    /// generated, negative, zero) still parse and fall through to `_path_`
    /// routing. Use [`Response::request_id`] for correlation.
    #[serde(rename = "_id_", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Number>,

    /// Route, used for dispatch when no callback matches.
    #[serde(rename = "_path_", default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Payload.
    #[serde(rename = "_data_", default)]
    pub data: Value,

    /// Set when the gateway answered asynchronously.
    #[serde(rename = "_async_", default, skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,

    /// `Some(false)` while more parts follow.
    #[serde(rename = "_final_", default, skip_serializing_if = "Option::is_none")]
    pub is_final: Option<bool>,

    /// Any other top-level fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Response {
    /// Parses a response from wire text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the text is not a
    /// JSON object of the expected shape.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns the id as a [`RequestId`] if it is one this client could
    /// have issued.
    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        let raw = self.id.as_ref()?.as_u64()?;
        u32::try_from(raw).ok().and_then(RequestId::new)
    }

    /// Returns `true` unless the gateway announced further parts.
    ///
    /// Only an explicit `_final_: false` keeps a callback registered.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.is_final != Some(false)
    }

    /// Returns `true` if the response was produced asynchronously.
    #[inline]
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.is_async.unwrap_or(false)
    }

    /// Looks up a field, preferring top-level extras over `_data_`.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key).or_else(|| self.data.get(key))
    }

    /// Gets a string value from the payload.
    ///
    /// Returns empty string if key not found or not a string.
    #[inline]
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Gets a u64 value from the payload.
    ///
    /// Returns 0 if key not found or not a number.
    #[inline]
    #[must_use]
    pub fn get_u64(&self, key: &str) -> u64 {
        self.data
            .get(key)
            .and_then(Value::as_u64)
            .unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_parse_correlated_response() {
        let response = Response::parse(
            r#"{"_id_": 9, "_path_": "/api/user/1/", "_data_": {"user_id": "1"}}"#,
        )
        .expect("parse");

        assert_eq!(response.request_id(), RequestId::new(9));
        assert_eq!(response.path.as_deref(), Some("/api/user/1/"));
        assert_eq!(response.get_string("user_id"), "1");
        assert!(response.is_terminal());
        assert!(!response.is_async());
    }

    #[test]
    fn test_streaming_flags() {
        let partial = Response::parse(
            r#"{"_id_": 9, "_data_": {"i": 1}, "_async_": true, "_final_": false}"#,
        )
        .expect("parse");
        assert!(!partial.is_terminal());
        assert!(partial.is_async());
        assert_eq!(partial.get_u64("i"), 1);

        let last = Response::parse(r#"{"_id_": 9, "_final_": true}"#).expect("parse");
        assert!(last.is_terminal());
    }

    #[test]
    fn test_push_without_id() {
        let response =
            Response::parse(r#"{"_path_": "/chat/", "_data_": {"text": "hi"}}"#).expect("parse");
        assert!(response.id.is_none());
        assert!(response.request_id().is_none());
        assert_eq!(response.data, json!({"text": "hi"}));
    }

    #[test]
    fn test_extra_fields_are_kept() {
        let response = Response::parse(
            r#"{"_path_": "on_channel_open", "sid": "s", "_data_": {"uid": "u"}}"#,
        )
        .expect("parse");

        assert_eq!(response.field("sid"), Some(&json!("s")));
        assert_eq!(response.field("uid"), Some(&json!("u")));
        assert_eq!(response.field("tid"), None);
    }

    #[test]
    fn test_malformed_text_is_an_error() {
        assert!(Response::parse("not json").is_err());
        assert!(Response::parse("[1, 2]").is_err());
        assert!(Response::parse(r#"{"_id_": "abc"}"#).is_err());
    }

    #[test]
    fn test_out_of_range_ids_still_parse() {
        for raw in ["5000000000", "-1", "0", "1.5"] {
            let text = format!(r#"{{"_id_": {raw}, "_path_": "/push/"}}"#);
            let response = Response::parse(&text).expect("parse");

            assert!(response.id.is_some(), "{raw}");
            assert_eq!(response.request_id(), None, "{raw}");
            assert_eq!(response.path.as_deref(), Some("/push/"));
        }

        let max = Response::parse(r#"{"_id_": 4294967295}"#).expect("parse");
        assert_eq!(max.request_id(), RequestId::new(u32::MAX));
    }
}
