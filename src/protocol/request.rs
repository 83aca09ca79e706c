//! Request envelope sent from client to gateway.
//!
//! Every outbound message is a [`Request`] serialized as one JSON object.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

// ============================================================================
// Request
// ============================================================================

/// A request envelope from client to gateway.
///
/// # Format
///
/// ```json
/// {
///   "_id_": 3141592653,
///   "_path_": "/api/user/1/",
///   "_data_": { "a": "x" }
/// }
/// ```
///
/// Both `_id_` and `_path_` are mandatory. Envelopes that fail
/// [`Request::validate`] are dropped by the outbound queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation id echoed back by the gateway.
    #[serde(rename = "_id_")]
    pub id: RequestId,

    /// Route the gateway dispatches on.
    #[serde(rename = "_path_")]
    pub path: String,

    /// Arbitrary key/value payload.
    #[serde(rename = "_data_")]
    pub data: Value,
}

impl Request {
    /// Creates an envelope.
    ///
    /// A `null` payload is normalized to an empty object, so the gateway
    /// always receives `_data_` as an object.
    #[must_use]
    pub fn new(id: RequestId, path: impl Into<String>, data: Value) -> Self {
        let data = match data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        Self {
            id,
            path: path.into(),
            data,
        }
    }

    /// Checks the envelope carries a usable id and path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEnvelope`] if the id is zero or the path is
    /// empty.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_valid() && !self.path.is_empty() {
            Ok(())
        } else {
            Err(Error::invalid_envelope(self.id, self.path.clone()))
        }
    }

    /// Serializes the envelope to its wire text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload cannot be serialized.
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn id(value: u32) -> RequestId {
        RequestId::new(value).expect("non-zero")
    }

    #[test]
    fn test_request_wire_format() {
        let request = Request::new(id(5), "/api/user/1/", json!({"a": "x"}));
        let value: Value = serde_json::from_str(&request.to_text().expect("serialize"))
            .expect("valid json");

        assert_eq!(value, json!({"_id_": 5, "_path_": "/api/user/1/", "_data_": {"a": "x"}}));
    }

    #[test]
    fn test_null_data_becomes_empty_object() {
        let request = Request::new(id(1), "/ping/", Value::Null);
        assert_eq!(request.data, json!({}));
    }

    #[test]
    fn test_validate_rejects_missing_parts() {
        assert!(Request::new(id(1), "/ok/", json!({})).validate().is_ok());
        assert!(Request::new(id(1), "", json!({})).validate().is_err());
        assert!(
            Request::new(RequestId::from_raw(0), "/ok/", json!({}))
                .validate()
                .is_err()
        );
    }
}
