//! Type-safe identifiers for channel entities.
//!
//! Newtype wrappers prevent mixing a request id with a tab id, or a
//! session id with a user id, at compile time.
//!
//! | Type | Origin | Wire form |
//! |------|--------|-----------|
//! | [`RequestId`] | Client, per request | integer `_id_` |
//! | [`SessionId`] | Client override or server handshake | `sid` |
//! | [`TabId`] | Client-generated or server handshake | `tid` |
//! | [`UserId`] | Server handshake | `uid` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// RequestId
// ============================================================================

/// Correlation id carried in the `_id_` field of every request.
///
/// Zero is never issued; an envelope carrying it is considered malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u32);

impl RequestId {
    /// Creates a request id, returning `None` for zero.
    #[inline]
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    /// Wraps a raw value without validation.
    ///
    /// Used where an invalid id must be representable, e.g. to build an
    /// envelope that the outbound queue is expected to reject.
    #[inline]
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw integer value.
    #[inline]
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns `true` if this id may appear on the wire.
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// String Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from any string-like value.
            #[inline]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Builds an identifier from a handshake field.
            ///
            /// Servers send these as strings or integers; anything else
            /// (including `null` and empty strings) yields `None`.
            #[must_use]
            pub fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
                    Value::Number(n) => Some(Self(n.to_string())),
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id! {
    /// Session the channel is bound to, usually the backend's web session.
    SessionId
}

string_id! {
    /// Browser-tab-like identity of one channel within a session.
    TabId
}

string_id! {
    /// User the backend authenticated the session as.
    UserId
}

impl TabId {
    /// Generates a random tab id in `[0, u32::MAX)`.
    #[must_use]
    pub fn generate() -> Self {
        Self(rand::random_range(0..u32::MAX).to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
