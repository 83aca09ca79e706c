//! Channel-open handshake.
//!
//! Right after the transport opens, the gateway sends one message on the
//! reserved [`CHANNEL_OPEN_PATH`] with the identifiers it assigned to this
//! channel. The channel records them before any plugin's `connected` hook
//! runs.

// ============================================================================
// Imports
// ============================================================================

use crate::identifiers::{SessionId, TabId, UserId};

use super::Response;

// ============================================================================
// Constants
// ============================================================================

/// Path of the handshake message. Reserved: user handlers cannot claim it.
pub const CHANNEL_OPEN_PATH: &str = "on_channel_open";

// ============================================================================
// ChannelOpen
// ============================================================================

/// Identifiers carried by the handshake.
///
/// Fields are looked up at the top level first, then inside `_data_`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelOpen {
    /// Session id (`sid`).
    pub session_id: Option<SessionId>,
    /// Tab id (`tid`).
    pub tab_id: Option<TabId>,
    /// User id (`uid`).
    pub user_id: Option<UserId>,
}

impl ChannelOpen {
    /// Returns `true` if the response is a handshake message.
    #[inline]
    #[must_use]
    pub fn matches(response: &Response) -> bool {
        response.path.as_deref() == Some(CHANNEL_OPEN_PATH)
    }

    /// Extracts the identifiers from a handshake response.
    #[must_use]
    pub fn from_response(response: &Response) -> Self {
        Self {
            session_id: response.field("sid").and_then(SessionId::from_value),
            tab_id: response.field("tid").and_then(TabId::from_value),
            user_id: response.field("uid").and_then(UserId::from_value),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_fields() {
        let response = Response::parse(
            r#"{"_path_": "on_channel_open", "sid": "sessionXXX", "tid": 77, "uid": "userXXX"}"#,
        )
        .expect("parse");

        assert!(ChannelOpen::matches(&response));
        let open = ChannelOpen::from_response(&response);
        assert_eq!(open.session_id, Some(SessionId::new("sessionXXX")));
        assert_eq!(open.tab_id, Some(TabId::new("77")));
        assert_eq!(open.user_id, Some(UserId::new("userXXX")));
    }

    #[test]
    fn test_fields_inside_data() {
        let response = Response::parse(
            r#"{"_path_": "on_channel_open", "_data_": {"sid": "s1", "tid": "t1", "uid": null}}"#,
        )
        .expect("parse");

        let open = ChannelOpen::from_response(&response);
        assert_eq!(open.session_id, Some(SessionId::new("s1")));
        assert_eq!(open.tab_id, Some(TabId::new("t1")));
        assert_eq!(open.user_id, None);
    }

    #[test]
    fn test_other_paths_do_not_match() {
        let response = Response::parse(r#"{"_path_": "/chat/"}"#).expect("parse");
        assert!(!ChannelOpen::matches(&response));
    }
}
