//! Channel tuning options.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tord_client::{ChannelOptions, Framing};
//!
//! let options = ChannelOptions::new()
//!     .with_max_retry(6)
//!     .with_base_delay(Duration::from_millis(500))
//!     .with_framing(Framing::Raw);
//!
//! assert_eq!(options.max_retry, 6);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::Framing;

// ============================================================================
// Constants
// ============================================================================

/// Retry counter value after which backoff wraps to the base delay.
pub const DEFAULT_MAX_RETRY: u32 = 4;

/// Delay before the first connection attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Largest accepted `max_retry`.
const MAX_RETRY_LIMIT: u32 = 16;

// ============================================================================
// ChannelOptions
// ============================================================================

/// Reconnection, correlation and transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Backoff wraps to the base delay once the retry counter exceeds this.
    pub max_retry: u32,

    /// Delay before the first attempt; doubled per consecutive failure.
    pub base_delay: Duration,

    /// Limit on registered callbacks. `None` means unbounded.
    pub max_pending: Option<usize>,

    /// Largest request id before wrapping to 1.
    pub id_ceiling: u32,

    /// Wire framing used by the default WebSocket connector.
    pub framing: Framing,

    /// Verbose transport logging.
    pub debug: bool,
}

// ============================================================================
// Constructors
// ============================================================================

impl ChannelOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_retry: DEFAULT_MAX_RETRY,
            base_delay: DEFAULT_BASE_DELAY,
            max_pending: None,
            id_ceiling: u32::MAX,
            framing: Framing::SockJs,
            debug: false,
        }
    }
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ChannelOptions {
    /// Sets the retry counter ceiling.
    #[inline]
    #[must_use]
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// Sets the base reconnection delay.
    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Limits the number of registered callbacks.
    #[inline]
    #[must_use]
    pub fn with_max_pending(mut self, max: usize) -> Self {
        self.max_pending = Some(max);
        self
    }

    /// Sets the largest request id.
    #[inline]
    #[must_use]
    pub fn with_id_ceiling(mut self, ceiling: u32) -> Self {
        self.id_ceiling = ceiling;
        self
    }

    /// Sets the wire framing.
    #[inline]
    #[must_use]
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Enables verbose transport logging.
    #[inline]
    #[must_use]
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ChannelOptions {
    /// Checks the options are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.max_retry > MAX_RETRY_LIMIT {
            return Err(Error::config(format!(
                "max_retry must be at most {MAX_RETRY_LIMIT}, got {}",
                self.max_retry
            )));
        }

        if self.id_ceiling == 0 {
            return Err(Error::config("id_ceiling must be at least 1"));
        }

        if self.max_pending == Some(0) {
            return Err(Error::config("max_pending must be at least 1"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
