//! In-memory connector for channel tests.
//!
//! Records every connection attempt and lets the test drive the attempt's
//! events by hand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::error::{Error, Result};

use super::adapter::{Connector, EventSink, Transport, TransportOptions};

/// One recorded attempt.
#[derive(Clone)]
pub(crate) struct Attempt {
    pub(crate) url: Url,
    pub(crate) options: TransportOptions,
    pub(crate) sink: EventSink,
    pub(crate) at: Instant,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    rejecting: Arc<AtomicBool>,
}

impl Attempt {
    /// Makes further sends fail as if the socket died, without any event.
    pub(crate) fn drop_silently(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Makes further sends fail with a non-connection error.
    pub(crate) fn reject_sends(&self) {
        self.rejecting.store(true, Ordering::SeqCst);
    }

    /// Texts sent through this attempt's transport.
    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Sent texts parsed as JSON.
    pub(crate) fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent()
            .iter()
            .map(|text| serde_json::from_str(text).expect("sent text is json"))
            .collect()
    }

    /// Whether the channel closed this transport.
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Connector that records attempts instead of dialing.
#[derive(Clone, Default)]
pub(crate) struct MockConnector {
    attempts: Arc<Mutex<Vec<Attempt>>>,
}

impl MockConnector {
    pub(crate) fn attempt_count(&self) -> usize {
        self.attempts.lock().len()
    }

    pub(crate) fn attempt(&self, index: usize) -> Attempt {
        self.attempts.lock()[index].clone()
    }

    pub(crate) fn last(&self) -> Attempt {
        self.attempts
            .lock()
            .last()
            .cloned()
            .expect("at least one attempt")
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        url: &Url,
        options: &TransportOptions,
        events: EventSink,
    ) -> Box<dyn Transport> {
        let attempt = Attempt {
            url: url.clone(),
            options: options.clone(),
            sink: events,
            at: Instant::now(),
            sent: Arc::default(),
            closed: Arc::default(),
            rejecting: Arc::default(),
        };
        let transport = MockTransport {
            sent: Arc::clone(&attempt.sent),
            closed: Arc::clone(&attempt.closed),
            rejecting: Arc::clone(&attempt.rejecting),
        };
        self.attempts.lock().push(attempt);
        Box::new(transport)
    }
}

struct MockTransport {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    rejecting: Arc<AtomicBool>,
}

impl Transport for MockTransport {
    fn send(&self, text: String) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(Error::protocol("rejected by mock"));
        }
        self.sent.lock().push(text);
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
