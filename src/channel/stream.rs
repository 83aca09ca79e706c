//! Multi-part response stream.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;

use crate::identifiers::RequestId;
use crate::protocol::Response;

// ============================================================================
// ResponseStream
// ============================================================================

/// Every response part of one request, in arrival order.
///
/// Returned by [`Channel::stream`](crate::Channel::stream). Ends after the
/// terminal part, or when the request is cancelled or discarded.
#[derive(Debug)]
pub struct ResponseStream {
    id: RequestId,
    rx: mpsc::UnboundedReceiver<Response>,
}

impl ResponseStream {
    pub(crate) fn new(id: RequestId, rx: mpsc::UnboundedReceiver<Response>) -> Self {
        Self { id, rx }
    }

    /// Returns the request id the parts belong to.
    #[inline]
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Waits for the next part. `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<Response> {
        self.rx.recv().await
    }
}

impl Stream for ResponseStream {
    type Item = Response;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Response>> {
        self.rx.poll_recv(cx)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_stream_ends_when_sender_drops() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = ResponseStream::new(RequestId::from_raw(3), rx);

        for n in 0..3 {
            let part = Response::parse(&format!(r#"{{"_id_": 3, "_data_": {{"n": {n}}}}}"#))
                .expect("parse");
            tx.send(part).expect("send");
        }
        drop(tx);

        let parts: Vec<u64> = (&mut stream).map(|part| part.get_u64("n")).collect().await;
        assert_eq!(parts, vec![0, 1, 2]);
        assert!(stream.recv().await.is_none());
        assert_eq!(stream.id().as_u32(), 3);
    }
}
