//! Channel-backed body producer for streaming responses.

use bytes::Bytes;
use edge_core::{Body, StreamError};
use futures::channel::mpsc;
use futures::SinkExt;

/// Default number of chunks buffered between producer and host.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 8;

/// State of the chunk sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkState {
    /// Chunks can be sent.
    Open,
    /// Stream ended, either completed or aborted.
    Closed,
}

/// Producer half of a streaming body.
///
/// Backpressure comes from the bounded channel: `send` waits while the host
/// has not consumed earlier chunks, so the body is never fully buffered.
#[derive(Debug)]
pub struct ChunkSink {
    tx: mpsc::Sender<Result<Bytes, StreamError>>,
    state: SinkState,
    bytes_sent: usize,
    chunks_sent: usize,
}

/// Create a streaming body and the sink that feeds it.
pub fn body_channel(capacity: usize) -> (ChunkSink, Body) {
    let (tx, rx) = mpsc::channel(capacity);
    let sink = ChunkSink {
        tx,
        state: SinkState::Open,
        bytes_sent: 0,
        chunks_sent: 0,
    };
    (sink, Body::from_stream(rx))
}

impl ChunkSink {
    /// Send one chunk.
    pub async fn send(&mut self, chunk: impl Into<Bytes>) -> Result<(), StreamError> {
        if self.state == SinkState::Closed {
            return Err(StreamError::Closed);
        }

        let chunk = chunk.into();
        let len = chunk.len();
        self.tx.send(Ok(chunk)).await.map_err(|_| {
            self.state = SinkState::Closed;
            StreamError::Closed
        })?;
        self.bytes_sent += len;
        self.chunks_sent += 1;
        Ok(())
    }

    /// Send a UTF-8 chunk.
    pub async fn send_text(&mut self, text: &str) -> Result<(), StreamError> {
        self.send(Bytes::copy_from_slice(text.as_bytes())).await
    }

    /// End the stream with an error so the receiver sees a truncated body.
    pub async fn abort(mut self, error: StreamError) {
        if self.state == SinkState::Open {
            // Receiver may already be gone; nothing left to tell it then.
            let _ = self.tx.send(Err(error)).await;
            self.state = SinkState::Closed;
        }
    }

    /// End the stream normally.
    pub fn complete(mut self) {
        self.tx.close_channel();
        self.state = SinkState::Closed;
    }

    /// Whether the receiver is gone.
    pub fn is_closed(&self) -> bool {
        self.state == SinkState::Closed || self.tx.is_closed()
    }

    /// Total bytes sent.
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    /// Number of chunks sent.
    pub fn chunks_sent(&self) -> usize {
        self.chunks_sent
    }
}
