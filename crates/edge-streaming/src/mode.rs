//! Body forwarding strategy: stream through or buffer for the host.

use std::fmt;

use edge_core::{Body, CancellationToken, StreamError};
use serde::{Deserialize, Serialize};

use crate::guard::{catch_panics, until_cancelled};

/// Whether a host runtime accepts streaming response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamingSupport {
    /// Host forwards chunks as they are produced.
    Streaming,
    /// Host needs the complete body before responding.
    BufferedOnly,
}

impl StreamingSupport {
    /// Check if the host can stream.
    pub fn can_stream(&self) -> bool {
        matches!(self, Self::Streaming)
    }
}

impl fmt::Display for StreamingSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Streaming => write!(f, "streaming"),
            Self::BufferedOnly => write!(f, "buffered-only"),
        }
    }
}

/// What the shim does with an outgoing body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyStrategy {
    /// Forward streams chunk by chunk.
    #[default]
    Passthrough,
    /// Collect streams into a single buffer.
    Buffer,
}

impl BodyStrategy {
    /// Pick the strategy for a host, honoring a configuration switch.
    pub fn negotiate(host: StreamingSupport, streaming_enabled: bool) -> Self {
        if host.can_stream() && streaming_enabled {
            Self::Passthrough
        } else {
            Self::Buffer
        }
    }

    /// Check if streams are forwarded unbuffered.
    pub fn is_passthrough(&self) -> bool {
        matches!(self, Self::Passthrough)
    }
}

/// Prepare a body for handing to the host.
///
/// Passthrough keeps streams as streams, guarded against producer panics and
/// cut short on cancellation. Buffer collects them, failing on the first
/// stream error.
pub async fn prepare_body(
    body: Body,
    strategy: BodyStrategy,
    cancellation: &CancellationToken,
) -> Result<Body, StreamError> {
    match body {
        Body::Stream(stream) => {
            let guarded = catch_panics(until_cancelled(stream, cancellation.clone()));
            match strategy {
                BodyStrategy::Passthrough => Ok(Body::Stream(guarded)),
                BodyStrategy::Buffer => Body::Stream(guarded).collect().await.map(Body::from),
            }
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;

    #[test]
    fn test_negotiate() {
        assert_eq!(
            BodyStrategy::negotiate(StreamingSupport::Streaming, true),
            BodyStrategy::Passthrough
        );
        assert_eq!(
            BodyStrategy::negotiate(StreamingSupport::Streaming, false),
            BodyStrategy::Buffer
        );
        assert_eq!(
            BodyStrategy::negotiate(StreamingSupport::BufferedOnly, true),
            BodyStrategy::Buffer
        );
    }

    #[tokio::test]
    async fn test_buffer_collects_stream() {
        let body = Body::from_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"a")),
            Ok(Bytes::from_static(b"b")),
        ]));
        let prepared = prepare_body(body, BodyStrategy::Buffer, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!prepared.is_stream());
        assert_eq!(prepared.collect().await.unwrap(), "ab");
    }

    #[tokio::test]
    async fn test_passthrough_keeps_stream() {
        let body = Body::from_stream(stream::iter(vec![Ok(Bytes::from_static(b"x"))]));
        let prepared = prepare_body(body, BodyStrategy::Passthrough, &CancellationToken::new())
            .await
            .unwrap();
        assert!(prepared.is_stream());
    }
}
