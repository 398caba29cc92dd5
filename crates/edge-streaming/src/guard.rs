//! Stream wrappers that keep producer faults inside the request.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use edge_core::{BodyStream, CancellationToken, StreamError};
use futures::future::{self, Either};
use futures::{pin_mut, stream, StreamExt};

/// Stop yielding chunks once `token` is cancelled.
///
/// The stream ends with a single `StreamError::Cancelled` so the host can
/// tell a truncated body from a complete one.
pub fn until_cancelled(stream: BodyStream, token: CancellationToken) -> BodyStream {
    stream::unfold(Some((stream, token)), |state| async move {
        let (mut inner, token) = state?;
        if token.is_cancelled() {
            return Some((Err(StreamError::Cancelled), None));
        }

        let next = {
            let cancelled = token.cancelled();
            pin_mut!(cancelled);
            match future::select(inner.next(), cancelled).await {
                Either::Left((item, _)) => item,
                Either::Right(_) => return Some((Err(StreamError::Cancelled), None)),
            }
        };

        next.map(|item| (item, Some((inner, token))))
    })
    .boxed()
}

/// Turn a panic inside the producer into a terminal `StreamError::Panicked`.
pub fn catch_panics(stream: BodyStream) -> BodyStream {
    AssertUnwindSafe(stream)
        .catch_unwind()
        .map(|item| match item {
            Ok(chunk) => chunk,
            Err(payload) => Err(StreamError::Panicked(panic_message(payload.as_ref()))),
        })
        .boxed()
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
