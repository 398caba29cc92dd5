//! Render entries: build-time units invoked per request.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::EntryError;
use crate::message::{Request, Response};

/// Handler signature an entry module exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntrySignature {
    /// `(Request, Env, Context)`: bindings and execution context passed in.
    RequestEnvContext,
    /// `(Request)`: bindings resolved from component configuration.
    RequestOnly,
}

impl fmt::Display for EntrySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestEnvContext => write!(f, "(Request, Env, Context)"),
            Self::RequestOnly => write!(f, "(Request)"),
        }
    }
}

/// How an entry produces response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Always returns buffered bodies.
    #[default]
    Buffered,
    /// Returns streaming bodies and needs the host to forward them.
    Streaming,
}

/// Declared shape of a render entry, checked against the adapter's output spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryShape {
    /// Handler signature.
    pub signature: EntrySignature,
    /// Response body mode.
    #[serde(default)]
    pub response: ResponseMode,
    /// Binding names the entry reads.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<String>,
}

impl EntryShape {
    /// Shape with the given signature, buffered responses and no bindings.
    pub fn new(signature: EntrySignature) -> Self {
        Self {
            signature,
            response: ResponseMode::Buffered,
            bindings: Vec::new(),
        }
    }

    /// Mark the entry as streaming.
    pub fn streaming(mut self) -> Self {
        self.response = ResponseMode::Streaming;
        self
    }

    /// Require a binding.
    pub fn with_binding(mut self, name: impl Into<String>) -> Self {
        self.bindings.push(name.into());
        self
    }
}

/// A unit that produces a response for a request.
///
/// Entries are created once at build time and invoked concurrently; they
/// must not keep per-request state in `self`.
#[async_trait]
pub trait RenderEntry: Send + Sync {
    /// Declared shape.
    fn shape(&self) -> EntryShape;

    /// Render a response.
    async fn render(&self, req: Request, ctx: &RequestContext) -> Result<Response, EntryError>;
}

/// Render entry backed by an async closure.
pub struct EntryFn<F> {
    shape: EntryShape,
    handler: F,
}

/// Build a [`RenderEntry`] from a closure.
///
/// ```rust,ignore
/// let entry = entry_fn(EntryShape::new(EntrySignature::RequestEnvContext), |req, _ctx| async move {
///     Ok(Response::text(StatusCode::OK, req.path().to_string()))
/// });
/// ```
pub fn entry_fn<F, Fut>(shape: EntryShape, handler: F) -> EntryFn<F>
where
    F: Fn(Request, RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, EntryError>> + Send + 'static,
{
    EntryFn { shape, handler }
}

#[async_trait]
impl<F, Fut> RenderEntry for EntryFn<F>
where
    F: Fn(Request, RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, EntryError>> + Send + 'static,
{
    fn shape(&self) -> EntryShape {
        self.shape.clone()
    }

    async fn render(&self, req: Request, ctx: &RequestContext) -> Result<Response, EntryError> {
        (self.handler)(req, ctx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[tokio::test]
    async fn test_entry_fn_renders() {
        let entry = entry_fn(
            EntryShape::new(EntrySignature::RequestOnly),
            |req: Request, ctx: RequestContext| async move {
                Ok(Response::text(
                    StatusCode::OK,
                    format!("{} {}", ctx.route, req.path()),
                ))
            },
        );

        let req = Request::try_new("GET", "/hello").unwrap();
        let resp = entry
            .render(req, &RequestContext::detached("/hello"))
            .await
            .unwrap();
        assert_eq!(resp.body.collect().await.unwrap(), "/hello /hello");
        assert_eq!(entry.shape().signature, EntrySignature::RequestOnly);
    }

    #[test]
    fn test_shape_serde() {
        let shape: EntryShape = serde_json::from_str(
            r#"{"signature":"request-env-context","response":"streaming","bindings":["KV"]}"#,
        )
        .unwrap();
        assert_eq!(
            shape,
            EntryShape::new(EntrySignature::RequestEnvContext)
                .streaming()
                .with_binding("KV")
        );
    }
}
