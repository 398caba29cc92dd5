//! Per-request context handed to render entries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::binding::{BindingError, Bindings, KvStore, Queue, Secret};

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

static SEQUENCE: AtomicU32 = AtomicU32::new(0);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:x}-{:08x}", nanos, seq))
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extracted route parameters (e.g., `:slug` from `/posts/:slug`).
pub type RouteParams = HashMap<String, String>;

/// Everything a render entry may touch besides the request itself.
///
/// Cloning is cheap; bindings are reference-counted handles owned by the host.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// Route pattern that matched.
    pub route: String,
    /// Extracted route parameters.
    pub params: RouteParams,
    /// Public site URL, if configured.
    pub site: Option<Arc<str>>,
    bindings: Bindings,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Create a context for a matched route.
    ///
    /// `request_id` is the id the host already assigned, so entry logs and
    /// shim logs for one request share it.
    pub fn new(
        request_id: RequestId,
        route: impl Into<String>,
        bindings: Bindings,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            request_id,
            route: route.into(),
            params: RouteParams::new(),
            site: None,
            bindings,
            cancellation,
        }
    }

    /// Context with a fresh id, no bindings and a fresh cancellation token.
    pub fn detached(route: impl Into<String>) -> Self {
        Self::new(
            RequestId::generate(),
            route,
            Bindings::new(),
            CancellationToken::new(),
        )
    }

    /// Set route parameters.
    pub fn with_params(mut self, params: RouteParams) -> Self {
        self.params = params;
        self
    }

    /// Set the public site URL.
    pub fn with_site(mut self, site: Option<Arc<str>>) -> Self {
        self.site = site;
        self
    }

    /// Get a route parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|s| s.as_str())
    }

    /// All bindings visible to this request.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Key-value binding.
    pub fn kv(&self, name: &str) -> Result<&Arc<dyn KvStore>, BindingError> {
        self.bindings.kv(name)
    }

    /// Secret binding.
    pub fn secret(&self, name: &str) -> Result<&Secret, BindingError> {
        self.bindings.secret(name)
    }

    /// Queue binding.
    pub fn queue(&self, name: &str) -> Result<&Arc<dyn Queue>, BindingError> {
        self.bindings.queue(name)
    }

    /// Variable binding.
    pub fn var(&self, name: &str) -> Result<&str, BindingError> {
        self.bindings.var(name)
    }

    /// Cancellation token for this request. Pass it to downstream calls.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the host cancelled this request.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once the request is cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// Absolute URL for a path on this site.
    pub fn absolute_url(&self, path: &str) -> Option<String> {
        self.site.as_deref().map(|site| {
            format!(
                "{}/{}",
                site.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_absolute_url_joins_without_double_slash() {
        let ctx = RequestContext::detached("/")
            .with_site(Some(Arc::from("https://example.pages.dev/")));
        assert_eq!(
            ctx.absolute_url("/posts/1").as_deref(),
            Some("https://example.pages.dev/posts/1")
        );
        assert_eq!(RequestContext::detached("/").absolute_url("/x"), None);
    }

    #[tokio::test]
    async fn test_cancellation_is_observable() {
        let token = CancellationToken::new();
        let id = RequestId::generate();
        let ctx = RequestContext::new(id.clone(), "/slow", Bindings::new(), token.child_token());
        assert_eq!(ctx.request_id, id);
        assert!(!ctx.is_cancelled());
        token.cancel();
        ctx.cancelled().await;
        assert!(ctx.is_cancelled());
    }
}
