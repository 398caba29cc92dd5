//! Workers-style host: `fetch(request, ctx)` over `http` types.
//!
//! The worker's bindings are fixed when the bundle is instantiated, so a
//! missing binding fails deployment instead of individual requests.
use edge_core::{
    AdapterKind, BindingKind, Body, CancellationToken, ConfigurationError, EntrySignature,
    OutputMode, Request, Response, SiteConfig, TranslationError,
};
use edge_streaming::StreamingSupport;

use crate::adapter::Adapter;
use crate::bundle::Instance;
use crate::fallback::FallbackResponse;
use crate::shape::OutputShapeSpec;
use crate::shim::HostCodec;

/// Request as the worker runtime delivers it.
pub type WorkerRequest = http::Request<Body>;
/// Response handed back to the worker runtime.
pub type WorkerResponse = http::Response<Body>;

/// Per-invocation execution context.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    abort: CancellationToken,
}

impl ExecutionContext {
    /// Create a context with a fresh abort signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal fired when the client goes away.
    pub fn abort_signal(&self) -> &CancellationToken {
        &self.abort
    }

    /// Fire the abort signal.
    pub fn abort(&self) {
        self.abort.cancel();
    }
}

/// Adapter for Workers-style isolate hosts.
#[derive(Debug, Clone)]
pub struct CloudflareAdapter {
    config: SiteConfig,
}

impl CloudflareAdapter {
    pub fn new(config: SiteConfig) -> Self {
        Self { config }
    }
}

impl Adapter for CloudflareAdapter {
    fn config(&self) -> &SiteConfig {
        &self.config
    }

    fn negotiate_output_shape(&self) -> OutputShapeSpec {
        OutputShapeSpec {
            host: AdapterKind::Cloudflare,
            accepted_signatures: vec![EntrySignature::RequestEnvContext, EntrySignature::RequestOnly],
            streaming: if self.config.adapter.streaming {
                StreamingSupport::Streaming
            } else {
                StreamingSupport::BufferedOnly
            },
            required_output: Some(OutputMode::Server),
            module_format: "es-module-worker".to_string(),
            binding_kinds: vec![
                BindingKind::Kv,
                BindingKind::Secret,
                BindingKind::Queue,
                BindingKind::Var,
                BindingKind::Durable,
            ],
        }
    }
}

/// Translation between worker `http` types and normalized messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudflareCodec;

impl HostCodec for CloudflareCodec {
    type Request = WorkerRequest;
    type Response = WorkerResponse;

    fn host(&self) -> AdapterKind {
        AdapterKind::Cloudflare
    }

    fn translate_in(&self, request: WorkerRequest) -> Result<Request, TranslationError> {
        let (parts, body) = request.into_parts();
        if parts.uri.scheme().is_none() || parts.uri.host().is_none() {
            return Err(TranslationError::InvalidUri {
                uri: parts.uri.to_string(),
                reason: "worker requests carry absolute URLs".to_string(),
            });
        }

        let mut normalized = Request::new(parts.method, parts.uri);
        normalized.headers = parts.headers;
        normalized.body = body;
        Ok(normalized)
    }

    fn translate_out(&self, response: Response) -> Result<WorkerResponse, TranslationError> {
        // The runtime only constructs 101 (websocket upgrades) and 200..=599.
        let code = response.status.as_u16();
        if code != 101 && !(200..=599).contains(&code) {
            return Err(TranslationError::InvalidStatus(code));
        }

        let mut native = http::Response::new(response.body);
        *native.status_mut() = response.status;
        *native.headers_mut() = response.headers;
        Ok(native)
    }

    fn fallback(&self, response: FallbackResponse) -> WorkerResponse {
        let mut native = http::Response::new(Body::from_bytes(response.body));
        *native.status_mut() = response.status;
        *native.headers_mut() = response.headers;
        native
    }
}

/// The deployed worker script.
#[derive(Debug, Clone)]
pub struct CloudflareWorker {
    instance: Instance,
}

impl CloudflareWorker {
    /// Wrap an instance produced from a cloudflare bundle.
    pub fn new(instance: Instance) -> Result<Self, ConfigurationError> {
        instance.expect_host(AdapterKind::Cloudflare)?;
        Ok(Self { instance })
    }

    /// The worker's `fetch` handler.
    pub async fn fetch(&self, request: WorkerRequest, ctx: &ExecutionContext) -> WorkerResponse {
        self.instance
            .serve(&CloudflareCodec, request, ctx.abort_signal())
            .await
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_translate_in_keeps_duplicate_headers() {
        let request = http::Request::builder()
            .method("POST")
            .uri("https://example.com/api/items?page=2")
            .header("x-tag", "a")
            .header("x-tag", "b")
            .body(Body::from("payload"))
            .unwrap();

        let normalized = CloudflareCodec.translate_in(request).unwrap();
        assert_eq!(normalized.method, http::Method::POST);
        assert_eq!(normalized.path(), "/api/items");
        assert_eq!(normalized.query(), Some("page=2"));
        assert_eq!(normalized.headers.get_all("x-tag").iter().count(), 2);
    }

    #[test]
    fn test_translate_in_rejects_relative_url() {
        let request = http::Request::builder()
            .uri("/relative")
            .body(Body::Empty)
            .unwrap();
        assert!(matches!(
            CloudflareCodec.translate_in(request),
            Err(TranslationError::InvalidUri { .. })
        ));
    }

    #[test]
    fn test_translate_out_rejects_informational_status() {
        let response = Response::new(StatusCode::from_u16(103).unwrap());
        assert_eq!(
            CloudflareCodec.translate_out(response).unwrap_err(),
            TranslationError::InvalidStatus(103)
        );
    }

    #[test]
    fn test_shape_follows_streaming_option() {
        let mut config = SiteConfig::server(AdapterKind::Cloudflare);
        assert_eq!(
            CloudflareAdapter::new(config.clone())
                .negotiate_output_shape()
                .streaming,
            StreamingSupport::Streaming
        );
        config.adapter.streaming = false;
        assert_eq!(
            CloudflareAdapter::new(config).negotiate_output_shape().streaming,
            StreamingSupport::BufferedOnly
        );
    }
}
