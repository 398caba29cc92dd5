//! Spin-style component host: `handle(request)` over raw, buffered types.
//!
//! Bindings are resolved by name from the component configuration captured
//! when the bundle is instantiated.

use bytes::Bytes;
use edge_core::{
    parse_header, AdapterKind, BindingKind, Body, CancellationToken, ConfigurationError,
    EntrySignature, Request, Response, SiteConfig, StreamError, TranslationError,
};
use edge_streaming::StreamingSupport;

use crate::adapter::Adapter;
use crate::bundle::Instance;
use crate::fallback::FallbackResponse;
use crate::shape::OutputShapeSpec;
use crate::shim::HostCodec;

/// Request as the component receives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinRequest {
    pub method: String,
    /// Path with query, or an absolute URL.
    pub uri: String,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Bytes,
}

impl SpinRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// Response the component hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinResponse {
    pub status: u16,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Bytes,
}

impl SpinResponse {
    /// First value of a header.
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.header_values(name).into_iter().next()
    }

    /// Every value of a header, in order.
    pub fn header_values(&self, name: &str) -> Vec<&[u8]> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
            .collect()
    }

    /// Body as UTF-8, lossily.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Adapter for Spin component hosts.
#[derive(Debug, Clone)]
pub struct SpinAdapter {
    config: SiteConfig,
}

impl SpinAdapter {
    pub fn new(config: SiteConfig) -> Self {
        Self { config }
    }
}

impl Adapter for SpinAdapter {
    fn config(&self) -> &SiteConfig {
        &self.config
    }

    fn negotiate_output_shape(&self) -> OutputShapeSpec {
        OutputShapeSpec {
            host: AdapterKind::Spin,
            accepted_signatures: vec![EntrySignature::RequestOnly],
            streaming: StreamingSupport::BufferedOnly,
            required_output: None,
            module_format: "wasm-component".to_string(),
            binding_kinds: vec![BindingKind::Kv, BindingKind::Secret, BindingKind::Var],
        }
    }
}

/// Translation between raw component types and normalized messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinCodec;

impl HostCodec for SpinCodec {
    type Request = SpinRequest;
    type Response = SpinResponse;

    fn host(&self) -> AdapterKind {
        AdapterKind::Spin
    }

    fn translate_in(&self, request: SpinRequest) -> Result<Request, TranslationError> {
        let mut normalized = Request::try_new(&request.method, &request.uri)?;
        if !normalized.uri.path().starts_with('/') {
            return Err(TranslationError::InvalidUri {
                uri: request.uri,
                reason: "expected a path or an absolute URL".to_string(),
            });
        }

        for (name, value) in &request.headers {
            let (name, value) = parse_header(name, value)?;
            normalized.headers.append(name, value);
        }
        normalized.body = Body::from_bytes(request.body);
        Ok(normalized)
    }

    fn translate_out(&self, response: Response) -> Result<SpinResponse, TranslationError> {
        let status = response.status.as_u16();
        if !(100..=599).contains(&status) {
            return Err(TranslationError::InvalidStatus(status));
        }

        let body = match response.body {
            Body::Empty => Bytes::new(),
            Body::Full(bytes) => bytes,
            Body::Stream(_) => {
                return Err(TranslationError::Body(StreamError::Source(
                    "component responses must be buffered".to_string(),
                )))
            }
        };

        Ok(SpinResponse {
            status,
            headers: raw_headers(&response.headers),
            body,
        })
    }

    fn fallback(&self, response: FallbackResponse) -> SpinResponse {
        SpinResponse {
            status: response.status.as_u16(),
            headers: raw_headers(&response.headers),
            body: response.body,
        }
    }
}

fn raw_headers(headers: &http::HeaderMap) -> Vec<(String, Vec<u8>)> {
    headers
        .iter()
        .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
        .collect()
}

/// The deployed component.
#[derive(Debug, Clone)]
pub struct SpinComponent {
    instance: Instance,
}

impl SpinComponent {
    /// Wrap an instance produced from a spin bundle.
    pub fn new(instance: Instance) -> Result<Self, ConfigurationError> {
        instance.expect_host(AdapterKind::Spin)?;
        Ok(Self { instance })
    }

    /// The component's request handler.
    pub async fn handle(&self, request: SpinRequest) -> SpinResponse {
        self.handle_with_signal(request, &CancellationToken::new())
            .await
    }

    /// Handle a request the host may abandon through `signal`.
    pub async fn handle_with_signal(
        &self,
        request: SpinRequest,
        signal: &CancellationToken,
    ) -> SpinResponse {
        self.instance
            .serve(&SpinCodec, request, signal)
            .await
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }
}
