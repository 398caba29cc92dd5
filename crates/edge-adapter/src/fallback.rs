//! Fallback responses for requests that leave the happy path.

use bytes::Bytes;
use edge_core::{ErrorStage, FallbackFormat, HeaderMap, RequestId, StatusCode};
use http::header::{HeaderValue, CONTENT_TYPE};
use serde::Serialize;

/// How fallback bodies are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackStrategy {
    /// `text/plain` status line.
    Text,
    /// `application/problem+json` document.
    Json,
    /// Fixed body served for every failure, with the failure's status.
    Static {
        content_type: &'static str,
        body: Bytes,
    },
}

impl FallbackStrategy {
    /// Create a fallback that always serves the given HTML.
    pub fn html(html: impl Into<String>) -> Self {
        Self::Static {
            content_type: "text/html; charset=utf-8",
            body: Bytes::from(html.into()),
        }
    }
}

impl Default for FallbackStrategy {
    fn default() -> Self {
        Self::Text
    }
}

impl From<FallbackFormat> for FallbackStrategy {
    fn from(format: FallbackFormat) -> Self {
        match format {
            FallbackFormat::Text => Self::Text,
            FallbackFormat::Json => Self::Json,
        }
    }
}

/// Status used for a failure at `stage`.
///
/// Cancellation is a handler-stage outcome with its own status; see
/// [`edge_core::HandlerFault::status`].
pub fn stage_status(stage: ErrorStage) -> StatusCode {
    match stage {
        ErrorStage::TranslateIn => StatusCode::BAD_REQUEST,
        ErrorStage::Handler => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorStage::TranslateOut => StatusCode::BAD_GATEWAY,
    }
}

/// A rendered fallback, ready for host translation.
#[derive(Debug, Clone)]
pub struct FallbackResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Serialize)]
struct Problem<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    title: &'a str,
    status: u16,
    stage: String,
    request_id: &'a str,
}

/// Render the fallback for a failure.
///
/// Error details stay in the logs; bodies only carry the status, the
/// stage and the request id.
pub fn render_fallback(
    strategy: &FallbackStrategy,
    status: StatusCode,
    stage: ErrorStage,
    request_id: &RequestId,
) -> FallbackResponse {
    let title = status.canonical_reason().unwrap_or("Request Failed");

    let (content_type, body) = match strategy {
        FallbackStrategy::Text => (
            "text/plain; charset=utf-8",
            Bytes::from(format!("{} {}\n", status.as_u16(), title)),
        ),
        FallbackStrategy::Json => {
            let problem = Problem {
                kind: "about:blank",
                title,
                status: status.as_u16(),
                stage: stage.to_string(),
                request_id: &request_id.0,
            };
            let body = serde_json::to_vec(&problem).unwrap_or_default();
            ("application/problem+json", Bytes::from(body))
        }
        FallbackStrategy::Static { content_type, body } => (*content_type, body.clone()),
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(value) = HeaderValue::from_str(&request_id.0) {
        headers.insert("x-request-id", value);
    }

    FallbackResponse {
        status,
        headers,
        body,
    }
}

/// Plain-text response for paths nothing answers.
pub fn not_found(request_id: &RequestId) -> FallbackResponse {
    let mut response = render_fallback(
        &FallbackStrategy::Text,
        StatusCode::NOT_FOUND,
        ErrorStage::Handler,
        request_id,
    );
    response.body = Bytes::from_static(b"404 Not Found\n");
    response
}
