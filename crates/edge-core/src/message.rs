//! Framework-neutral HTTP request and response.
//!
//! Headers live in an [`http::HeaderMap`], so repeated headers keep every
//! value. Ordering across distinct header names is not preserved.

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode, Uri};
use serde::Serialize;

use crate::body::Body;
use crate::error::TranslationError;

/// Normalized request handed to render entries.
#[derive(Debug)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Path and query (origin form).
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Body,
}

impl Request {
    /// Create a request with no headers and an empty body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    /// Parse `method` and `uri` from strings.
    pub fn try_new(method: &str, uri: &str) -> Result<Self, TranslationError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| TranslationError::InvalidMethod(method.to_string()))?;
        let uri = uri.parse::<Uri>().map_err(|e| TranslationError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(method, uri))
    }

    /// Request path.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Raw query string.
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// First value of a header, if it is valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Append a header, keeping existing values.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<(), TranslationError> {
        let (name, value) = parse_header(name, value.as_bytes())?;
        self.headers.append(name, value);
        Ok(())
    }

    /// Builder-style [`Request::append_header`].
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, TranslationError> {
        self.append_header(name, value)?;
        Ok(self)
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }
}

/// Response produced by render entries.
#[derive(Debug)]
pub struct Response {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Body,
}

impl Response {
    /// Create a response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    /// 200 with a body.
    pub fn ok(body: impl Into<Body>) -> Self {
        Self::new(StatusCode::OK).with_body(body)
    }

    /// Plain-text response.
    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        Self::new(status)
            .with_content_type("text/plain; charset=utf-8")
            .with_body(text.into())
    }

    /// HTML response with status 200.
    pub fn html(html: impl Into<String>) -> Self {
        Self::new(StatusCode::OK)
            .with_content_type("text/html; charset=utf-8")
            .with_body(html.into())
    }

    /// JSON response.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        Ok(Self::new(status)
            .with_content_type("application/json")
            .with_body(bytes))
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Set `content-type`, replacing any existing value.
    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self
    }

    /// Append a header, keeping existing values.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<(), TranslationError> {
        let (name, value) = parse_header(name, value.as_bytes())?;
        self.headers.append(name, value);
        Ok(())
    }

    /// Builder-style [`Response::append_header`].
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, TranslationError> {
        self.append_header(name, value)?;
        Ok(self)
    }

    /// First value of a header, if it is valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Check if the response was successful (2xx status).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if the response was a server error (5xx status).
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }
}

/// Validate a raw header pair.
pub fn parse_header(
    name: &str,
    value: &[u8],
) -> Result<(HeaderName, HeaderValue), TranslationError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| TranslationError::InvalidHeaderName(name.to_string()))?;
    let header_value = HeaderValue::from_bytes(value)
        .map_err(|_| TranslationError::InvalidHeaderValue(name.to_string()))?;
    Ok((header_name, header_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_keeps_repeated_headers() {
        let req = Request::try_new("GET", "/products?page=2")
            .unwrap()
            .with_header("accept", "text/html")
            .unwrap()
            .with_header("accept", "application/json")
            .unwrap();

        let values: Vec<_> = req.headers.get_all("accept").iter().collect();
        assert_eq!(values.len(), 2);
        assert_eq!(req.path(), "/products");
        assert_eq!(req.query(), Some("page=2"));
    }

    #[test]
    fn test_request_rejects_bad_method() {
        assert!(matches!(
            Request::try_new("GE T", "/"),
            Err(TranslationError::InvalidMethod(_))
        ));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let resp = Response::text(StatusCode::OK, "hi");
        assert_eq!(resp.header("Content-Type"), Some("text/plain; charset=utf-8"));
        assert_eq!(resp.header("CONTENT-TYPE"), Some("text/plain; charset=utf-8"));
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let mut resp = Response::new(StatusCode::OK);
        assert_eq!(
            resp.append_header("x-bad", "line\nbreak"),
            Err(TranslationError::InvalidHeaderValue("x-bad".into()))
        );
    }

    #[test]
    fn test_json_response_sets_content_type() {
        let resp = Response::json(StatusCode::CREATED, &serde_json::json!({"ok": true})).unwrap();
        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(resp.header("content-type"), Some("application/json"));
    }
}
