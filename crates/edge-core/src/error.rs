//! Error taxonomy shared by adapters, shims and render entries.

use http::StatusCode;

use crate::binding::BindingKind;

/// Deploy-time or startup-time failure. Always blocks publishing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("route '{route}' does not match the negotiated output shape: {reason}")]
    ShapeMismatch { route: String, reason: String },

    #[error("duplicate asset path: {0}")]
    DuplicateAsset(String),

    #[error("duplicate route pattern: {0}")]
    DuplicateRoute(String),

    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidRoute { pattern: String, reason: String },

    #[error("host '{host}' requires '{expected}' output, build produced '{actual}'")]
    OutputModeMismatch {
        host: String,
        expected: String,
        actual: String,
    },

    #[error("static build carries {count} render entries")]
    EntriesInStaticBuild { count: usize },

    #[error("route '{route}' requires binding '{binding}' which is not declared")]
    UndeclaredBinding { route: String, binding: String },

    #[error("host '{host}' cannot provide {kind} bindings (binding '{name}')")]
    UnsupportedBinding {
        host: String,
        name: String,
        kind: BindingKind,
    },

    #[error("declared binding '{name}' ({kind}) is missing from the host environment")]
    MissingBinding { name: String, kind: BindingKind },

    #[error("binding '{name}' is declared as {expected} but the host provides {actual}")]
    BindingKindMismatch {
        name: String,
        expected: BindingKind,
        actual: BindingKind,
    },

    #[error("binding '{0}' is declared more than once")]
    DuplicateBinding(String),

    #[error("invalid site url '{url}': {reason}")]
    InvalidSiteUrl { url: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Malformed data at the host boundary, in either direction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    #[error("invalid method: {0}")]
    InvalidMethod(String),

    #[error("invalid uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("invalid header name: {0}")]
    InvalidHeaderName(String),

    #[error("invalid value for header '{0}'")]
    InvalidHeaderValue(String),

    #[error("invalid status code: {0}")]
    InvalidStatus(u16),

    #[error("body error: {0}")]
    Body(#[from] StreamError),
}

/// A render entry failed while handling a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerFault {
    #[error("handler for '{route}' failed: {message}")]
    Failed { route: String, message: String },

    #[error("handler for '{route}' panicked: {message}")]
    Panicked { route: String, message: String },

    #[error("handler for '{route}' was cancelled")]
    Cancelled { route: String },
}

impl HandlerFault {
    /// Status used for the fallback response.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Failed { .. } | Self::Panicked { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            // Client Closed Request. Always in range, so the conversion cannot fail.
            Self::Cancelled { .. } => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::SERVICE_UNAVAILABLE)
            }
        }
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Failed { .. } => "failed",
            Self::Panicked { .. } => "panicked",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

/// Body stream failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("stream cancelled")]
    Cancelled,

    #[error("stream closed by receiver")]
    Closed,

    #[error("stream producer panicked: {0}")]
    Panicked(String),

    #[error("stream source failed: {0}")]
    Source(String),
}

/// Errors returned by render entries.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    #[error(transparent)]
    Binding(#[from] crate::binding::BindingError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}
