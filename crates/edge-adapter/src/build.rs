//! Build output descriptor: what the site build hands to an adapter.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use edge_core::{OutputMode, RenderEntry};

/// A pre-rendered file served as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAsset {
    /// URL path, starting with `/`.
    pub path: String,
    /// File contents.
    pub bytes: Bytes,
    /// Content type served with the file.
    pub content_type: String,
}

impl StaticAsset {
    /// Create an asset, guessing the content type from the path extension.
    pub fn new(path: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let path = path.into();
        let content_type = content_type_for(&path).to_string();
        Self {
            path,
            bytes: bytes.into(),
            content_type,
        }
    }

    /// Override the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// A render entry addressed by its route pattern.
#[derive(Clone)]
pub struct RoutedEntry {
    /// Route pattern, e.g. `/posts/:slug`.
    pub pattern: String,
    /// The entry.
    pub entry: Arc<dyn RenderEntry>,
}

impl fmt::Debug for RoutedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutedEntry")
            .field("pattern", &self.pattern)
            .field("shape", &self.entry.shape())
            .finish()
    }
}

/// Ordered assets plus render entries.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Mode the build ran in.
    pub mode: OutputMode,
    /// Static assets, in emission order.
    pub assets: Vec<StaticAsset>,
    /// Render entries, in emission order.
    pub entries: Vec<RoutedEntry>,
}

impl BuildOutput {
    /// Empty server-mode output.
    pub fn server() -> Self {
        Self {
            mode: OutputMode::Server,
            ..Default::default()
        }
    }

    /// Empty static-mode output.
    pub fn static_site() -> Self {
        Self {
            mode: OutputMode::Static,
            ..Default::default()
        }
    }

    /// Add an asset.
    pub fn with_asset(mut self, asset: StaticAsset) -> Self {
        self.assets.push(asset);
        self
    }

    /// Add a render entry at `pattern`.
    pub fn with_entry(
        mut self,
        pattern: impl Into<String>,
        entry: impl RenderEntry + 'static,
    ) -> Self {
        self.entries.push(RoutedEntry {
            pattern: pattern.into(),
            entry: Arc::new(entry),
        });
        self
    }
}

/// Content type for a file path, by extension.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}
