//! Reference site for the edge adapters.
//!
//! One build, two hosts:
//! - `/` streams a shell first, then a visit counter read from KV
//! - `/hello/:name` renders a page with a canonical link
//! - `/api/echo/*rest` reflects the normalized request as JSON
//! - `/robots.txt` and `/style.css` are static assets
//!
//! On `wasm32` the crate also exports a Spin component that serves this build.

mod pages;

#[cfg(target_arch = "wasm32")]
mod component;

use edge_sdk::edge_adapter::{BuildOutput, StaticAsset};
use edge_sdk::edge_core::{
    AdapterKind, BindingDeclaration, BindingKind, EntryShape, EntrySignature, SiteConfig,
};

pub use pages::{echo, greeting, home};

/// KV namespace holding visit counters.
pub const VISITS: &str = "VISITS";

/// Public URL of the deployed site.
pub const SITE_URL: &str = "https://hello.example.com";

const ROBOTS: &str = "User-agent: *\nAllow: /\n";

const STYLE: &str = "body { font-family: system-ui; max-width: 48rem; margin: 0 auto; }\n";

/// Site configuration for `kind`.
pub fn site_config(kind: AdapterKind) -> SiteConfig {
    SiteConfig::server(kind)
        .with_url(SITE_URL)
        .with_binding(BindingDeclaration::new(VISITS, BindingKind::Kv))
}

/// Entry shape each host invokes.
pub fn shape_for(kind: AdapterKind) -> EntryShape {
    match kind {
        AdapterKind::Cloudflare => EntryShape::new(EntrySignature::RequestEnvContext),
        AdapterKind::Spin => EntryShape::new(EntrySignature::RequestOnly),
    }
}

/// The site build, with entries shaped for `kind`.
pub fn build_output(kind: AdapterKind) -> BuildOutput {
    BuildOutput::server()
        .with_asset(StaticAsset::new("/robots.txt", ROBOTS))
        .with_asset(StaticAsset::new("/style.css", STYLE))
        .with_entry("/", home(kind))
        .with_entry("/hello/:name", greeting(kind))
        .with_entry("/api/echo/*rest", echo(kind))
}
