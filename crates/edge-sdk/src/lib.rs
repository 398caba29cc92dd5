//! Public SDK for building sites on edge hosts.
//!
//! This crate re-exports all platform functionality:
//!
//! ```ignore
//! use edge_sdk::prelude::*;
//!
//! let home = entry_fn(
//!     EntryShape::new(EntrySignature::RequestEnvContext).streaming(),
//!     |_req: Request, ctx: RequestContext| async move {
//!         let (mut sink, body) = body_channel(DEFAULT_CHANNEL_CAPACITY);
//!         tokio::spawn(async move {
//!             let _ = sink.send("<h1>Hello</h1>").await;
//!             sink.complete();
//!         });
//!         Ok(Response::new(StatusCode::OK).with_body(body))
//!     },
//! );
//!
//! let build = BuildOutput::server().with_entry("/", home);
//! let bundle = adapter_for(SiteConfig::server(AdapterKind::Cloudflare)).wrap(&build)?;
//! let worker = CloudflareWorker::new(bundle.instantiate(HostEnv::new())?)?;
//! ```

pub use edge_adapter;
pub use edge_bindings;
pub use edge_core;
pub use edge_observability;
pub use edge_streaming;

/// Prelude for convenient imports.
pub mod prelude {
    pub use edge_adapter::hosts::*;
    pub use edge_adapter::*;
    pub use edge_bindings::*;
    pub use edge_core::*;
    pub use edge_observability::*;
    pub use edge_streaming::*;
}
