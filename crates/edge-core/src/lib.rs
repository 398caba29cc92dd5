//! Core abstractions for the edge adapter contract.
//!
//! This crate provides the fundamental types and traits:
//! - `SiteConfig` - Output mode, adapter selection, declared bindings
//! - `Request` / `Response` / `Body` - Framework-neutral HTTP messages
//! - `RenderEntry` trait - Build-time unit invoked per request
//! - `RequestContext` - Per-request bindings and cancellation
//! - `ShimPhase` - Runtime shim lifecycle tracking

mod binding;
mod body;
mod config;
mod context;
mod entry;
mod error;
mod lifecycle;
mod message;

pub use binding::*;
pub use body::*;
pub use config::*;
pub use context::*;
pub use entry::*;
pub use error::*;
pub use lifecycle::*;
pub use message::*;

pub use http::{HeaderMap, Method, StatusCode, Uri};
pub use tokio_util::sync::CancellationToken;
