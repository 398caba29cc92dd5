//! Adapter contract and runtime shims for edge hosts.
//!
//! This crate provides:
//! - `Adapter` - Output shape negotiation and wrapping, one impl per host
//! - `BuildOutput` / `BuildPlan` - What the site build hands over
//! - `DeployableBundle` / `Instance` - Shims ready for a host
//! - `BundleManifest` - Serializable bundle description with fingerprint
//! - `FallbackStrategy` - Error responses per failure stage
//! - `hosts` - Cloudflare and Spin variants

mod adapter;
mod build;
mod bundle;
mod fallback;
pub mod hosts;
mod manifest;
mod route;
mod shape;
mod shim;

pub use adapter::*;
pub use build::*;
pub use bundle::*;
pub use fallback::*;
pub use manifest::*;
pub use route::*;
pub use shape::*;
pub use shim::HostCodec;
