//! Host variants. Each pairs an [`crate::Adapter`] with a codec for the
//! host's native request/response types and a front that exposes the host's
//! handler signature.

pub mod cloudflare;
pub mod spin;

pub use cloudflare::{CloudflareAdapter, CloudflareCodec, CloudflareWorker, ExecutionContext};
pub use spin::{SpinAdapter, SpinCodec, SpinComponent, SpinRequest, SpinResponse};
