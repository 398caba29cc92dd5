//! Streaming body plumbing for edge runtime shims.
//!
//! This crate keeps streaming bodies streaming across the host boundary:
//! - `ChunkSink` / `body_channel` - Backpressured streaming response bodies
//! - `BodyStrategy` - Passthrough vs buffering, negotiated per host
//! - `until_cancelled` / `catch_panics` - Keep producer faults inside a request

mod guard;
mod mode;
mod sink;

pub use guard::*;
pub use mode::*;
pub use sink::*;
