//! Host binding implementations and environment validation.
//!
//! - `HostEnv` - Bindings supplied by the host, validated against declarations
//! - `MemoryKv` / `TypedKv` - Key-value store and typed JSON view
//! - `MemoryQueue` - Queue producer kept in memory

mod env;
mod kv;
mod queue;

pub use env::*;
pub use kv::*;
pub use queue::*;
