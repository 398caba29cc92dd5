//! Observability infrastructure for edge runtime shims.
//!
//! This crate provides:
//! - `StructuredLogger` - Structured logging with request context
//! - `ShimMetrics` - Per-request phase timings and outcome
//! - `MetricsSink` / `MetricsLog` - Where finished metrics go

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

// Re-export RequestId and TimingContext from edge-core for convenience
pub use edge_core::{RequestId, TimingContext};
