//! Per-request shim metrics.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use edge_core::{ErrorStage, PhaseTracker, RequestId, ShimPhase};
use serde::{Deserialize, Serialize};

/// Metrics for a single request passing through a shim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShimMetrics {
    /// Request ID for correlation.
    pub request_id: String,
    /// Host the shim targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Route pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Time spent normalizing the host request (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translate_in_us: Option<u64>,
    /// Time spent in the render entry (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler_us: Option<u64>,
    /// Time spent building the host response (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translate_out_us: Option<u64>,
    /// Total request duration (microseconds).
    pub total_us: u64,
    /// Phases visited, in order.
    pub phases: Vec<String>,
    /// HTTP status code handed to the host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Whether the body was passed through as a stream.
    pub streamed: bool,
    /// Stage that produced a fallback response, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_stage: Option<String>,
    /// Fault label (`failed`, `panicked`, `cancelled`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Buffered body size, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_bytes: Option<usize>,
}

impl ShimMetrics {
    /// Whether the request ended in a fallback response.
    pub fn used_fallback(&self) -> bool {
        self.error_stage.is_some()
    }

    /// Format as JSON for logging.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format as a human-readable summary.
    pub fn to_summary(&self) -> String {
        let mut lines = vec![format!("Request: {}", self.request_id)];

        if let Some(ref host) = self.host {
            lines.push(format!("Host: {}", host));
        }
        if let Some(ref route) = self.route {
            lines.push(format!("Route: {}", route));
        }
        if let Some(status) = self.status_code {
            lines.push(format!("Status: {}", status));
        }

        lines.push(String::new());
        lines.push("Timings:".to_string());
        for (label, value) in [
            ("translate-in", self.translate_in_us),
            ("handler", self.handler_us),
            ("translate-out", self.translate_out_us),
        ] {
            if let Some(us) = value {
                lines.push(format!("  {}: {:.2}ms", label, us as f64 / 1000.0));
            }
        }
        lines.push(format!("  total: {:.2}ms", self.total_us as f64 / 1000.0));

        lines.push(String::new());
        lines.push(format!("Phases: {}", self.phases.join(" -> ")));
        lines.push(format!(
            "Body: {}",
            if self.streamed { "streamed" } else { "buffered" }
        ));

        if let Some(ref stage) = self.error_stage {
            lines.push(format!(
                "Fallback: {} ({})",
                stage,
                self.error_kind.as_deref().unwrap_or("unknown")
            ));
        }

        lines.join("\n")
    }
}

/// Collector for shim metrics.
#[derive(Debug)]
pub struct ShimMetricsCollector {
    request_id: RequestId,
    host: Option<String>,
    route: Option<String>,
    status_code: Option<u16>,
    streamed: bool,
    error: Option<(ErrorStage, String)>,
    body_bytes: Option<usize>,
}

impl ShimMetricsCollector {
    /// Create a new metrics collector.
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            host: None,
            route: None,
            status_code: None,
            streamed: false,
            error: None,
            body_bytes: None,
        }
    }

    /// Set host name.
    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = Some(host.into());
    }

    /// Set route pattern.
    pub fn set_route(&mut self, route: impl Into<String>) {
        self.route = Some(route.into());
    }

    /// Record the status handed to the host.
    pub fn record_status(&mut self, status: u16) {
        self.status_code = Some(status);
    }

    /// Record how the body left the shim.
    pub fn record_body(&mut self, streamed: bool, bytes: Option<usize>) {
        self.streamed = streamed;
        self.body_bytes = bytes;
    }

    /// Record the stage and kind of a failure.
    pub fn record_error(&mut self, stage: ErrorStage, kind: impl Into<String>) {
        self.error = Some((stage, kind.into()));
    }

    /// Finalize metrics using the phase tracker's timing marks.
    pub fn finalize(self, tracker: &PhaseTracker) -> ShimMetrics {
        let timing = tracker.timing();
        let us = |d: Duration| d.as_micros() as u64;
        let between = |from: ShimPhase, to: ShimPhase| {
            timing.between(from.mark_name(), to.mark_name()).map(us)
        };

        ShimMetrics {
            request_id: self.request_id.to_string(),
            host: self.host,
            route: self.route,
            translate_in_us: between(ShimPhase::Received, ShimPhase::TranslatedIn),
            handler_us: between(ShimPhase::HandlerInvoked, ShimPhase::TranslatedOut),
            translate_out_us: between(ShimPhase::TranslatedOut, ShimPhase::Sent),
            total_us: us(timing.elapsed()),
            phases: tracker
                .history()
                .iter()
                .map(|p| p.mark_name().to_string())
                .collect(),
            status_code: self.status_code,
            streamed: self.streamed,
            error_stage: self.error.as_ref().map(|(stage, _)| stage.to_string()),
            error_kind: self.error.map(|(_, kind)| kind),
            body_bytes: self.body_bytes,
        }
    }
}

/// Destination for finished request metrics.
pub trait MetricsSink: Send + Sync {
    /// Called once per request after the shim finishes.
    fn record(&self, metrics: ShimMetrics);
}

/// Sink that keeps every record in memory.
#[derive(Debug, Clone, Default)]
pub struct MetricsLog {
    records: Arc<Mutex<Vec<ShimMetrics>>>,
}

impl MetricsLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded metrics.
    pub fn records(&self) -> Vec<ShimMetrics> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Number of recorded requests.
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Whether nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetricsSink for MetricsLog {
    fn record(&self, metrics: ShimMetrics) {
        if let Ok(mut records) = self.records.lock() {
            records.push(metrics);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_happy_path() {
        let mut tracker = PhaseTracker::new();
        for phase in [
            ShimPhase::TranslatedIn,
            ShimPhase::HandlerInvoked,
            ShimPhase::TranslatedOut,
            ShimPhase::Sent,
        ] {
            tracker.advance(phase).unwrap();
        }

        let mut collector = ShimMetricsCollector::new(RequestId::from_string("r1"));
        collector.set_host("spin");
        collector.set_route("/");
        collector.record_status(200);
        collector.record_body(false, Some(12));
        let metrics = collector.finalize(&tracker);

        assert_eq!(metrics.phases.len(), 5);
        assert!(metrics.translate_in_us.is_some());
        assert!(metrics.handler_us.is_some());
        assert!(metrics.translate_out_us.is_some());
        assert!(!metrics.used_fallback());
        assert!(metrics.to_summary().contains("Body: buffered"));
    }

    #[test]
    fn test_finalize_records_error_stage() {
        let mut tracker = PhaseTracker::new();
        tracker.advance(ShimPhase::TranslatedIn).unwrap();
        tracker.advance(ShimPhase::HandlerInvoked).unwrap();
        tracker
            .advance(ShimPhase::Error(ErrorStage::Handler))
            .unwrap();

        let mut collector = ShimMetricsCollector::new(RequestId::from_string("r2"));
        collector.record_error(ErrorStage::Handler, "panicked");
        collector.record_status(500);
        let metrics = collector.finalize(&tracker);

        assert!(metrics.used_fallback());
        assert_eq!(metrics.error_stage.as_deref(), Some("handler"));
        assert!(metrics.handler_us.is_none());

        let json: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(json["error_kind"], "panicked");
        assert_eq!(json["status_code"], 500);
    }

    #[test]
    fn test_metrics_log_collects() {
        let log = MetricsLog::new();
        let tracker = PhaseTracker::new();
        log.record(ShimMetricsCollector::new(RequestId::generate()).finalize(&tracker));
        assert_eq!(log.len(), 1);
    }
}
