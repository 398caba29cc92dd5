//! Per-request shim lifecycle tracking.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Stage at which a request left the happy path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStage {
    /// Host request could not be normalized.
    TranslateIn,
    /// The render entry failed, panicked or was cancelled.
    Handler,
    /// Entry response could not be expressed in the host's types.
    TranslateOut,
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TranslateIn => write!(f, "translate-in"),
            Self::Handler => write!(f, "handler"),
            Self::TranslateOut => write!(f, "translate-out"),
        }
    }
}

/// Lifecycle phases for a request passing through a runtime shim.
///
/// `Received → TranslatedIn → HandlerInvoked → TranslatedOut → Sent`.
/// `Error` is reachable from any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShimPhase {
    Received,
    TranslatedIn,
    HandlerInvoked,
    TranslatedOut,
    Sent,
    Error(ErrorStage),
}

impl ShimPhase {
    /// Whether moving from `self` to `next` is legal.
    pub fn can_advance_to(&self, next: ShimPhase) -> bool {
        use ShimPhase::*;
        matches!(
            (*self, next),
            (Received, TranslatedIn)
                | (TranslatedIn, HandlerInvoked)
                | (HandlerInvoked, TranslatedOut)
                | (TranslatedOut, Sent)
                | (Received | TranslatedIn | HandlerInvoked | TranslatedOut, Error(_))
        )
    }

    /// Whether this phase ends the request.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Error(_))
    }

    /// Timing mark name for this phase.
    pub fn mark_name(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::TranslatedIn => "translated_in",
            Self::HandlerInvoked => "handler_invoked",
            Self::TranslatedOut => "translated_out",
            Self::Sent => "sent",
            Self::Error(_) => "error",
        }
    }
}

/// Rejected phase transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal shim transition {from:?} -> {to:?}")]
pub struct IllegalTransition {
    pub from: ShimPhase,
    pub to: ShimPhase,
}

/// Timing context for observability.
#[derive(Debug, Clone)]
pub struct TimingContext {
    start: Instant,
    marks: HashMap<String, Instant>,
}

impl TimingContext {
    /// Create a new timing context.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: HashMap::new(),
        }
    }

    /// Record a timing mark.
    pub fn mark(&mut self, name: &str) {
        self.marks.insert(name.to_string(), Instant::now());
    }

    /// Time from start to a recorded mark.
    pub fn since_start(&self, name: &str) -> Option<Duration> {
        self.marks.get(name).map(|t| t.duration_since(self.start))
    }

    /// Time between two recorded marks.
    pub fn between(&self, from: &str, to: &str) -> Option<Duration> {
        let from = self.marks.get(from)?;
        let to = self.marks.get(to)?;
        Some(to.saturating_duration_since(*from))
    }

    /// Get elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for TimingContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks the phase of one request and enforces legal transitions.
#[derive(Debug)]
pub struct PhaseTracker {
    phase: ShimPhase,
    timing: TimingContext,
    history: Vec<ShimPhase>,
}

impl PhaseTracker {
    /// Start tracking a freshly received request.
    pub fn new() -> Self {
        let mut timing = TimingContext::new();
        timing.mark(ShimPhase::Received.mark_name());
        Self {
            phase: ShimPhase::Received,
            timing,
            history: vec![ShimPhase::Received],
        }
    }

    /// Move to the next phase.
    pub fn advance(&mut self, next: ShimPhase) -> Result<(), IllegalTransition> {
        if !self.phase.can_advance_to(next) {
            return Err(IllegalTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        self.timing.mark(next.mark_name());
        self.history.push(next);
        Ok(())
    }

    /// Current phase.
    pub fn phase(&self) -> ShimPhase {
        self.phase
    }

    /// Phases visited so far, in order.
    pub fn history(&self) -> &[ShimPhase] {
        &self.history
    }

    /// Timing marks.
    pub fn timing(&self) -> &TimingContext {
        &self.timing
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
