//! Match tracing for diagnostics
//!
//! When enabled on a [`Matcher`](super::Matcher), every rule attempt and its
//! outcome is recorded here and mirrored to the `tracing` facade at TRACE
//! level. The trace is consumed by diagnostics tooling; the engine's
//! functional behavior never depends on it.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOutcome {
    Attempt,
    Matched { end: usize },
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    pub rule: String,
    pub position: usize,
    pub depth: usize,
    pub outcome: TraceOutcome,
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = "  ".repeat(self.depth);
        match self.outcome {
            TraceOutcome::Attempt => write!(f, "{}{} @{} ?", indent, self.rule, self.position),
            TraceOutcome::Matched { end } => {
                write!(f, "{}{} @{}..{} ok", indent, self.rule, self.position, end)
            }
            TraceOutcome::Failed => write!(f, "{}{} @{} fail", indent, self.rule, self.position),
        }
    }
}

/// Recorded rule attempts, in match order.
#[derive(Debug, Clone, Default)]
pub struct MatchTrace {
    events: Vec<TraceEvent>,
}

impl MatchTrace {
    pub(crate) fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl fmt::Display for MatchTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in &self.events {
            writeln!(f, "{event}")?;
        }
        Ok(())
    }
}
