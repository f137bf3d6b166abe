//! Injectable side-channel for defensive-default anomalies.
//!
//! Getters that substitute a safe default for an unexpectedly absent value
//! report the substitution here instead of failing, so the anomaly stays
//! observable without affecting control flow.

use std::sync::Mutex;

/// One recorded anomaly: where it happened and what was missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub context: String,
    pub detail: String,
}

/// Receives anomaly reports from the store.
pub trait DiagnosticsSink: Send + Sync {
    fn emit(&self, context: &str, detail: &str);
}

/// Default sink: forwards anomalies to `tracing` at warn level.
#[derive(Debug, Default)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn emit(&self, context: &str, detail: &str) {
        tracing::warn!(context, detail, "expected value missing, substituting default");
    }
}

/// Capturing sink for tests: records every emission for later assertions.
#[derive(Debug, Default)]
pub struct CapturingDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl CapturingDiagnostics {
    /// Returns a snapshot of everything emitted so far.
    #[must_use]
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl DiagnosticsSink for CapturingDiagnostics {
    fn emit(&self, context: &str, detail: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(DiagnosticEvent {
                context: context.to_owned(),
                detail: detail.to_owned(),
            });
        }
    }
}
