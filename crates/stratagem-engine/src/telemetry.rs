//! Structured engine events.
//!
//! Engines never log through a global logger; they collect canonical,
//! serializable events that the transport or binary decides how to emit.
//! Fields are stable: dashboards and replay tooling key off them.

use serde::{Deserialize, Serialize};

/// Canonical structured log event emitted by engine calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineEvent {
    /// Caller-supplied analysis-run identifier.
    pub run_id: String,
    /// Emitting component name (each module's `*_COMPONENT` constant).
    pub component: String,
    /// Event name, snake_case, stable.
    pub event: String,
    /// Human-readable outcome summary.
    pub outcome: String,
    /// Stable error code when the event records a failure.
    pub error_code: Option<String>,
}

impl EngineEvent {
    pub fn new(
        run_id: impl Into<String>,
        component: impl Into<String>,
        event: impl Into<String>,
        outcome: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            component: component.into(),
            event: event.into(),
            outcome: outcome.into(),
            error_code: None,
        }
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }
}
