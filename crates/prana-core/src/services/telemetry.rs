//! Telemetry sinks that ship with the core.

use std::sync::Arc;

use crate::events::Event;

use super::traits::TelemetrySink;

/// Writes every event to the `tracing` subscriber as structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record(&self, event: &Event) {
        match event {
            Event::SessionStarted {
                session_id,
                durations,
                ..
            } => tracing::info!(
                target: "prana::telemetry",
                %session_id,
                inhale = durations.inhale,
                hold = durations.hold,
                exhale = durations.exhale,
                silence = durations.silence,
                "session started"
            ),
            Event::StageChanged {
                session_id, stage, ..
            } => tracing::info!(
                target: "prana::telemetry",
                %session_id,
                stage = stage.label(),
                "stage changed"
            ),
            Event::SessionStopped {
                session_id,
                elapsed_secs,
                reason,
                ..
            } => tracing::info!(
                target: "prana::telemetry",
                %session_id,
                elapsed_secs,
                ?reason,
                "session stopped"
            ),
        }
    }
}

/// Forwards each event to several sinks in order.
#[derive(Clone, Default)]
pub struct FanOut {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl TelemetrySink for FanOut {
    fn record(&self, event: &Event) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
