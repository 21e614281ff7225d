//! Collaborators the breathing engine talks to.
//!
//! Speech, background sound and telemetry are injected as trait objects and
//! owned by the session controller for its whole lifetime.

mod noop;
mod telemetry;
mod traits;

pub use noop::{NoopAmbientAudio, NoopAnnouncer, NoopTelemetry};
pub use telemetry::{FanOut, TracingTelemetry};
pub use traits::{AmbientAudio, Announcer, TelemetrySink};

use std::sync::Arc;

/// The set of collaborators handed to a session controller.
#[derive(Clone)]
pub struct Services {
    pub announcer: Arc<dyn Announcer>,
    pub ambient: Arc<dyn AmbientAudio>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

impl Services {
    pub fn new(
        announcer: Arc<dyn Announcer>,
        ambient: Arc<dyn AmbientAudio>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            announcer,
            ambient,
            telemetry,
        }
    }

    /// Silent collaborators with telemetry going to `tracing`.
    pub fn headless() -> Self {
        Self::new(
            Arc::new(NoopAnnouncer),
            Arc::new(NoopAmbientAudio),
            Arc::new(TracingTelemetry),
        )
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
