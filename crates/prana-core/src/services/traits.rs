use crate::error::ServiceError;
use crate::events::Event;

/// Speaks stage names and counts.
///
/// Calls are fire-and-forget. A new `speak` interrupts whatever is still
/// playing. Errors are logged by the caller and never retried.
pub trait Announcer: Send + Sync {
    fn speak(&self, text: &str) -> Result<(), ServiceError>;

    /// Playback speed multiplier in `[0.5, 2.0]`.
    fn set_rate(&self, rate: f32) -> Result<(), ServiceError>;

    /// Free the underlying engine. Called once on controller teardown.
    fn release(&self) {}
}

/// Looping background sound played during a session.
///
/// `start` and `pause` must be idempotent.
pub trait AmbientAudio: Send + Sync {
    fn start(&self) -> Result<(), ServiceError>;

    fn pause(&self) -> Result<(), ServiceError>;

    /// Volume in `[0.0, 1.0]`.
    fn set_volume(&self, volume: f32) -> Result<(), ServiceError>;

    fn release(&self) {}
}

/// Receives session telemetry. No response is expected.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: &Event);
}
