pub mod clock;
mod session;
mod stage;
mod state;
pub mod voice;

#[cfg(test)]
mod session_tests;

pub use clock::ClockTick;
pub use session::SessionController;
pub use stage::{
    duration_of, BreathingStage, DurationInput, DurationInputs, StageDurations, DEFAULT_STAGE_SECS,
};
pub use state::{total_count_in_cycle, SessionState, StopReason};
pub use voice::{advance_count, pacing_delay, ANNOUNCEMENT_GAP};
