//! Voice counting process.
//!
//! Paced independently of the countdown clock: each iteration announces the
//! stage name, pauses briefly, announces the count, then sleeps for the
//! stage duration divided into `base_count` slots. A stage change made by the
//! clock is picked up at the top of the next iteration.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};
use uuid::Uuid;

use super::session::Shared;
use super::stage::{duration_of, BreathingStage, StageDurations};
use super::state::{SessionState, StopReason};

/// Gap between the stage name and the number so the two don't overlap.
pub const ANNOUNCEMENT_GAP: Duration = Duration::from_millis(500);

/// Delay after a count announcement: the configured stage duration split
/// into `base_count` equal slots, regardless of how many seconds remain.
pub fn pacing_delay(stage: BreathingStage, durations: &StageDurations, base_count: u32) -> Duration {
    let stage_ms = u64::from(duration_of(stage, durations)) * 1000;
    Duration::from_millis(stage_ms / u64::from(base_count.max(1)))
}

/// Move to the next count. Returns `true` once `cycle_count` has passed
/// `cycle_limit`.
pub fn advance_count(state: &mut SessionState, cycle_limit: u32) -> bool {
    state.current_count += 1;
    if state.current_count > state.total_count_in_cycle {
        state.current_count = 1;
        state.cycle_count += 1;
        return state.cycle_count > cycle_limit;
    }
    false
}

/// What one iteration needs, read under the lock at its top.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VoiceStep {
    pub stage: BreathingStage,
    pub count: u32,
    pub pace: Duration,
}

pub(crate) enum VoiceNext {
    Speak(VoiceStep),
    /// The counter noticed the session has to end.
    Stop(StopReason),
    /// The run is gone.
    Exit,
}

/// Voice task body.
pub(crate) async fn run(shared: Arc<Shared>, run_id: Uuid) {
    loop {
        let step = match shared.voice_step(run_id, Instant::now()) {
            VoiceNext::Speak(step) => step,
            VoiceNext::Stop(reason) => {
                shared.stop_run(run_id, reason);
                return;
            }
            VoiceNext::Exit => return,
        };

        shared.announce(step.stage.label());
        time::sleep(ANNOUNCEMENT_GAP).await;
        shared.announce(&step.count.to_string());
        time::sleep(step.pace).await;

        match shared.voice_advance(run_id) {
            Some(false) => continue,
            Some(true) => {
                tracing::info!(%run_id, "voice counter finished all cycles");
                shared.stop_run(run_id, StopReason::CyclesCompleted);
                return;
            }
            None => return,
        }
    }
}
