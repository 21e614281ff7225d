//! Countdown clock.
//!
//! Runs once per second while a session is active. Each tick decrements the
//! remaining time of the current stage, ends the session when the practice
//! deadline has passed, and otherwise moves to the next stage when the
//! current one runs out.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use uuid::Uuid;

use super::session::Shared;
use super::stage::{duration_of, BreathingStage, StageDurations};
use super::state::{SessionState, StopReason};

pub(crate) const TICK: Duration = Duration::from_secs(1);

/// Result of one clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockTick {
    /// Stage entered on this tick, if any.
    pub entered: Option<BreathingStage>,
    /// Set when the session must end.
    pub stop: Option<StopReason>,
}

/// Apply one second to `state`.
///
/// `cycle_limit` ends the session on the wrap back to Inhale once either
/// the voice counter's `cycle_count` or the clock's own `completed_cycles`
/// has reached it.
pub fn tick(
    state: &mut SessionState,
    durations: &StageDurations,
    cycle_limit: u32,
    past_deadline: bool,
) -> ClockTick {
    state.remaining_seconds = state.remaining_seconds.saturating_sub(1);
    state.elapsed_seconds += 1;

    if past_deadline {
        return ClockTick {
            entered: None,
            stop: Some(StopReason::DeadlineReached),
        };
    }

    if state.remaining_seconds > 0 {
        return ClockTick::default();
    }

    let next = state.current_stage.next();
    state.current_stage = next;
    state.remaining_seconds = duration_of(next, durations);

    let mut stop = None;
    if next == BreathingStage::Inhale {
        state.completed_cycles += 1;
        if state.cycle_count >= cycle_limit || state.completed_cycles >= cycle_limit {
            stop = Some(StopReason::CyclesCompleted);
        }
    }

    ClockTick {
        entered: Some(next),
        stop,
    }
}

/// Clock task body. Exits when the run it was spawned for is no longer the
/// active one, or after triggering a stop.
pub(crate) async fn run(shared: Arc<Shared>, run_id: Uuid) {
    let mut interval = time::interval_at(Instant::now() + TICK, TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let Some(outcome) = shared.clock_tick(run_id, Instant::now()) else {
            return;
        };

        if let Some(stage) = outcome.entered {
            shared.record_stage_change(run_id, stage);
        }

        if let Some(reason) = outcome.stop {
            shared.stop_run(run_id, reason);
            return;
        }
    }
}
