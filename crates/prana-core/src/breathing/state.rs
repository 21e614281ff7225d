use serde::{Deserialize, Serialize};

use super::stage::{duration_of, BreathingStage, StageDurations};

/// Observable state of a breathing session.
///
/// The countdown clock owns `current_stage`, `remaining_seconds`,
/// `completed_cycles` and `elapsed_seconds`; the voice counter owns
/// `current_count` and `cycle_count`. `start` resets all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub is_running: bool,
    pub current_stage: BreathingStage,
    pub remaining_seconds: u32,
    /// 1-based position within `total_count_in_cycle`.
    pub current_count: u32,
    pub total_count_in_cycle: u32,
    /// 1-based cycle the voice counter is in.
    pub cycle_count: u32,
    /// Wraparounds back to Inhale seen by the clock.
    pub completed_cycles: u32,
    pub elapsed_seconds: u64,
}

impl SessionState {
    /// Idle state for a given base count.
    pub fn idle(base_count: u32) -> Self {
        Self {
            is_running: false,
            current_stage: BreathingStage::Inhale,
            remaining_seconds: 0,
            current_count: 1,
            total_count_in_cycle: total_count_in_cycle(base_count),
            cycle_count: 1,
            completed_cycles: 0,
            elapsed_seconds: 0,
        }
    }

    /// Fresh running state at the top of Inhale.
    pub fn begin(durations: &StageDurations, base_count: u32) -> Self {
        Self {
            is_running: true,
            remaining_seconds: duration_of(BreathingStage::Inhale, durations),
            ..Self::idle(base_count)
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::idle(crate::storage::settings::DEFAULT_BASE_COUNT)
    }
}

/// Announcement slots in one full cycle.
pub fn total_count_in_cycle(base_count: u32) -> u32 {
    base_count.max(1).saturating_mul(BreathingStage::ALL.len() as u32)
}

/// Why a session went back to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Explicit stop or toggle-off.
    User,
    /// The practice duration ran out.
    DeadlineReached,
    /// The configured number of breathing cycles finished.
    CyclesCompleted,
    /// The controller was torn down.
    Shutdown,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::User => "user",
            StopReason::DeadlineReached => "deadline_reached",
            StopReason::CyclesCompleted => "cycles_completed",
            StopReason::Shutdown => "shutdown",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [
            StopReason::User,
            StopReason::DeadlineReached,
            StopReason::CyclesCompleted,
            StopReason::Shutdown,
        ]
        .into_iter()
        .find(|reason| reason.as_str() == raw)
    }
}
