use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::breathing::{BreathingStage, StageDurations, StopReason};

/// Telemetry emitted by a breathing session.
/// Every event carries the id of the session that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        durations: StageDurations,
        at: DateTime<Utc>,
    },
    StageChanged {
        session_id: Uuid,
        stage: BreathingStage,
        at: DateTime<Utc>,
    },
    SessionStopped {
        session_id: Uuid,
        elapsed_secs: u64,
        reason: StopReason,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn session_started(session_id: Uuid, durations: StageDurations) -> Self {
        Event::SessionStarted {
            session_id,
            durations,
            at: Utc::now(),
        }
    }

    pub fn stage_changed(session_id: Uuid, stage: BreathingStage) -> Self {
        Event::StageChanged {
            session_id,
            stage,
            at: Utc::now(),
        }
    }

    pub fn session_stopped(session_id: Uuid, elapsed_secs: u64, reason: StopReason) -> Self {
        Event::SessionStopped {
            session_id,
            elapsed_secs,
            reason,
            at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        match self {
            Event::SessionStarted { session_id, .. }
            | Event::StageChanged { session_id, .. }
            | Event::SessionStopped { session_id, .. } => *session_id,
        }
    }

    /// Short machine name, matches the serde tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SessionStarted { .. } => "SessionStarted",
            Event::StageChanged { .. } => "StageChanged",
            Event::SessionStopped { .. } => "SessionStopped",
        }
    }
}
