//! # Prana Core Library
//!
//! Core logic for the Prana guided breathing timer. The CLI and any GUI shell
//! are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Breathing Engine**: a fixed four-stage cycle driven by two tokio
//!   tasks, a one-second countdown clock and an independently paced voice
//!   counter, both owned by a [`SessionController`]
//! - **Services**: injected collaborators for speech, background sound and
//!   telemetry
//! - **Storage**: TOML settings and an SQLite session log
//!
//! ## Key Components
//!
//! - [`SessionController`]: starts, stops and observes breathing sessions
//! - [`BreathingStage`]: the stage sequencer
//! - [`Settings`]: persisted session configuration
//! - [`SessionLog`]: session history and statistics

pub mod breathing;
pub mod error;
pub mod events;
pub mod services;
pub mod storage;

pub use breathing::{
    BreathingStage, DurationInput, DurationInputs, SessionController, SessionState,
    StageDurations, StopReason,
};
pub use error::{ConfigError, CoreError, DatabaseError, ServiceError, ValidationError};
pub use events::Event;
pub use services::{AmbientAudio, Announcer, Services, TelemetrySink};
pub use storage::{SessionLog, Settings, SettingsStore, TomlSettingsStore};
