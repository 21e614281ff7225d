//! Collaborators that do nothing, for headless runs and tests.

use crate::error::ServiceError;
use crate::events::Event;

use super::traits::{AmbientAudio, Announcer, TelemetrySink};

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnnouncer;

impl Announcer for NoopAnnouncer {
    fn speak(&self, _text: &str) -> Result<(), ServiceError> {
        Ok(())
    }

    fn set_rate(&self, _rate: f32) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAmbientAudio;

impl AmbientAudio for NoopAmbientAudio {
    fn start(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn pause(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn set_volume(&self, _volume: f32) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record(&self, _event: &Event) {}
}
