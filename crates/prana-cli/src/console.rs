//! Terminal stand-ins for the speech engine and background sound.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use prana_core::{AmbientAudio, Announcer, ServiceError};

/// Prints announcements to stdout instead of speaking them.
#[derive(Debug, Default)]
pub struct ConsoleAnnouncer {
    rate: Mutex<f32>,
}

impl Announcer for ConsoleAnnouncer {
    fn speak(&self, text: &str) -> Result<(), ServiceError> {
        println!("  » {text}");
        Ok(())
    }

    fn set_rate(&self, rate: f32) -> Result<(), ServiceError> {
        let mut current = self.rate.lock().map_err(|e| ServiceError::Failed {
            service: "console announcer".into(),
            message: e.to_string(),
        })?;
        *current = rate;
        tracing::debug!(rate, "announcer rate set");
        Ok(())
    }
}

/// Tracks whether background sound would be playing and logs transitions.
#[derive(Debug, Default)]
pub struct ConsoleAmbience {
    playing: AtomicBool,
}

impl AmbientAudio for ConsoleAmbience {
    fn start(&self) -> Result<(), ServiceError> {
        if !self.playing.swap(true, Ordering::SeqCst) {
            tracing::debug!("ambient sound started");
        }
        Ok(())
    }

    fn pause(&self) -> Result<(), ServiceError> {
        if self.playing.swap(false, Ordering::SeqCst) {
            tracing::debug!("ambient sound paused");
        }
        Ok(())
    }

    fn set_volume(&self, volume: f32) -> Result<(), ServiceError> {
        tracing::debug!(volume, "ambient volume set");
        Ok(())
    }
}
