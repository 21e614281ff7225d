//! Session controller.
//!
//! Owns the observable [`SessionState`], the duration inputs, the settings
//! and the injected collaborators. Starting a session spawns the countdown
//! clock and, when voice guidance is on, the voice counter as tokio tasks.
//! Both tasks write state only through [`Shared`], which serializes every
//! mutation behind one mutex and republishes the result on a watch channel.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Idle
//! ```
//!
//! A session returns to idle on `stop`, when the practice deadline passes,
//! or when the configured number of cycles completes. There is no paused
//! state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use super::clock::{self, ClockTick};
use super::stage::{BreathingStage, DurationInputs, StageDurations};
use super::state::{SessionState, StopReason};
use super::voice::{self, VoiceNext, VoiceStep};
use crate::error::Result;
use crate::events::Event;
use crate::services::Services;
use crate::storage::settings::{
    BreathingSettings, Settings, SettingsStore, MAX_VOICE_SPEED, MIN_VOICE_SPEED,
};

/// Everything behind the controller's lock.
struct Inner {
    state: SessionState,
    inputs: DurationInputs,
    settings: Settings,
    run: Option<ActiveRun>,
}

/// Bookkeeping for the session currently running.
struct ActiveRun {
    id: Uuid,
    /// Durations and settings are frozen for the length of the run.
    durations: StageDurations,
    breathing: BreathingSettings,
    ends_at: Instant,
    clock: JoinHandle<()>,
    voice: Option<JoinHandle<()>>,
}

impl ActiveRun {
    fn abort(&self) {
        self.clock.abort();
        if let Some(voice) = &self.voice {
            voice.abort();
        }
    }
}

/// State shared between the controller and its two tasks.
pub(crate) struct Shared {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SessionState>,
    services: Mutex<Option<Services>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn services(&self) -> Option<Services> {
        self.services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, state: &SessionState) {
        self.state_tx.send_replace(state.clone());
    }

    /// Apply one clock tick to run `run_id`. `None` means the run is over.
    pub(crate) fn clock_tick(&self, run_id: Uuid, now: Instant) -> Option<ClockTick> {
        let mut guard = self.lock();
        let Inner { state, run, .. } = &mut *guard;
        let run = run.as_ref().filter(|run| run.id == run_id)?;

        let outcome = clock::tick(
            state,
            &run.durations,
            run.breathing.breathing_cycles,
            now > run.ends_at,
        );
        self.publish(state);
        Some(outcome)
    }

    pub(crate) fn record_stage_change(&self, run_id: Uuid, stage: BreathingStage) {
        tracing::info!(%run_id, stage = stage.label(), "stage changed");
        if let Some(services) = self.services() {
            services
                .telemetry
                .record(&Event::stage_changed(run_id, stage));
        }
    }

    /// Read what the voice counter should do next.
    pub(crate) fn voice_step(&self, run_id: Uuid, now: Instant) -> VoiceNext {
        let guard = self.lock();
        let Some(run) = guard.run.as_ref().filter(|run| run.id == run_id) else {
            return VoiceNext::Exit;
        };
        if !guard.state.is_running {
            return VoiceNext::Exit;
        }
        if now >= run.ends_at {
            return VoiceNext::Stop(StopReason::DeadlineReached);
        }

        let stage = guard.state.current_stage;
        VoiceNext::Speak(VoiceStep {
            stage,
            count: guard.state.current_count,
            pace: voice::pacing_delay(stage, &run.durations, run.breathing.base_count),
        })
    }

    /// Advance the voice count. `Some(true)` once the cycle limit is passed.
    pub(crate) fn voice_advance(&self, run_id: Uuid) -> Option<bool> {
        let mut guard = self.lock();
        let Inner { state, run, .. } = &mut *guard;
        let run = run.as_ref().filter(|run| run.id == run_id)?;

        let exhausted = voice::advance_count(state, run.breathing.breathing_cycles);
        self.publish(state);
        Some(exhausted)
    }

    /// Speak `text`, logging and swallowing any failure.
    pub(crate) fn announce(&self, text: &str) {
        let Some(services) = self.services() else {
            return;
        };
        if let Err(err) = services.announcer.speak(text) {
            tracing::warn!(%err, text, "announcement failed");
        }
    }

    /// Stop the session only if `run_id` is still the active run.
    pub(crate) fn stop_run(&self, run_id: Uuid, reason: StopReason) {
        let guard = self.lock();
        if guard.run.as_ref().is_some_and(|run| run.id == run_id) {
            self.finish(guard, reason);
        }
    }

    /// Stop whatever is running. Safe to call when idle.
    fn stop(&self, reason: StopReason) {
        let guard = self.lock();
        self.finish(guard, reason);
    }

    fn finish(&self, mut guard: MutexGuard<'_, Inner>, reason: StopReason) {
        let run = guard.run.take();
        guard.state.is_running = false;
        let elapsed = guard.state.elapsed_seconds;
        self.publish(&guard.state);
        drop(guard);

        if let Some(run) = &run {
            run.abort();
        }

        let Some(services) = self.services() else {
            return;
        };
        if let Err(err) = services.ambient.pause() {
            tracing::warn!(%err, "failed to pause ambient audio");
        }
        if let Some(run) = run {
            tracing::info!(run_id = %run.id, elapsed_secs = elapsed, ?reason, "session stopped");
            services
                .telemetry
                .record(&Event::session_stopped(run.id, elapsed, reason));
        }
    }
}

/// Drives breathing sessions.
///
/// Must be used from within a tokio runtime for `start` to spawn its tasks.
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    /// Build a controller from settings and collaborators.
    ///
    /// The announcer's rate and the ambient volume are initialized from the
    /// settings.
    pub fn new(settings: Settings, services: Services) -> Self {
        let settings = settings.sanitized();
        let state = SessionState::idle(settings.breathing.base_count);
        let (state_tx, _) = watch::channel(state.clone());

        if let Err(err) = services.announcer.set_rate(settings.breathing.voice_speed) {
            tracing::warn!(%err, "failed to set announcer rate");
        }
        if let Err(err) = services.ambient.set_volume(settings.audio.background_volume) {
            tracing::warn!(%err, "failed to set ambient volume");
        }

        let inner = Inner {
            state,
            inputs: DurationInputs::from(settings.durations),
            settings,
            run: None,
        };
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                state_tx,
                services: Mutex::new(Some(services)),
            }),
        }
    }

    /// Build a controller from persisted settings.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn from_store(store: &dyn SettingsStore, services: Services) -> Result<Self> {
        Ok(Self::new(store.load()?, services))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionState {
        self.shared.lock().state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().state.is_running
    }

    /// Receiver that sees every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn durations(&self) -> DurationInputs {
        self.shared.lock().inputs.clone()
    }

    pub fn settings(&self) -> Settings {
        self.shared.lock().settings.clone()
    }

    /// Id of the running session, if any.
    pub fn session_id(&self) -> Option<Uuid> {
        self.shared.lock().run.as_ref().map(|run| run.id)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Stop if running, start otherwise. Returns whether a session is now
    /// running.
    pub fn toggle_session(&self) -> bool {
        if self.is_running() {
            self.stop();
            false
        } else {
            self.start()
        }
    }

    /// Start a session.
    ///
    /// A no-op returning `false` if a session is already running, any
    /// duration field is not a positive number, or there is no tokio runtime.
    pub fn start(&self) -> bool {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(%err, "cannot start a session outside a tokio runtime");
                return false;
            }
        };

        let mut guard = self.shared.lock();
        if guard.run.is_some() {
            tracing::debug!("start ignored: session already running");
            return false;
        }
        let durations = match guard.inputs.validate() {
            Ok(durations) => durations,
            Err(err) => {
                tracing::debug!(%err, "start ignored: invalid durations");
                return false;
            }
        };

        let breathing = guard.settings.breathing.clone();
        let id = Uuid::new_v4();
        let ends_at =
            Instant::now() + Duration::from_secs(u64::from(breathing.practice_duration_min) * 60);

        guard.state = SessionState::begin(&durations, breathing.base_count);
        self.shared.publish(&guard.state);

        let clock = runtime.spawn(clock::run(Arc::clone(&self.shared), id));
        let voice = breathing
            .voice_guidance_enabled
            .then(|| runtime.spawn(voice::run(Arc::clone(&self.shared), id)));

        guard.run = Some(ActiveRun {
            id,
            durations,
            breathing,
            ends_at,
            clock,
            voice,
        });
        drop(guard);

        tracing::info!(
            run_id = %id,
            inhale = durations.inhale,
            hold = durations.hold,
            exhale = durations.exhale,
            silence = durations.silence,
            "session started"
        );
        if let Some(services) = self.shared.services() {
            services
                .telemetry
                .record(&Event::session_started(id, durations));
            if let Err(err) = services.ambient.start() {
                tracing::warn!(%err, "failed to start ambient audio");
            }
        }
        true
    }

    /// Stop the running session. Calling it while idle only re-pauses the
    /// ambient audio.
    pub fn stop(&self) {
        self.shared.stop(StopReason::User);
    }

    /// Replace the raw text of one duration field.
    ///
    /// Only the empty string or decimal digits are accepted; anything else is
    /// ignored and `false` is returned. Takes effect on the next start.
    pub fn update_duration(&self, stage: BreathingStage, raw: &str) -> bool {
        let accepted = self.shared.lock().inputs.get_mut(stage).set(raw);
        if !accepted {
            tracing::debug!(stage = stage.id(), raw, "rejected non-digit duration input");
        }
        accepted
    }

    /// Set the announcer speed, clamped to `[0.5, 2.0]`.
    pub fn set_voice_speed(&self, speed: f32) {
        let speed = speed.clamp(MIN_VOICE_SPEED, MAX_VOICE_SPEED);
        self.shared.lock().settings.breathing.voice_speed = speed;
        if let Some(services) = self.shared.services() {
            if let Err(err) = services.announcer.set_rate(speed) {
                tracing::warn!(%err, "failed to set announcer rate");
            }
        }
    }

    /// Set the background volume, clamped to `[0.0, 1.0]`.
    pub fn set_background_volume(&self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.shared.lock().settings.audio.background_volume = volume;
        if let Some(services) = self.shared.services() {
            if let Err(err) = services.ambient.set_volume(volume) {
                tracing::warn!(%err, "failed to set ambient volume");
            }
        }
    }

    /// Replace the session settings. Ignored while a session is running.
    pub fn apply_settings(&self, settings: Settings) -> bool {
        let settings = settings.sanitized();
        {
            let mut guard = self.shared.lock();
            if guard.run.is_some() {
                return false;
            }
            guard.state = SessionState::idle(settings.breathing.base_count);
            guard.inputs = DurationInputs::from(settings.durations);
            guard.settings = settings;
            self.shared.publish(&guard.state);
        }
        let settings = self.settings();
        self.set_voice_speed(settings.breathing.voice_speed);
        self.set_background_volume(settings.audio.background_volume);
        true
    }

    /// Persist the current settings, including the duration fields if they
    /// are all valid.
    ///
    /// # Errors
    /// Returns an error if the store rejects or fails to write the settings.
    pub fn save_settings(&self, store: &dyn SettingsStore) -> Result<()> {
        let settings = {
            let mut guard = self.shared.lock();
            if let Ok(durations) = guard.inputs.validate() {
                guard.settings.durations = durations;
            }
            guard.settings.clone()
        };
        store.save(&settings)
    }

    /// Stop any session and release the announcer and ambient audio.
    /// Later calls do nothing.
    pub fn shutdown(&self) {
        self.shared.stop(StopReason::Shutdown);
        let services = self
            .shared
            .services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(services) = services {
            services.announcer.release();
            services.ambient.release();
            tracing::debug!("session controller released its services");
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
