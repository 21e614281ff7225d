//! Tests for the session controller. Timing runs on tokio's paused clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{BreathingStage, SessionController, StageDurations, StopReason};
use crate::error::ServiceError;
use crate::events::Event;
use crate::services::{AmbientAudio, Announcer, Services, TelemetrySink};
use crate::storage::settings::{MemorySettingsStore, Settings, SettingsStore};

#[derive(Default)]
struct RecordingAnnouncer {
    spoken: Mutex<Vec<String>>,
    rates: Mutex<Vec<f32>>,
    released: AtomicBool,
    failing: bool,
}

impl RecordingAnnouncer {
    fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl Announcer for RecordingAnnouncer {
    fn speak(&self, text: &str) -> Result<(), ServiceError> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.failing {
            return Err(ServiceError::Unavailable {
                service: "announcer".into(),
            });
        }
        Ok(())
    }

    fn set_rate(&self, rate: f32) -> Result<(), ServiceError> {
        self.rates.lock().unwrap().push(rate);
        Ok(())
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingAmbient {
    calls: Mutex<Vec<String>>,
    released: AtomicBool,
}

impl RecordingAmbient {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl AmbientAudio for RecordingAmbient {
    fn start(&self) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push("start".into());
        Ok(())
    }

    fn pause(&self) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push("pause".into());
        Ok(())
    }

    fn set_volume(&self, volume: f32) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(format!("volume {volume}"));
        Ok(())
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingTelemetry(Mutex<Vec<Event>>);

impl RecordingTelemetry {
    fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    fn stops(&self) -> Vec<(u64, StopReason)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::SessionStopped {
                    elapsed_secs,
                    reason,
                    ..
                } => Some((elapsed_secs, reason)),
                _ => None,
            })
            .collect()
    }

    fn stages(&self) -> Vec<BreathingStage> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::StageChanged { stage, .. } => Some(stage),
                _ => None,
            })
            .collect()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn record(&self, event: &Event) {
        self.0.lock().unwrap().push(event.clone());
    }
}

struct Harness {
    controller: SessionController,
    announcer: Arc<RecordingAnnouncer>,
    ambient: Arc<RecordingAmbient>,
    telemetry: Arc<RecordingTelemetry>,
}

fn settings(base_count: u32, cycles: u32, minutes: u32, voice: bool) -> Settings {
    let mut settings = Settings::default();
    settings.breathing.base_count = base_count;
    settings.breathing.breathing_cycles = cycles;
    settings.breathing.practice_duration_min = minutes;
    settings.breathing.voice_guidance_enabled = voice;
    settings
}

fn harness_with(settings: Settings, announcer: RecordingAnnouncer) -> Harness {
    let announcer = Arc::new(announcer);
    let ambient = Arc::new(RecordingAmbient::default());
    let telemetry = Arc::new(RecordingTelemetry::default());
    let services = Services::new(announcer.clone(), ambient.clone(), telemetry.clone());
    Harness {
        controller: SessionController::new(settings, services),
        announcer,
        ambient,
        telemetry,
    }
}

fn harness(settings: Settings) -> Harness {
    harness_with(settings, RecordingAnnouncer::default())
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn start_with_invalid_duration_is_noop() {
    let h = harness(settings(5, 3, 10, true));

    assert!(h.controller.update_duration(BreathingStage::Hold, "0"));
    assert!(!h.controller.start());
    assert!(!h.controller.is_running());

    assert!(h.controller.update_duration(BreathingStage::Hold, ""));
    assert!(!h.controller.start());

    assert!(!h.controller.update_duration(BreathingStage::Hold, "abc"));
    assert!(!h.controller.start());

    assert!(h.telemetry.events().is_empty());
    assert!(h.announcer.spoken().is_empty());
    assert!(h.controller.session_id().is_none());
}

#[tokio::test(start_paused = true)]
async fn valid_start_initializes_state() {
    let h = harness(settings(5, 3, 10, true));
    h.controller.update_duration(BreathingStage::Inhale, "6");

    assert!(h.controller.start());

    let state = h.controller.snapshot();
    assert!(state.is_running);
    assert_eq!(state.current_stage, BreathingStage::Inhale);
    assert_eq!(state.remaining_seconds, 6);
    assert_eq!(state.current_count, 1);
    assert_eq!(state.cycle_count, 1);
    assert_eq!(state.total_count_in_cycle, 20);

    match h.telemetry.events().first() {
        Some(Event::SessionStarted { durations, .. }) => {
            assert_eq!(
                *durations,
                StageDurations {
                    inhale: 6,
                    hold: 4,
                    exhale: 4,
                    silence: 4,
                }
            );
        }
        other => panic!("expected SessionStarted, got {other:?}"),
    }
    assert_eq!(h.ambient.calls().last().map(String::as_str), Some("start"));
    assert!(!h.controller.start(), "second start must be ignored");
}

#[tokio::test(start_paused = true)]
async fn single_cycle_stops_on_return_to_inhale() {
    let h = harness(settings(5, 1, 10, false));
    assert!(h.controller.start());

    sleep_ms(15_500).await;
    let state = h.controller.snapshot();
    assert!(state.is_running);
    assert_eq!(state.current_stage, BreathingStage::Silence);

    sleep_ms(1_000).await;
    let state = h.controller.snapshot();
    assert!(!state.is_running);
    assert_eq!(state.current_stage, BreathingStage::Inhale);
    assert_eq!(
        h.telemetry.stages(),
        vec![
            BreathingStage::Hold,
            BreathingStage::Exhale,
            BreathingStage::Silence,
            BreathingStage::Inhale,
        ]
    );
    assert_eq!(h.telemetry.stops(), vec![(16, StopReason::CyclesCompleted)]);
    assert_eq!(h.ambient.calls(), vec!["volume 0.5", "start", "pause"]);
}

#[tokio::test(start_paused = true)]
async fn three_cycles_stop_by_fourth_inhale() {
    let h = harness(settings(5, 3, 10, true));
    assert!(h.controller.start());

    sleep_ms(47_500).await;
    assert!(h.controller.is_running());

    sleep_ms(1_000).await;
    assert!(!h.controller.is_running());
    assert_eq!(h.telemetry.stops(), vec![(48, StopReason::CyclesCompleted)]);
    let inhales = h
        .telemetry
        .stages()
        .into_iter()
        .filter(|stage| *stage == BreathingStage::Inhale)
        .count();
    assert_eq!(inhales, 3);
}

#[tokio::test(start_paused = true)]
async fn voice_announces_stage_then_count() {
    let h = harness(settings(5, 3, 10, true));
    assert!(h.controller.start());

    sleep_ms(6_000).await;

    // Pace is 500 ms gap + 800 ms per count; the clock enters Hold at 4 s and
    // the counter picks it up on its iteration at 5.2 s.
    assert_eq!(
        h.announcer.spoken(),
        vec!["Inhale", "1", "Inhale", "2", "Inhale", "3", "Inhale", "4", "Hold", "5"]
    );
    assert_eq!(h.controller.snapshot().current_count, 5);
}

#[tokio::test(start_paused = true)]
async fn voice_disabled_stays_silent() {
    let h = harness(settings(5, 3, 10, false));
    assert!(h.controller.start());
    sleep_ms(5_000).await;
    assert!(h.announcer.spoken().is_empty());
    assert_eq!(h.controller.snapshot().current_count, 1);
}

#[tokio::test(start_paused = true)]
async fn failing_announcer_does_not_stall_counting() {
    let h = harness_with(settings(5, 3, 10, true), RecordingAnnouncer::failing());
    assert!(h.controller.start());

    sleep_ms(2_700).await;

    assert_eq!(h.controller.snapshot().current_count, 3);
    assert!(h.controller.is_running());
    assert_eq!(h.announcer.spoken().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn deadline_stops_session() {
    let mut s = settings(5, 100, 1, false);
    s.durations = StageDurations::uniform(7);
    let h = harness(s);
    assert!(h.controller.start());

    sleep_ms(60_500).await;
    assert!(h.controller.is_running());

    sleep_ms(1_000).await;
    assert!(!h.controller.is_running());
    assert_eq!(h.telemetry.stops(), vec![(61, StopReason::DeadlineReached)]);
}

#[tokio::test(start_paused = true)]
async fn voice_counter_stops_at_deadline_before_clock() {
    let mut s = settings(5, 100, 1, true);
    s.durations = StageDurations::uniform(7);
    let h = harness(s);
    assert!(h.controller.start());

    // Iterations take 1.9 s; the one starting at 60.8 s sees the deadline
    // before the clock's 61 s tick.
    sleep_ms(60_500).await;
    assert!(h.controller.is_running());

    sleep_ms(1_500).await;
    assert!(!h.controller.is_running());
    assert_eq!(h.telemetry.stops(), vec![(60, StopReason::DeadlineReached)]);
}

#[tokio::test(start_paused = true)]
async fn stop_twice_is_safe() {
    let h = harness(settings(5, 3, 10, true));
    assert!(h.controller.start());
    sleep_ms(2_500).await;

    h.controller.stop();
    assert!(!h.controller.is_running());
    h.controller.stop();
    assert!(!h.controller.is_running());

    assert_eq!(h.telemetry.stops(), vec![(2, StopReason::User)]);
    let pauses = h.ambient.calls().iter().filter(|c| *c == "pause").count();
    assert_eq!(pauses, 2);
}

#[tokio::test(start_paused = true)]
async fn stopped_session_is_not_mutated() {
    let h = harness(settings(5, 3, 10, true));
    assert!(h.controller.start());
    sleep_ms(2_200).await;
    h.controller.stop();

    let frozen = h.controller.snapshot();
    let spoken = h.announcer.spoken().len();
    sleep_ms(10_000).await;

    assert_eq!(h.controller.snapshot(), frozen);
    assert_eq!(h.announcer.spoken().len(), spoken);
}

#[tokio::test(start_paused = true)]
async fn toggle_flips_between_idle_and_running() {
    let h = harness(settings(5, 3, 10, true));
    assert!(h.controller.toggle_session());
    assert!(h.controller.is_running());
    assert!(!h.controller.toggle_session());
    assert!(!h.controller.is_running());
    assert!(h.controller.toggle_session());
}

#[tokio::test(start_paused = true)]
async fn restart_resets_counters() {
    let h = harness(settings(5, 3, 10, true));
    assert!(h.controller.start());
    sleep_ms(9_000).await;
    h.controller.stop();
    assert!(h.controller.session_id().is_none());
    assert!(h.controller.snapshot().elapsed_seconds > 0);

    assert!(h.controller.start());
    let state = h.controller.snapshot();
    assert_eq!(state.current_count, 1);
    assert_eq!(state.cycle_count, 1);
    assert_eq!(state.elapsed_seconds, 0);
    assert_eq!(state.current_stage, BreathingStage::Inhale);
}

#[tokio::test(start_paused = true)]
async fn edits_during_a_session_apply_to_the_next_one() {
    let h = harness(settings(5, 3, 10, false));
    assert!(h.controller.start());
    assert!(h.controller.update_duration(BreathingStage::Hold, "9"));

    sleep_ms(4_500).await;
    let state = h.controller.snapshot();
    assert_eq!(state.current_stage, BreathingStage::Hold);
    assert_eq!(state.remaining_seconds, 4);
    assert_eq!(h.controller.durations().hold.as_str(), "9");
}

#[tokio::test(start_paused = true)]
async fn subscribers_observe_changes() {
    let h = harness(settings(5, 3, 10, false));
    let mut rx = h.controller.subscribe();
    assert!(!rx.borrow_and_update().is_running);

    assert!(h.controller.start());
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().is_running);

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().remaining_seconds, 3);

    h.controller.stop();
    assert!(!rx.borrow_and_update().is_running);
}

#[tokio::test(start_paused = true)]
async fn drop_releases_services_and_stops() {
    let h = harness(settings(5, 3, 10, true));
    assert!(h.controller.start());
    sleep_ms(1_500).await;

    let Harness {
        controller,
        announcer,
        ambient,
        telemetry,
    } = h;
    drop(controller);

    assert!(announcer.released.load(Ordering::SeqCst));
    assert!(ambient.released.load(Ordering::SeqCst));
    assert_eq!(telemetry.stops(), vec![(1, StopReason::Shutdown)]);

    let spoken = announcer.spoken().len();
    sleep_ms(5_000).await;
    assert_eq!(announcer.spoken().len(), spoken);
}

#[tokio::test(start_paused = true)]
async fn voice_speed_and_volume_are_clamped_and_forwarded() {
    let h = harness(settings(5, 3, 10, true));
    h.controller.set_voice_speed(3.0);
    h.controller.set_background_volume(-0.2);

    assert_eq!(h.announcer.rates.lock().unwrap().last(), Some(&2.0));
    assert_eq!(h.ambient.calls().last().map(String::as_str), Some("volume 0"));
    let s = h.controller.settings();
    assert_eq!(s.breathing.voice_speed, 2.0);
    assert_eq!(s.audio.background_volume, 0.0);
}

#[test]
fn rejected_edit_keeps_previous_text() {
    let h = harness(Settings::default());
    assert!(h.controller.update_duration(BreathingStage::Hold, "12"));
    assert!(!h.controller.update_duration(BreathingStage::Hold, "1a2"));
    assert_eq!(h.controller.durations().hold.as_str(), "12");
}

#[test]
fn start_outside_runtime_is_noop() {
    let h = harness(Settings::default());
    assert!(!h.controller.start());
    assert!(!h.controller.is_running());
}

#[test]
fn save_settings_persists_valid_durations() {
    let store = MemorySettingsStore::default();
    let h = harness(Settings::default());
    h.controller.update_duration(BreathingStage::Exhale, "8");
    h.controller.set_voice_speed(1.25);
    h.controller.save_settings(&store).unwrap();

    let saved = store.load().unwrap();
    assert_eq!(saved.durations.exhale, 8);
    assert_eq!(saved.breathing.voice_speed, 1.25);

    h.controller.update_duration(BreathingStage::Exhale, "");
    h.controller.save_settings(&store).unwrap();
    assert_eq!(store.load().unwrap().durations.exhale, 8);
}

#[test]
fn apply_settings_resets_idle_controller() {
    let h = harness(Settings::default());
    let mut next = settings(3, 2, 5, false);
    next.durations.inhale = 10;
    assert!(h.controller.apply_settings(next));
    assert_eq!(h.controller.durations().inhale.as_str(), "10");
    assert_eq!(h.controller.snapshot().total_count_in_cycle, 12);
}

#[test]
fn controller_builds_from_store() {
    let store = MemorySettingsStore::new(settings(4, 2, 3, true));
    let controller = SessionController::from_store(&store, Services::headless()).unwrap();
    assert_eq!(controller.settings().breathing.base_count, 4);
    assert_eq!(controller.snapshot().total_count_in_cycle, 16);
}
