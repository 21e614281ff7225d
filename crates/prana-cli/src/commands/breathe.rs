use std::sync::Arc;

use clap::Args;
use prana_core::services::{FanOut, TracingTelemetry};
use prana_core::{
    SessionController, SessionLog, Services, Settings, SettingsStore, TomlSettingsStore,
};

use crate::console::{ConsoleAmbience, ConsoleAnnouncer};

#[derive(Args)]
pub struct BreatheArgs {
    /// Inhale seconds
    #[arg(long)]
    inhale: Option<u32>,
    /// Hold seconds
    #[arg(long)]
    hold: Option<u32>,
    /// Exhale seconds
    #[arg(long)]
    exhale: Option<u32>,
    /// Silence seconds
    #[arg(long)]
    silence: Option<u32>,
    /// Disable spoken counting
    #[arg(long)]
    no_voice: bool,
    /// Cycles before the session ends
    #[arg(long)]
    cycles: Option<u32>,
    /// Practice limit in minutes
    #[arg(long)]
    minutes: Option<u32>,
}

impl BreatheArgs {
    /// Overlay the flags on the stored settings for this run only.
    fn apply(&self, settings: &mut Settings) {
        let d = &mut settings.durations;
        d.inhale = self.inhale.unwrap_or(d.inhale);
        d.hold = self.hold.unwrap_or(d.hold);
        d.exhale = self.exhale.unwrap_or(d.exhale);
        d.silence = self.silence.unwrap_or(d.silence);
        if self.no_voice {
            settings.breathing.voice_guidance_enabled = false;
        }
        if let Some(cycles) = self.cycles {
            settings.breathing.breathing_cycles = cycles;
        }
        if let Some(minutes) = self.minutes {
            settings.breathing.practice_duration_min = minutes;
        }
    }
}

pub fn run(args: BreatheArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = TomlSettingsStore::open_default()?;
    let mut settings = store.load()?;
    args.apply(&mut settings);
    settings.validate()?;

    let log = Arc::new(SessionLog::open()?);
    let telemetry = FanOut::new()
        .with(Arc::new(TracingTelemetry))
        .with(log);
    let services = Services::new(
        Arc::new(ConsoleAnnouncer::default()),
        Arc::new(ConsoleAmbience::default()),
        Arc::new(telemetry),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(breathe(settings, services))
}

async fn breathe(settings: Settings, services: Services) -> Result<(), Box<dyn std::error::Error>> {
    let controller = SessionController::new(settings, services);
    let mut rx = controller.subscribe();

    if !controller.start() {
        return Err("session not started: every stage needs a positive duration".into());
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut shown = None;
    loop {
        {
            let state = rx.borrow_and_update();
            if !state.is_running {
                break;
            }
            if shown != Some(state.current_stage) {
                shown = Some(state.current_stage);
                println!(
                    "{:>4}s  {} ({}s)",
                    state.elapsed_seconds,
                    state.current_stage,
                    state.remaining_seconds
                );
            }
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                controller.stop();
                break;
            }
        }
    }

    let state = controller.snapshot();
    controller.shutdown();
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
