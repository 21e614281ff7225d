use prana_core::breathing::duration_of;
use prana_core::{BreathingStage, SettingsStore, TomlSettingsStore};
use serde::Serialize;

#[derive(Serialize)]
struct StageRow {
    stage: BreathingStage,
    label: &'static str,
    seconds: u32,
    next: BreathingStage,
}

/// Print the four stages in order with their configured durations.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = TomlSettingsStore::open_default()?.load()?;
    let rows: Vec<StageRow> = BreathingStage::ALL
        .iter()
        .map(|&stage| StageRow {
            stage,
            label: stage.label(),
            seconds: duration_of(stage, &settings.durations),
            next: stage.next(),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
