pub mod session_log;
pub mod settings;

pub use session_log::{SessionLog, SessionSummary, Stats};
pub use settings::{
    AudioSettings, BreathingSettings, MemorySettingsStore, Settings, SettingsStore,
    TomlSettingsStore,
};

use std::path::PathBuf;

/// Returns `~/.config/prana[-dev]/` based on PRANA_ENV.
///
/// Set PRANA_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("PRANA_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("prana-dev")
    } else {
        base_dir.join("prana")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
