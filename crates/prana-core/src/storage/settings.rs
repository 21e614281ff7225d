//! TOML-based breathing settings.
//!
//! Stores:
//! - Counting and cycle parameters for the voice guide
//! - Practice duration
//! - Voice speed and background volume
//! - Default stage durations shown when the app opens
//!
//! Settings are stored at `~/.config/prana/settings.toml`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::breathing::{BreathingStage, StageDurations, DEFAULT_STAGE_SECS};
use crate::error::{ConfigError, CoreError, Result};

pub const DEFAULT_BASE_COUNT: u32 = 5;
pub const DEFAULT_BREATHING_CYCLES: u32 = 3;
pub const DEFAULT_PRACTICE_MINUTES: u32 = 10;
pub const MIN_VOICE_SPEED: f32 = 0.5;
pub const MAX_VOICE_SPEED: f32 = 2.0;

/// Parameters of one breathing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreathingSettings {
    /// Spoken counts per stage.
    #[serde(default = "default_base_count")]
    pub base_count: u32,
    /// Cycles to complete before the session ends.
    #[serde(default = "default_breathing_cycles")]
    pub breathing_cycles: u32,
    /// Hard limit on the whole session, in minutes.
    #[serde(default = "default_practice_duration")]
    pub practice_duration_min: u32,
    #[serde(default = "default_true")]
    pub voice_guidance_enabled: bool,
    #[serde(default = "default_voice_speed")]
    pub voice_speed: f32,
}

/// Background sound configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    #[serde(default = "default_volume")]
    pub background_volume: f32,
}

/// Everything persisted in `settings.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub breathing: BreathingSettings,
    #[serde(default)]
    pub audio: AudioSettings,
    /// Stage durations the duration fields start out with.
    #[serde(default)]
    pub durations: StageDurations,
}

fn default_base_count() -> u32 {
    DEFAULT_BASE_COUNT
}
fn default_breathing_cycles() -> u32 {
    DEFAULT_BREATHING_CYCLES
}
fn default_practice_duration() -> u32 {
    DEFAULT_PRACTICE_MINUTES
}
fn default_true() -> bool {
    true
}
fn default_voice_speed() -> f32 {
    1.0
}
fn default_volume() -> f32 {
    0.5
}

impl Default for BreathingSettings {
    fn default() -> Self {
        Self {
            base_count: DEFAULT_BASE_COUNT,
            breathing_cycles: DEFAULT_BREATHING_CYCLES,
            practice_duration_min: DEFAULT_PRACTICE_MINUTES,
            voice_guidance_enabled: true,
            voice_speed: 1.0,
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            background_volume: default_volume(),
        }
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl Settings {
    /// Check every value is in range.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.breathing;
        if b.base_count == 0 {
            return Err(invalid("breathing.base_count", "must be greater than 0"));
        }
        if b.breathing_cycles == 0 {
            return Err(invalid("breathing.breathing_cycles", "must be greater than 0"));
        }
        if b.practice_duration_min == 0 {
            return Err(invalid(
                "breathing.practice_duration_min",
                "must be greater than 0",
            ));
        }
        if !(MIN_VOICE_SPEED..=MAX_VOICE_SPEED).contains(&b.voice_speed) {
            return Err(invalid(
                "breathing.voice_speed",
                format!("must be between {MIN_VOICE_SPEED} and {MAX_VOICE_SPEED}"),
            ));
        }
        if !(0.0..=1.0).contains(&self.audio.background_volume) {
            return Err(invalid("audio.background_volume", "must be between 0 and 1"));
        }
        for stage in BreathingStage::ALL {
            if self.durations.get(stage) == 0 {
                return Err(invalid(
                    &format!("durations.{}", stage.id()),
                    "must be greater than 0",
                ));
            }
        }
        Ok(())
    }

    /// Replace out-of-range values with their defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Settings::default();
        let b = &mut self.breathing;
        if b.base_count == 0 {
            b.base_count = defaults.breathing.base_count;
        }
        if b.breathing_cycles == 0 {
            b.breathing_cycles = defaults.breathing.breathing_cycles;
        }
        if b.practice_duration_min == 0 {
            b.practice_duration_min = defaults.breathing.practice_duration_min;
        }
        if !(MIN_VOICE_SPEED..=MAX_VOICE_SPEED).contains(&b.voice_speed) {
            b.voice_speed = defaults.breathing.voice_speed;
        }
        if !(0.0..=1.0).contains(&self.audio.background_volume) {
            self.audio.background_volume = defaults.audio.background_volume;
        }
        let d = &mut self.durations;
        for secs in [&mut d.inhale, &mut d.hold, &mut d.exhale, &mut d.silence] {
            if *secs == 0 {
                *secs = DEFAULT_STAGE_SECS;
            }
        }
        self
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        for part in parents.into_iter().flat_map(|p| p.split('.')) {
            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let cannot_parse = |kind: &str| invalid(key, format!("cannot parse '{value}' as {kind}"));
        let new_value = match existing {
            serde_json::Value::Bool(_) => {
                serde_json::Value::Bool(value.parse::<bool>().map_err(|_| cannot_parse("bool"))?)
            }
            serde_json::Value::Number(n) if n.is_f64() => value
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .ok_or_else(|| cannot_parse("number"))?,
            serde_json::Value::Number(_) => serde_json::Value::Number(
                value
                    .parse::<u64>()
                    .map_err(|_| cannot_parse("integer"))?
                    .into(),
            ),
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                return Err(invalid(key, "is a section, not a value"));
            }
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// Get a settings value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without persisting.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation. `self` is left untouched on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Settings =
            serde_json::from_value(json).map_err(|e| invalid(key, e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// Persistence for [`Settings`]. Read once when a controller is built and
/// written on an explicit save.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Settings>;

    fn save(&self, settings: &Settings) -> Result<()>;
}

/// File-backed store using TOML.
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `~/.config/prana[-dev]/settings.toml`.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(data_dir()?.join("settings.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for TomlSettingsStore {
    /// Load from disk, writing defaults on first use.
    ///
    /// Values out of range are replaced by defaults rather than rejected.
    fn load(&self) -> Result<Settings> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let settings: Settings =
                    toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                        path: self.path.clone(),
                        message: e.to_string(),
                    })?;
                Ok(settings.sanitized())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let settings = Settings::default();
                self.save(&settings)?;
                Ok(settings)
            }
            Err(err) => Err(CoreError::Io(err)),
        }
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        settings.validate()?;
        let content = toml::to_string_pretty(settings).map_err(ConfigError::from)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content).map_err(|e| ConfigError::SaveFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Settings> {
        let guard = self
            .settings
            .lock()
            .map_err(|e| CoreError::Custom(e.to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        settings.validate()?;
        let mut guard = self
            .settings
            .lock()
            .map_err(|e| CoreError::Custom(e.to_string()))?;
        *guard = settings.clone();
        Ok(())
    }
}
