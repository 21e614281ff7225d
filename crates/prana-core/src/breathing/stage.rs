//! Breathing stages and their durations.
//!
//! The cycle is fixed: `Inhale -> Hold -> Exhale -> Silence -> Inhale`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Fallback length of a stage when its configured duration is missing or zero.
pub const DEFAULT_STAGE_SECS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathingStage {
    Inhale,
    Hold,
    Exhale,
    Silence,
}

impl BreathingStage {
    /// All stages in cycle order, starting from Inhale.
    pub const ALL: [BreathingStage; 4] = [
        BreathingStage::Inhale,
        BreathingStage::Hold,
        BreathingStage::Exhale,
        BreathingStage::Silence,
    ];

    /// The stage that follows this one in the cycle.
    pub fn next(self) -> Self {
        match self {
            BreathingStage::Inhale => BreathingStage::Hold,
            BreathingStage::Hold => BreathingStage::Exhale,
            BreathingStage::Exhale => BreathingStage::Silence,
            BreathingStage::Silence => BreathingStage::Inhale,
        }
    }

    /// Display label, also what gets announced.
    pub fn label(self) -> &'static str {
        match self {
            BreathingStage::Inhale => "Inhale",
            BreathingStage::Hold => "Hold",
            BreathingStage::Exhale => "Exhale",
            BreathingStage::Silence => "Silence",
        }
    }

    /// Lowercase identifier used by settings keys and the CLI.
    pub fn id(self) -> &'static str {
        match self {
            BreathingStage::Inhale => "inhale",
            BreathingStage::Hold => "hold",
            BreathingStage::Exhale => "exhale",
            BreathingStage::Silence => "silence",
        }
    }
}

impl fmt::Display for BreathingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BreathingStage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BreathingStage::ALL
            .into_iter()
            .find(|stage| stage.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownStage(s.to_string()))
    }
}

/// Length of each stage in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageDurations {
    pub inhale: u32,
    pub hold: u32,
    pub exhale: u32,
    pub silence: u32,
}

impl StageDurations {
    pub fn uniform(secs: u32) -> Self {
        Self {
            inhale: secs,
            hold: secs,
            exhale: secs,
            silence: secs,
        }
    }

    /// Raw configured value, zero included.
    pub fn get(&self, stage: BreathingStage) -> u32 {
        match stage {
            BreathingStage::Inhale => self.inhale,
            BreathingStage::Hold => self.hold,
            BreathingStage::Exhale => self.exhale,
            BreathingStage::Silence => self.silence,
        }
    }

    /// Seconds in one full pass through all four stages.
    pub fn cycle_secs(&self) -> u32 {
        BreathingStage::ALL
            .into_iter()
            .map(|stage| duration_of(stage, self))
            .sum()
    }
}

impl Default for StageDurations {
    fn default() -> Self {
        Self::uniform(DEFAULT_STAGE_SECS)
    }
}

/// Configured duration of `stage`, falling back to [`DEFAULT_STAGE_SECS`]
/// when the value is zero.
pub fn duration_of(stage: BreathingStage, durations: &StageDurations) -> u32 {
    match durations.get(stage) {
        0 => DEFAULT_STAGE_SECS,
        secs => secs,
    }
}

/// Text typed into a duration field.
///
/// Holds either the empty string or ASCII decimal digits; nothing else can be
/// stored, so half-typed values stay visible without ever being invalid.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DurationInput(String);

impl DurationInput {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        if is_digits_or_empty(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::NonDigitInput(raw.to_string()))
        }
    }

    /// Replace the stored text. Returns `false` and keeps the old value if
    /// `raw` contains anything but digits.
    pub fn set(&mut self, raw: &str) -> bool {
        if !is_digits_or_empty(raw) {
            return false;
        }
        self.0.clear();
        self.0.push_str(raw);
        true
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The value as seconds if it is a positive number that fits in `u32`.
    pub fn parse_positive(&self) -> Option<u32> {
        self.0.parse::<u32>().ok().filter(|secs| *secs > 0)
    }
}

impl TryFrom<String> for DurationInput {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(&raw)
    }
}

impl From<DurationInput> for String {
    fn from(input: DurationInput) -> Self {
        input.0
    }
}

impl From<u32> for DurationInput {
    fn from(secs: u32) -> Self {
        Self(secs.to_string())
    }
}

fn is_digits_or_empty(raw: &str) -> bool {
    raw.bytes().all(|b| b.is_ascii_digit())
}

/// The four duration fields as the user edits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationInputs {
    pub inhale: DurationInput,
    pub hold: DurationInput,
    pub exhale: DurationInput,
    pub silence: DurationInput,
}

impl DurationInputs {
    pub fn get(&self, stage: BreathingStage) -> &DurationInput {
        match stage {
            BreathingStage::Inhale => &self.inhale,
            BreathingStage::Hold => &self.hold,
            BreathingStage::Exhale => &self.exhale,
            BreathingStage::Silence => &self.silence,
        }
    }

    pub fn get_mut(&mut self, stage: BreathingStage) -> &mut DurationInput {
        match stage {
            BreathingStage::Inhale => &mut self.inhale,
            BreathingStage::Hold => &mut self.hold,
            BreathingStage::Exhale => &mut self.exhale,
            BreathingStage::Silence => &mut self.silence,
        }
    }

    /// Parse all four fields. Fails on the first field that is empty, zero,
    /// or too large.
    pub fn validate(&self) -> Result<StageDurations, ValidationError> {
        let parse = |stage: BreathingStage| {
            let input = self.get(stage);
            input
                .parse_positive()
                .ok_or_else(|| ValidationError::InvalidDuration {
                    stage: stage.id().to_string(),
                    raw: input.as_str().to_string(),
                })
        };
        Ok(StageDurations {
            inhale: parse(BreathingStage::Inhale)?,
            hold: parse(BreathingStage::Hold)?,
            exhale: parse(BreathingStage::Exhale)?,
            silence: parse(BreathingStage::Silence)?,
        })
    }
}

impl Default for DurationInputs {
    fn default() -> Self {
        Self::from(StageDurations::default())
    }
}

impl From<StageDurations> for DurationInputs {
    fn from(durations: StageDurations) -> Self {
        Self {
            inhale: durations.inhale.into(),
            hold: durations.hold.into(),
            exhale: durations.exhale.into(),
            silence: durations.silence.into(),
        }
    }
}
