use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::typing_policy::Key;

/// Test length selection. Three variants are bounded by the wall clock, one
/// by the end of the reference text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
pub enum TestMode {
    #[default]
    #[serde(rename = "1min")]
    #[strum(serialize = "1min")]
    #[value(name = "1min")]
    OneMinute,
    #[serde(rename = "3min")]
    #[strum(serialize = "3min")]
    #[value(name = "3min")]
    ThreeMinutes,
    #[serde(rename = "5min")]
    #[strum(serialize = "5min")]
    #[value(name = "5min")]
    FiveMinutes,
    #[serde(rename = "words")]
    #[strum(serialize = "words")]
    #[value(name = "words")]
    Words,
}

impl TestMode {
    /// Time budget in whole seconds, `None` for the word-count-bound mode.
    pub fn time_limit(&self) -> Option<u64> {
        match self {
            TestMode::OneMinute => Some(60),
            TestMode::ThreeMinutes => Some(180),
            TestMode::FiveMinutes => Some(300),
            TestMode::Words => None,
        }
    }

    pub fn is_timed(&self) -> bool {
        self.time_limit().is_some()
    }

    /// Approximate length of the text a provider assembles for this mode.
    pub fn target_text_len(&self) -> Option<usize> {
        match self {
            TestMode::OneMinute => Some(400),
            TestMode::ThreeMinutes => Some(1200),
            TestMode::FiveMinutes => Some(2000),
            TestMode::Words => None,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Random,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    En,
    Es,
    De,
}

/// Settings that survive `reset` and apply to the next `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub mode: TestMode,
    pub difficulty: Difficulty,
    pub language: Language,
}

/// Partial settings change; `None` leaves the field as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettingsUpdate {
    pub mode: Option<TestMode>,
    pub difficulty: Option<Difficulty>,
    pub language: Option<Language>,
}

impl SessionConfig {
    pub fn merge(&mut self, update: SettingsUpdate) {
        if let Some(mode) = update.mode {
            self.mode = mode;
        }
        if let Some(difficulty) = update.difficulty {
            self.difficulty = difficulty;
        }
        if let Some(language) = update.language {
            self.language = language;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub status: SessionStatus,
    /// Mode the session runs under, fixed from `start` until `reset`.
    pub mode: TestMode,
    pub reference: Vec<char>,
    pub input: Vec<char>,
    pub cursor_pos: usize,
    pub errors: usize,
    pub started_at: Option<std::time::Instant>,
    pub elapsed_secs: u64,
    /// `None` means unbounded.
    pub seconds_remaining: Option<u64>,
    pub wpm: u32,
    pub accuracy: u32,
    pub last_key: Option<Key>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            mode: TestMode::default(),
            reference: Vec::new(),
            input: Vec::new(),
            cursor_pos: 0,
            errors: 0,
            started_at: None,
            elapsed_secs: 0,
            seconds_remaining: None,
            wpm: 0,
            accuracy: 100,
            last_key: None,
        }
    }
}

impl SessionState {
    /// Fresh idle state showing the budget of `mode` on the timer.
    pub fn idle(mode: TestMode) -> Self {
        Self {
            mode,
            seconds_remaining: mode.time_limit(),
            ..Self::default()
        }
    }

    pub fn reference_len(&self) -> usize {
        self.reference.len()
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor_pos >= self.reference.len()
    }

    /// Characters of the reference text not reached yet.
    pub fn untyped_len(&self) -> usize {
        self.reference.len().saturating_sub(self.cursor_pos)
    }
}
