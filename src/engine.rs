use std::time::Instant;

use log::{debug, info, warn};

use crate::metrics::{calculate_accuracy, calculate_wpm};
use crate::session::{
    Difficulty, Language, SessionConfig, SessionState, SessionStatus, SettingsUpdate, TestMode,
};
use crate::typing_policy::{delete_char, write_char, Key};

/// Everything that can move a session forward. Feeding these through
/// [`Engine::apply`] is the whole transition core; the imperative shell only
/// decides when each one happens.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Start { text: String, at: Instant },
    Key { key: Key, at: Instant },
    Tick { at: Instant },
    Extend(String),
    Reset,
    UpdateSettings(SettingsUpdate),
}

/// Read-only copy of the session for rendering and result building.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub status: SessionStatus,
    pub mode: TestMode,
    pub difficulty: Difficulty,
    pub language: Language,
    pub reference: String,
    pub typed: String,
    pub cursor_pos: usize,
    pub errors: usize,
    pub elapsed_secs: u64,
    pub seconds_remaining: Option<u64>,
    pub wpm: u32,
    pub accuracy: u32,
    pub last_key: Option<Key>,
}

/// The typing session engine: single owner of session state.
///
/// Out-of-contract calls (input while idle, extending a finished session)
/// are no-ops. Time is always passed in by the caller so that every
/// transition is reproducible.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: SessionConfig,
    state: SessionState,
}

impl Engine {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::idle(config.mode),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    pub fn is_active(&self) -> bool {
        self.state.status == SessionStatus::Active
    }

    pub fn is_completed(&self) -> bool {
        self.state.status == SessionStatus::Completed
    }

    /// Pure transition: consume the engine and an event, return the next engine.
    pub fn apply(mut self, event: SessionEvent) -> Self {
        match event {
            SessionEvent::Start { text, at } => self.start(&text, at),
            SessionEvent::Key { key, at } => self.handle_input(key, at),
            SessionEvent::Tick { at } => self.tick(at),
            SessionEvent::Extend(text) => self.extend_text(&text),
            SessionEvent::Reset => self.reset(),
            SessionEvent::UpdateSettings(update) => self.update_settings(update),
        }
        self
    }

    /// Begin a fresh session on `text`, whatever the previous status was.
    pub fn start(&mut self, text: &str, now: Instant) {
        if text.is_empty() {
            warn!("ignoring start with an empty reference text");
            return;
        }
        let mode = self.config.mode;
        self.state = SessionState {
            status: SessionStatus::Active,
            mode,
            reference: text.chars().collect(),
            started_at: Some(now),
            seconds_remaining: mode.time_limit(),
            ..SessionState::default()
        };
        info!(
            "session started: mode={} difficulty={} language={} chars={}",
            mode,
            self.config.difficulty,
            self.config.language,
            self.state.reference.len()
        );
    }

    pub fn handle_input(&mut self, key: Key, now: Instant) {
        if !self.is_active() {
            return;
        }
        if self.budget_spent(now) {
            // Expiry has not been applied by a tick yet; the key loses the race.
            debug!("dropping {key:?} received after the time budget ran out");
            return;
        }

        match &key {
            Key::Backspace => {
                delete_char(&mut self.state);
            }
            Key::Char(c) => {
                if !write_char(&mut self.state, *c) {
                    debug!("dropping {c:?} past the end of the reference text");
                }
            }
            Key::Other(_) => {}
        }

        self.refresh(now);
        self.complete_if_done();
        self.state.last_key = Some(key);
    }

    /// Periodic clock update. The only way a timed session ends without the
    /// text being finished.
    pub fn tick(&mut self, now: Instant) {
        if !self.is_active() {
            return;
        }
        self.refresh(now);
        self.complete_if_done();
    }

    /// Append more reference text. Cursor, input and metrics are untouched.
    pub fn extend_text(&mut self, text: &str) {
        if !self.is_active() {
            debug!("ignoring extension while {:?}", self.state.status);
            return;
        }
        if !self.state.mode.is_timed() {
            warn!("extending a word-bound session");
        }
        self.state.reference.extend(text.chars());
        debug!(
            "reference text extended by {} chars to {}",
            text.chars().count(),
            self.state.reference.len()
        );
    }

    /// Back to idle. Settings are kept for the next `start`.
    pub fn reset(&mut self) {
        self.state = SessionState::idle(self.config.mode);
    }

    /// Settings only apply to the next session; an active or finished one
    /// keeps its mode and timer.
    pub fn update_settings(&mut self, update: SettingsUpdate) {
        self.config.merge(update);
        if self.is_active() {
            warn!("settings changed during an active session; they apply to the next one");
            return;
        }
        if self.state.status == SessionStatus::Idle {
            self.state.mode = self.config.mode;
            self.state.seconds_remaining = self.config.mode.time_limit();
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.state.status,
            mode: self.state.mode,
            difficulty: self.config.difficulty,
            language: self.config.language,
            reference: self.state.reference.iter().collect(),
            typed: self.state.input.iter().collect(),
            cursor_pos: self.state.cursor_pos,
            errors: self.state.errors,
            elapsed_secs: self.state.elapsed_secs,
            seconds_remaining: self.state.seconds_remaining,
            wpm: self.state.wpm,
            accuracy: self.state.accuracy,
            last_key: self.state.last_key.clone(),
        }
    }

    fn elapsed_at(&self, now: Instant) -> u64 {
        self.state
            .started_at
            .map_or(0, |start| now.saturating_duration_since(start).as_secs())
    }

    fn budget_spent(&self, now: Instant) -> bool {
        self.state
            .mode
            .time_limit()
            .is_some_and(|limit| self.elapsed_at(now) >= limit)
    }

    fn refresh(&mut self, now: Instant) {
        let elapsed = self.elapsed_at(now);
        self.state.elapsed_secs = elapsed;
        self.state.seconds_remaining = self
            .state
            .mode
            .time_limit()
            .map(|limit| limit.saturating_sub(elapsed));
        self.state.wpm = calculate_wpm(self.state.cursor_pos, elapsed);
        self.state.accuracy = calculate_accuracy(self.state.cursor_pos, self.state.errors);
    }

    fn complete_if_done(&mut self) {
        let out_of_time = self.state.seconds_remaining == Some(0);
        if out_of_time || self.state.is_at_end() {
            self.state.status = SessionStatus::Completed;
            info!(
                "session completed: wpm={} accuracy={} errors={} elapsed={}s",
                self.state.wpm, self.state.accuracy, self.state.errors, self.state.elapsed_secs
            );
        }
    }
}
