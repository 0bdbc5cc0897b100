use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info, warn};

use crate::engine::{Engine, Snapshot};
use crate::results::{ResultSink, SubmissionLatch, TestResult};
use crate::runtime::{AppEvent, FixedTicker, TickHandle};
use crate::session::{SessionConfig, SettingsUpdate};
use crate::text_provider::{TextProvider, TextRequest, FALLBACK_TEXT};
use crate::time_series::WpmSeries;
use crate::typing_policy::Key;

pub const DEFAULT_TICK_RATE_MS: u64 = 100;
pub const DEFAULT_EXTENSION_MARGIN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellOptions {
    pub tick_interval: Duration,
    /// Request more text once fewer than this many characters remain untyped.
    pub extension_margin: usize,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_RATE_MS),
            extension_margin: DEFAULT_EXTENSION_MARGIN,
        }
    }
}

/// Outcome of the one submission made for a completed session.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Saved(TestResult),
    Failed(String),
}

/// Imperative host of the [`Engine`]: owns the ticker, text extension
/// fetches and result submission, and routes every event into the engine.
pub struct SessionShell<P: TextProvider + 'static, S: ResultSink> {
    engine: Engine,
    provider: Arc<P>,
    sink: S,
    events: Sender<AppEvent>,
    options: ShellOptions,
    clock: Box<dyn Fn() -> Instant + Send>,
    generation: u64,
    ticker: Option<TickHandle>,
    extension_in_flight: bool,
    latch: SubmissionLatch,
    submission: Option<Submission>,
    wpm_series: WpmSeries,
}

impl<P: TextProvider + 'static, S: ResultSink> SessionShell<P, S> {
    pub fn new(
        config: SessionConfig,
        provider: Arc<P>,
        sink: S,
        events: Sender<AppEvent>,
        options: ShellOptions,
    ) -> Self {
        Self {
            engine: Engine::new(config),
            provider,
            sink,
            events,
            options,
            clock: Box::new(Instant::now),
            generation: 0,
            ticker: None,
            extension_in_flight: false,
            latch: SubmissionLatch::default(),
            submission: None,
            wpm_series: WpmSeries::default(),
        }
    }

    /// Replace the wall clock, e.g. with a manually advanced one in tests.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> Instant + Send + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn snapshot(&self) -> Snapshot {
        self.engine.snapshot()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn extension_in_flight(&self) -> bool {
        self.extension_in_flight
    }

    pub fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }

    pub fn wpm_series(&self) -> &WpmSeries {
        &self.wpm_series
    }

    /// Fetch a first block of text and start on it, substituting the
    /// fallback passage when the provider fails.
    pub fn begin(&mut self) {
        let request = TextRequest::from(self.engine.config());
        let text = match self.provider.fetch(&request) {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => {
                warn!("text provider returned nothing, using fallback passage");
                FALLBACK_TEXT.to_string()
            }
            Err(e) => {
                warn!("text provider failed ({e}), using fallback passage");
                FALLBACK_TEXT.to_string()
            }
        };
        self.start_with(&text);
    }

    /// Start a new session on `text`, dropping whatever ran before.
    pub fn start_with(&mut self, text: &str) {
        self.retire_session();
        let now = (self.clock)();
        self.engine.start(text, now);
        if !self.engine.is_active() {
            return;
        }
        self.latch.arm();
        self.ticker = Some(TickHandle::spawn(
            self.events.clone(),
            &FixedTicker::new(self.options.tick_interval),
            self.generation,
        ));
        self.maybe_extend();
    }

    pub fn reset(&mut self) {
        self.retire_session();
        self.engine.reset();
        info!("session reset");
    }

    pub fn update_settings(&mut self, update: SettingsUpdate) {
        self.engine.update_settings(update);
    }

    pub fn handle_key(&mut self, key: Key) {
        let now = (self.clock)();
        self.engine.handle_input(key, now);
        self.after_transition();
    }

    /// Route a non-keyboard event. Key events are expected to be filtered
    /// by the caller for application shortcuts first.
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => self.handle_key(Key::from(key)),
            AppEvent::Resize => {}
            AppEvent::Tick { generation } => self.on_tick(generation),
            AppEvent::TextExtended { generation, result } => {
                self.on_text_extended(generation, result.map_err(|e| e.to_string()))
            }
        }
    }

    fn on_tick(&mut self, generation: u64) {
        if generation != self.generation {
            debug!("ignoring tick from retired session {generation}");
            return;
        }
        let now = (self.clock)();
        self.engine.tick(now);
        self.record_wpm();
        self.after_transition();
    }

    fn on_text_extended(&mut self, generation: u64, result: Result<String, String>) {
        if generation != self.generation {
            debug!("discarding extension for retired session {generation}");
            return;
        }
        self.extension_in_flight = false;
        match result {
            Ok(text) if !text.is_empty() => {
                let needs_gap = self
                    .engine
                    .state()
                    .reference
                    .last()
                    .is_some_and(|c| !c.is_whitespace())
                    && !text.starts_with(char::is_whitespace);
                if needs_gap {
                    self.engine.extend_text(" ");
                }
                self.engine.extend_text(&text);
            }
            Ok(_) => warn!("text extension came back empty"),
            Err(e) => warn!("text extension failed: {e}"),
        }
    }

    fn after_transition(&mut self) {
        if self.engine.is_completed() {
            self.stop_ticker();
            if self.latch.try_fire() {
                self.record_wpm();
                self.submit();
            }
        } else {
            self.maybe_extend();
        }
    }

    /// Kick off one background fetch when a timed session nears the end of
    /// its text. At most one fetch is in flight per session.
    fn maybe_extend(&mut self) {
        let state = self.engine.state();
        if !self.engine.is_active()
            || !state.mode.is_timed()
            || self.extension_in_flight
            || state.untyped_len() >= self.options.extension_margin
        {
            return;
        }

        self.extension_in_flight = true;
        let request = TextRequest {
            mode: state.mode,
            ..TextRequest::from(self.engine.config())
        };
        let provider = Arc::clone(&self.provider);
        let tx = self.events.clone();
        let generation = self.generation;
        debug!(
            "requesting more text for session {generation}, {} chars left",
            state.untyped_len()
        );
        thread::spawn(move || {
            let result = provider.fetch(&request);
            let _ = tx.send(AppEvent::TextExtended { generation, result });
        });
    }

    fn submit(&mut self) {
        let result = TestResult::from_snapshot(&self.engine.snapshot(), Utc::now());
        self.submission = Some(match self.sink.submit(&result) {
            Ok(()) => Submission::Saved(result),
            Err(e) => {
                warn!("failed to save result: {e}");
                Submission::Failed(e.to_string())
            }
        });
    }

    fn record_wpm(&mut self) {
        let state = self.engine.state();
        self.wpm_series.record(state.elapsed_secs, state.wpm);
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    /// Cancel the ticker and invalidate in-flight work of the current session.
    fn retire_session(&mut self) {
        self.stop_ticker();
        self.generation += 1;
        self.extension_in_flight = false;
        self.latch.disarm();
        self.submission = None;
        self.wpm_series.clear();
    }
}
