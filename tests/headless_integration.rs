use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use tapline::results::{LocalHistoryStore, ResultSink};
use tapline::runtime::{AppEvent, ChannelEventSource, Runner};
use tapline::session::{SessionConfig, SessionStatus, TestMode};
use tapline::shell::{SessionShell, ShellOptions, Submission};
use tapline::text_provider::{ProviderError, TextProvider, TextRequest};

// Headless integration using the runtime + shell without a TTY.
// Keystrokes go through the same channel the ticker and fetch workers use.

struct Repeating(&'static str);

impl TextProvider for Repeating {
    fn fetch(&self, _request: &TextRequest) -> Result<String, ProviderError> {
        Ok(self.0.to_string())
    }
}

fn key(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn options(margin: usize) -> ShellOptions {
    ShellOptions {
        tick_interval: Duration::from_millis(5),
        extension_margin: margin,
    }
}

#[test]
fn headless_word_session_completes_and_is_saved() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history.json");
    let (tx, rx) = mpsc::channel();

    let mut shell = SessionShell::new(
        SessionConfig {
            mode: TestMode::Words,
            ..SessionConfig::default()
        },
        Arc::new(Repeating("hi")),
        Box::new(LocalHistoryStore::open(&history)) as Box<dyn ResultSink>,
        tx.clone(),
        options(0),
    );
    let runner = Runner::new(ChannelEventSource::new(rx), Duration::from_millis(5));
    shell.begin();

    tx.send(key('h')).unwrap();
    tx.send(key('i')).unwrap();

    for _ in 0..200u32 {
        if let Some(event) = runner.step() {
            shell.handle_event(event);
        }
        if shell.engine().is_completed() {
            break;
        }
    }

    assert_eq!(shell.snapshot().status, SessionStatus::Completed);
    assert!(matches!(shell.submission(), Some(Submission::Saved(_))));
    assert!(!shell.is_ticking());

    let stored = LocalHistoryStore::open(&history);
    assert_eq!(stored.entries().len(), 1);
    assert_eq!(stored.entries()[0].accuracy, 100);
}

#[test]
fn headless_timed_session_finishes_by_time() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, rx) = mpsc::channel();
    let now = Arc::new(Mutex::new(Instant::now()));
    let clock = Arc::clone(&now);

    let mut shell = SessionShell::new(
        SessionConfig {
            mode: TestMode::OneMinute,
            ..SessionConfig::default()
        },
        Arc::new(Repeating("lorem ipsum dolor")),
        Box::new(LocalHistoryStore::open(dir.path().join("h.json"))) as Box<dyn ResultSink>,
        tx.clone(),
        options(10),
    )
    .with_clock(move || *clock.lock().unwrap());
    let runner = Runner::new(ChannelEventSource::new(rx), Duration::from_millis(5));
    shell.begin();

    for c in "lorem ipsum".chars() {
        tx.send(key(c)).unwrap();
    }
    for _ in 0..500u32 {
        if let Some(event) = runner.step() {
            shell.handle_event(event);
        }
        if shell.snapshot().cursor_pos == 11 && !shell.extension_in_flight() {
            break;
        }
    }
    // the short text was topped up while typing
    assert!(shell.snapshot().reference.starts_with("lorem ipsum dolor lorem"));

    *now.lock().unwrap() += Duration::from_secs(60);
    for _ in 0..500u32 {
        if let Some(event) = runner.step() {
            shell.handle_event(event);
        }
        if shell.engine().is_completed() {
            break;
        }
    }

    let snap = shell.snapshot();
    assert_eq!(snap.status, SessionStatus::Completed);
    assert_eq!(snap.seconds_remaining, Some(0));
    assert_eq!(snap.wpm, 2);
    match shell.submission() {
        Some(Submission::Saved(result)) => assert_eq!(result.duration, 60),
        other => panic!("expected a saved result, got {other:?}"),
    }
}

#[test]
fn headless_reset_silences_old_ticker() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, rx) = mpsc::channel();
    let mut shell = SessionShell::new(
        SessionConfig::default(),
        Arc::new(Repeating("some words to type for a while")),
        Box::new(LocalHistoryStore::open(dir.path().join("h.json"))) as Box<dyn ResultSink>,
        tx,
        options(0),
    );
    shell.begin();
    let old = shell.generation();
    shell.reset();
    assert_eq!(shell.snapshot().status, SessionStatus::Idle);

    // whatever the old ticker sent before cancellation is stale now
    while let Ok(event) = rx.try_recv() {
        if let AppEvent::Tick { generation } = event {
            assert_eq!(generation, old);
        }
        shell.handle_event(AppEvent::Tick { generation: old });
    }
    assert!(rx.recv_timeout(Duration::from_millis(30)).is_err());
    assert_eq!(shell.snapshot().status, SessionStatus::Idle);
}
