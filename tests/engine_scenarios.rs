use std::time::{Duration, Instant};

use tapline::engine::Engine;
use tapline::session::{SessionConfig, SessionStatus, TestMode};
use tapline::typing_policy::Key;

fn engine(mode: TestMode) -> Engine {
    Engine::new(SessionConfig {
        mode,
        ..SessionConfig::default()
    })
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn type_at(engine: &mut Engine, text: &str, at: Instant) {
    for c in text.chars() {
        engine.handle_input(Key::Char(c), at);
    }
}

#[test]
fn perfect_typing() {
    let t0 = Instant::now();
    let mut e = engine(TestMode::Words);
    e.start("cat dog", t0);
    type_at(&mut e, "cat dog", t0 + secs(6));

    let snap = e.snapshot();
    assert_eq!(snap.cursor_pos, 7);
    assert_eq!(snap.errors, 0);
    assert_eq!(snap.accuracy, 100);
    assert_eq!(snap.wpm, 14);
    assert_eq!(snap.status, SessionStatus::Completed);
}

#[test]
fn one_uncorrected_error() {
    let t0 = Instant::now();
    let mut e = engine(TestMode::Words);
    e.start("abc", t0);
    type_at(&mut e, "abX", t0 + secs(3));

    let snap = e.snapshot();
    assert_eq!(snap.cursor_pos, 3);
    assert_eq!(snap.errors, 1);
    assert_eq!(snap.accuracy, 67);
}

#[test]
fn corrected_error_still_counts() {
    let t0 = Instant::now();
    let mut e = engine(TestMode::Words);
    e.start("ab", t0);
    type_at(&mut e, "aX", t0 + secs(1));
    e.handle_input(Key::Backspace, t0 + secs(1));
    assert_eq!(e.state().cursor_pos, 1);
    e.handle_input(Key::Char('b'), t0 + secs(2));

    let snap = e.snapshot();
    assert_eq!(snap.cursor_pos, 2);
    assert_eq!(snap.errors, 1);
    assert_eq!(snap.typed, "ab");
}

#[test]
fn timed_session_completes_on_expiry_and_freezes() {
    let t0 = Instant::now();
    let mut e = engine(TestMode::OneMinute);
    let reference = "a".repeat(200);
    e.start(&reference, t0);
    type_at(&mut e, &"a".repeat(50), t0 + secs(30));
    assert_eq!(e.snapshot().wpm, 20);

    e.tick(t0 + secs(59));
    assert_eq!(e.status(), SessionStatus::Active);

    e.tick(t0 + secs(60));
    let done = e.snapshot();
    assert_eq!(done.status, SessionStatus::Completed);
    assert_eq!(done.seconds_remaining, Some(0));
    assert_eq!(done.wpm, 10);

    e.tick(t0 + secs(120));
    type_at(&mut e, "aaa", t0 + secs(121));
    assert_eq!(e.snapshot(), done);
}

#[test]
fn word_bound_session_ignores_the_clock() {
    let t0 = Instant::now();
    let mut e = engine(TestMode::Words);
    e.start("hi", t0);

    e.tick(t0 + secs(100_000));
    assert_eq!(e.status(), SessionStatus::Active);
    assert_eq!(e.snapshot().seconds_remaining, None);

    type_at(&mut e, "hi", t0 + secs(100_001));
    assert_eq!(e.status(), SessionStatus::Completed);
}

#[test]
fn extension_keeps_progress() {
    let t0 = Instant::now();
    let mut e = engine(TestMode::ThreeMinutes);
    e.start("one", t0);
    type_at(&mut e, "on", t0 + secs(1));
    e.extend_text(" two");

    let snap = e.snapshot();
    assert_eq!(snap.reference, "one two");
    assert_eq!(snap.cursor_pos, 2);
    assert_eq!(snap.typed, "on");

    type_at(&mut e, "e", t0 + secs(2));
    assert_eq!(e.status(), SessionStatus::Active);
}
