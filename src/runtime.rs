use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};
use log::debug;

use crate::text_provider::ProviderError;

/// Unified event type consumed by the app runner
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    /// Periodic clock tick for the session started as `generation`.
    Tick { generation: u64 },
    /// Outcome of an asynchronous text extension fetch.
    TextExtended {
        generation: u64,
        result: Result<String, ProviderError>,
    },
}

/// Source of application events (keyboard, resize, ticks, fetch results)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Event source reading from a channel that every producer shares.
pub struct ChannelEventSource {
    rx: Receiver<AppEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Forward terminal key and resize events into `tx` from a reader thread.
pub fn spawn_terminal_reader(tx: Sender<AppEvent>) -> JoinHandle<()> {
    thread::spawn(move || loop {
        let evt = match event::read() {
            Ok(CtEvent::Key(key)) => AppEvent::Key(key),
            Ok(CtEvent::Resize(_, _)) => AppEvent::Resize,
            Ok(_) => continue,
            Err(_) => break,
        };
        if tx.send(evt).is_err() {
            break;
        }
    })
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Periodic tick scheduler tied to one session.
///
/// Sends `AppEvent::Tick` every interval until cancelled. Dropping the
/// handle cancels it and joins the thread, so no tick is produced after the
/// owner lets go.
pub struct TickHandle {
    generation: u64,
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TickHandle {
    pub fn spawn<T: Ticker>(tx: Sender<AppEvent>, ticker: &T, generation: u64) -> Self {
        let interval = ticker.interval();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if tx.send(AppEvent::Tick { generation }).is_err() {
                        break;
                    }
                }
                // stop requested or handle dropped
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        debug!("ticker started for session {generation} every {interval:?}");

        Self {
            generation,
            stop: Some(stop_tx),
            thread: Some(thread),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop ticking and wait for the thread to exit.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        debug!("ticker stopped for session {}", self.generation);
    }
}

/// Runner that advances the application one event at a time
pub struct Runner<E: EventSource> {
    event_source: E,
    poll_interval: Duration,
}

impl<E: EventSource> Runner<E> {
    pub fn new(event_source: E, poll_interval: Duration) -> Self {
        Self {
            event_source,
            poll_interval,
        }
    }

    /// Blocks up to the poll interval; `None` when nothing arrived.
    pub fn step(&self) -> Option<AppEvent> {
        self.event_source.recv_timeout(self.poll_interval).ok()
    }
}
