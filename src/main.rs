mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use itertools::Itertools;
use log::info;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
};
use tapline::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    metrics::format_time,
    results::{HistoryStats, LocalHistoryStore, ResultSink, SqliteResultStore, StoreError},
    runtime::{spawn_terminal_reader, AppEvent, ChannelEventSource, Runner},
    session::{Difficulty, Language, SessionConfig, SettingsUpdate, TestMode},
    shell::SessionShell,
    text_provider::SampleTextProvider,
};

const LEADERBOARD_LIMIT: usize = 10;

/// terminal typing-speed trainer with timed and text-length tests
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal typing-speed trainer: timed (1, 3, 5 minute) and text-length tests over French and English passages, with local history and a per-user leaderboard."
)]
pub struct Cli {
    /// test length
    #[clap(short = 'm', long, value_enum)]
    mode: Option<TestMode>,

    /// passage difficulty
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// passage language
    #[clap(short = 'l', long, value_enum)]
    language: Option<Language>,

    /// custom prompt to type instead of a sample passage
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// record results in the shared database under this user
    #[clap(short = 'u', long)]
    user: Option<String>,

    /// print history statistics (of the configured user, if any) and exit
    #[clap(long)]
    history: bool,

    /// delete the local history and exit
    #[clap(long)]
    clear_history: bool,

    /// print the leaderboard and exit
    #[clap(long)]
    leaderboard: bool,
}

impl Cli {
    /// Explicit flags win over persisted preferences.
    fn merge_into(&self, cfg: Config) -> Config {
        Config {
            mode: self.mode.unwrap_or(cfg.mode),
            difficulty: self.difficulty.unwrap_or(cfg.difficulty),
            language: self.language.unwrap_or(cfg.language),
            user: self.user.clone().or(cfg.user),
            ..cfg
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Typing,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub type Shell = SessionShell<SampleTextProvider, Box<dyn ResultSink>>;

pub struct App {
    pub shell: Shell,
    pub prompt: Option<String>,
    pub state: AppState,
}

impl App {
    pub fn new(shell: Shell, prompt: Option<String>) -> Self {
        Self {
            shell,
            prompt,
            state: AppState::Typing,
        }
    }

    /// Start on a fresh text: the custom prompt if one was given, otherwise
    /// a passage from the provider.
    pub fn begin(&mut self) {
        match &self.prompt {
            Some(prompt) => self.shell.start_with(prompt),
            None => self.shell.begin(),
        }
        self.state = AppState::Typing;
    }

    /// Start over on the reference text of the current session.
    pub fn restart(&mut self) {
        let reference = self.shell.snapshot().reference;
        if reference.is_empty() {
            self.begin();
        } else {
            self.shell.start_with(&reference);
            self.state = AppState::Typing;
        }
    }

    fn on_event(&mut self, event: AppEvent) -> Flow {
        match event {
            AppEvent::Key(key) => return self.on_key(key),
            other => self.shell.handle_event(other),
        }
        self.sync_state();
        Flow::Continue
    }

    fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.kind != KeyEventKind::Press {
            return Flow::Continue;
        }
        match key.code {
            KeyCode::Esc => return Flow::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Flow::Quit
            }
            KeyCode::Tab => self.begin(),
            KeyCode::Left => self.restart(),
            _ if self.shell.engine().is_active() => {
                self.shell.handle_event(AppEvent::Key(key));
            }
            // between tests: settings for the next one
            KeyCode::Char('m') => self.cycle_setting(|cfg| SettingsUpdate {
                mode: Some(cycle(cfg.mode)),
                ..SettingsUpdate::default()
            }),
            KeyCode::Char('d') => self.cycle_setting(|cfg| SettingsUpdate {
                difficulty: Some(cycle(cfg.difficulty)),
                ..SettingsUpdate::default()
            }),
            KeyCode::Char('l') => self.cycle_setting(|cfg| SettingsUpdate {
                language: Some(cycle(cfg.language)),
                ..SettingsUpdate::default()
            }),
            KeyCode::Char('r') => {
                self.shell.reset();
                self.state = AppState::Typing;
            }
            _ => {}
        }
        self.sync_state();
        Flow::Continue
    }

    fn cycle_setting<F>(&mut self, update: F)
    where
        F: FnOnce(&SessionConfig) -> SettingsUpdate,
    {
        let update = update(self.shell.engine().config());
        self.shell.update_settings(update);
    }

    fn sync_state(&mut self) {
        if self.shell.engine().is_completed() {
            self.state = AppState::Results;
        }
    }
}

/// The value after `current` in declaration order, wrapping around.
fn cycle<T: ValueEnum + PartialEq + Copy>(current: T) -> T {
    let all = T::value_variants();
    let idx = all.iter().position(|v| *v == current).unwrap_or(0);
    all[(idx + 1) % all.len()]
}

fn open_sink(cfg: &Config) -> Result<Box<dyn ResultSink>, Box<dyn Error>> {
    Ok(match &cfg.user {
        Some(user) => Box::new(SqliteResultStore::open(db_path()?, user)?),
        None => Box::new(LocalHistoryStore::open(history_path()?)),
    })
}

fn db_path() -> Result<PathBuf, Box<dyn Error>> {
    AppDirs::db_path().ok_or_else(|| "unable to resolve results database path".into())
}

fn history_path() -> Result<PathBuf, Box<dyn Error>> {
    AppDirs::history_path().ok_or_else(|| "unable to resolve history path".into())
}

/// The terminal belongs to the TUI, so logs go to a file.
fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    }
}

/// Stats of the configured user's stored results, or of the local history.
fn load_history(cfg: &Config, db: &Path, local: &Path) -> Result<HistoryStats, StoreError> {
    match &cfg.user {
        Some(user) => {
            let store = SqliteResultStore::open(db, user)?;
            Ok(HistoryStats::from_results(&store.results_for_user(user)?))
        }
        None => Ok(LocalHistoryStore::open(local).stats()),
    }
}

fn format_history(stats: &HistoryStats) -> String {
    if stats.total_tests == 0 {
        return "no tests recorded yet".to_string();
    }
    let summary = format!(
        "{} tests   avg {} wpm / {}% acc   best {} wpm / {}% acc   sd {:.2}",
        stats.total_tests,
        stats.avg_wpm,
        stats.avg_accuracy,
        stats.best_wpm,
        stats.best_accuracy,
        stats.wpm_std_dev
    );
    let recent = stats.recent.iter().map(|r| {
        format!(
            "{}  {:>5}  {:>3} wpm  {:>3}%  {} errors  {}",
            r.completed_at.format("%Y-%m-%d %H:%M"),
            r.mode.to_string(),
            r.wpm,
            r.accuracy,
            r.errors,
            format_time(r.duration)
        )
    });
    std::iter::once(summary).chain(recent).join("\n")
}

fn print_history(cfg: &Config) -> Result<(), Box<dyn Error>> {
    let stats = load_history(cfg, &db_path()?, &history_path()?)?;
    println!("{}", format_history(&stats));
    Ok(())
}

/// Empty the local history, returning how many results were dropped.
fn clear_history(path: &Path) -> Result<usize, StoreError> {
    let mut store = LocalHistoryStore::open(path);
    let cleared = store.entries().len();
    store.clear()?;
    info!("cleared {cleared} results from {}", path.display());
    Ok(cleared)
}

fn print_leaderboard() -> Result<(), Box<dyn Error>> {
    let store = SqliteResultStore::open(db_path()?, "")?;
    let board = store.leaderboard(LEADERBOARD_LIMIT)?;
    if board.is_empty() {
        println!("leaderboard is empty");
        return Ok(());
    }
    let lines = board
        .iter()
        .map(|e| {
            format!(
                "{:>2}. {:<16} {:>3} wpm  {:>3}%  ({} tests)",
                e.rank, e.user_id, e.best_wpm, e.accuracy, e.tests
            )
        })
        .join("\n");
    println!("{lines}");
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let config_store = FileConfigStore::new();
    let cfg = cli.merge_into(config_store.load());

    if cli.history {
        return print_history(&cfg);
    }
    if cli.clear_history {
        let cleared = clear_history(&history_path()?)?;
        println!("cleared {cleared} results from local history");
        return Ok(());
    }
    if cli.leaderboard {
        return print_leaderboard();
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let (tx, rx) = mpsc::channel();
    let provider = Arc::new(SampleTextProvider::new()?);
    let shell = SessionShell::new(
        cfg.session_config(),
        provider,
        open_sink(&cfg)?,
        tx.clone(),
        cfg.shell_options(),
    );
    let runner = Runner::new(ChannelEventSource::new(rx), cfg.shell_options().tick_interval);
    spawn_terminal_reader(tx);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(shell, cli.prompt.clone());
    info!("starting {} session", cfg.mode);
    app.begin();
    let outcome = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    if let Err(e) = config_store.save(&cfg.with_session(app.shell.engine().config())) {
        log::warn!("unable to save config to {}: {e}", config_store.path().display());
    }

    outcome
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<ChannelEventSource>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        if let Some(event) = runner.step() {
            if app.on_event(event) == Flow::Quit {
                break;
            }
        }
    }
    Ok(())
}
