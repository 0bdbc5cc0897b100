use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use log::{info, warn};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::Snapshot;
use crate::metrics::{mean, std_dev, words_typed};
use crate::session::{Difficulty, Language, TestMode};

/// Most recent entries kept by the on-device history.
pub const LOCAL_HISTORY_CAP: usize = 50;
/// Entries reported as "recent" by [`HistoryStats`].
pub const RECENT_RESULTS: usize = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("results database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Summary of a finished session, the payload handed to a [`ResultSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub wpm: u32,
    pub accuracy: u32,
    pub errors: u32,
    pub mode: TestMode,
    pub difficulty: Difficulty,
    pub language: Language,
    /// Seconds.
    pub duration: u64,
    pub characters_typed: u32,
    pub words_typed: u32,
    pub completed_at: DateTime<Utc>,
}

impl TestResult {
    pub fn from_snapshot(snapshot: &Snapshot, completed_at: DateTime<Utc>) -> Self {
        Self {
            wpm: snapshot.wpm,
            accuracy: snapshot.accuracy,
            errors: snapshot.errors as u32,
            mode: snapshot.mode,
            difficulty: snapshot.difficulty,
            language: snapshot.language,
            duration: snapshot.elapsed_secs,
            characters_typed: snapshot.cursor_pos as u32,
            words_typed: words_typed(snapshot.cursor_pos),
            completed_at,
        }
    }
}

/// Destination for completed sessions. Callers guarantee one submission per
/// session (see [`SubmissionLatch`]).
pub trait ResultSink {
    fn submit(&mut self, result: &TestResult) -> Result<(), StoreError>;
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn submit(&mut self, result: &TestResult) -> Result<(), StoreError> {
        (**self).submit(result)
    }
}

/// One-shot guard: armed when a session starts, fires on the first
/// observation of its completion and never again until re-armed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionLatch {
    #[default]
    Disarmed,
    Armed,
    Fired,
}

impl SubmissionLatch {
    pub fn arm(&mut self) {
        *self = SubmissionLatch::Armed;
    }

    pub fn disarm(&mut self) {
        *self = SubmissionLatch::Disarmed;
    }

    /// True exactly once per `arm`.
    pub fn try_fire(&mut self) -> bool {
        if *self == SubmissionLatch::Armed {
            *self = SubmissionLatch::Fired;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryStats {
    pub total_tests: usize,
    pub avg_wpm: u32,
    pub avg_accuracy: u32,
    pub best_wpm: u32,
    pub best_accuracy: u32,
    pub wpm_std_dev: f64,
    pub recent: Vec<TestResult>,
}

impl HistoryStats {
    /// `results` is expected newest first.
    pub fn from_results(results: &[TestResult]) -> Self {
        let wpms: Vec<f64> = results.iter().map(|r| r.wpm as f64).collect();
        let accuracies: Vec<f64> = results.iter().map(|r| r.accuracy as f64).collect();

        Self {
            total_tests: results.len(),
            avg_wpm: mean(&wpms).map_or(0, |m| m.round() as u32),
            avg_accuracy: mean(&accuracies).map_or(0, |m| m.round() as u32),
            best_wpm: results.iter().map(|r| r.wpm).max().unwrap_or(0),
            best_accuracy: results.iter().map(|r| r.accuracy).max().unwrap_or(0),
            wpm_std_dev: std_dev(&wpms).unwrap_or(0.0),
            recent: results.iter().take(RECENT_RESULTS).cloned().collect(),
        }
    }
}

/// On-device history: a JSON file holding the newest [`LOCAL_HISTORY_CAP`]
/// results, newest first.
#[derive(Debug)]
pub struct LocalHistoryStore {
    path: PathBuf,
    entries: Vec<TestResult>,
}

impl LocalHistoryStore {
    /// Load the history at `path`. A missing file is an empty history; an
    /// unreadable one is logged and replaced on the next write.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("discarding unreadable history at {}: {e}", path.display());
                Vec::new()
            }),
            Err(_) => Vec::new(),
        };
        Self { path, entries }
    }

    pub fn entries(&self) -> &[TestResult] {
        &self.entries
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats::from_results(&self.entries)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&self.entries)?)?;
        Ok(())
    }
}

impl ResultSink for LocalHistoryStore {
    fn submit(&mut self, result: &TestResult) -> Result<(), StoreError> {
        self.entries.insert(0, result.clone());
        self.entries.truncate(LOCAL_HISTORY_CAP);
        self.persist()?;
        info!(
            "saved result to local history ({} entries)",
            self.entries.len()
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub best_wpm: u32,
    pub accuracy: u32,
    pub tests: u32,
}

/// Persistent per-user result store.
#[derive(Debug)]
pub struct SqliteResultStore {
    conn: Connection,
    user_id: String,
}

impl SqliteResultStore {
    pub fn open<P: AsRef<Path>>(path: P, user_id: &str) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?, user_id)
    }

    pub fn open_in_memory(user_id: &str) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, user_id)
    }

    fn with_connection(conn: Connection, user_id: &str) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS test_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                errors INTEGER NOT NULL,
                mode TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                language TEXT NOT NULL,
                duration INTEGER NOT NULL,
                characters_typed INTEGER NOT NULL,
                words_typed INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_test_results_user ON test_results(user_id)",
            [],
        )?;

        Ok(Self {
            conn,
            user_id: user_id.to_string(),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Switch the identity new results are recorded under.
    pub fn set_user(&mut self, user_id: &str) {
        self.user_id = user_id.to_string();
    }

    /// All results of `user_id`, newest first.
    pub fn results_for_user(&self, user_id: &str) -> Result<Vec<TestResult>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT wpm, accuracy, errors, mode, difficulty, language,
                   duration, characters_typed, words_typed, completed_at
            FROM test_results
            WHERE user_id = ?1
            ORDER BY completed_at DESC, id DESC
            "#,
        )?;

        let rows = stmt.query_map([user_id], |row| {
            let completed_at: String = row.get(9)?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        9,
                        "completed_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Utc);

            Ok(TestResult {
                wpm: row.get(0)?,
                accuracy: row.get(1)?,
                errors: row.get(2)?,
                mode: enum_column(3, "mode", &row.get::<_, String>(3)?)?,
                difficulty: enum_column(4, "difficulty", &row.get::<_, String>(4)?)?,
                language: enum_column(5, "language", &row.get::<_, String>(5)?)?,
                duration: row.get(6)?,
                characters_typed: row.get(7)?,
                words_typed: row.get(8)?,
                completed_at,
            })
        })?;

        let mut results = Vec::new();
        for result in rows {
            results.push(result?);
        }
        Ok(results)
    }

    /// Best WPM per user, highest first. Accuracy is taken from the best run.
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        // SQLite fills bare columns from the row that holds the MAX().
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_id, MAX(wpm) AS best_wpm, accuracy, COUNT(*) AS tests
            FROM test_results
            GROUP BY user_id
            ORDER BY best_wpm DESC, user_id ASC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, u32>(3)?,
            ))
        })?;

        let mut board = Vec::new();
        for (idx, row) in rows.enumerate() {
            let (user_id, best_wpm, accuracy, tests) = row?;
            board.push(LeaderboardEntry {
                rank: idx + 1,
                user_id,
                best_wpm,
                accuracy,
                tests,
            });
        }
        Ok(board)
    }
}

impl ResultSink for SqliteResultStore {
    fn submit(&mut self, result: &TestResult) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO test_results
            (user_id, wpm, accuracy, errors, mode, difficulty, language,
             duration, characters_typed, words_typed, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                self.user_id,
                result.wpm,
                result.accuracy,
                result.errors,
                result.mode.to_string(),
                result.difficulty.to_string(),
                result.language.to_string(),
                result.duration,
                result.characters_typed,
                result.words_typed,
                result.completed_at.to_rfc3339(),
            ],
        )?;
        info!("saved result for user {}", self.user_id);
        Ok(())
    }
}

fn enum_column<T: ValueEnum>(idx: usize, name: &str, value: &str) -> rusqlite::Result<T> {
    T::from_str(value, false).map_err(|_| {
        rusqlite::Error::InvalidColumnType(idx, name.to_string(), rusqlite::types::Type::Text)
    })
}
