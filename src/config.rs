use directories::ProjectDirs;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::session::{Difficulty, Language, SessionConfig, TestMode};
use crate::shell::{ShellOptions, DEFAULT_EXTENSION_MARGIN, DEFAULT_TICK_RATE_MS};

/// Persisted preferences. Missing fields take their defaults so older files
/// keep loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub mode: TestMode,
    pub difficulty: Difficulty,
    pub language: Language,
    pub tick_rate_ms: u64,
    pub extension_margin: usize,
    /// Identity for the shared results database; local history when unset.
    pub user: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: TestMode::default(),
            difficulty: Difficulty::default(),
            language: Language::default(),
            tick_rate_ms: DEFAULT_TICK_RATE_MS,
            extension_margin: DEFAULT_EXTENSION_MARGIN,
            user: None,
        }
    }
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            mode: self.mode,
            difficulty: self.difficulty,
            language: self.language,
        }
    }

    pub fn shell_options(&self) -> ShellOptions {
        ShellOptions {
            tick_interval: std::time::Duration::from_millis(self.tick_rate_ms.max(1)),
            extension_margin: self.extension_margin,
        }
    }

    /// Take over the session selection, keeping the runtime knobs.
    pub fn with_session(self, session: &SessionConfig) -> Self {
        Self {
            mode: session.mode,
            difficulty: session.difficulty,
            language: session.language,
            ..self
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "tapline") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("tapline_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        serde_json::from_slice::<Config>(&bytes).unwrap_or_else(|e| {
            warn!("ignoring unreadable config {}: {e}", self.path.display());
            Config::default()
        })
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
