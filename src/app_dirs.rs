use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("tapline"),
            )
        } else {
            ProjectDirs::from("", "", "tapline").map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    /// Shared results database backing the leaderboard.
    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("results.db"))
    }

    /// Per-machine history of recent results.
    pub fn history_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("history.json"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("tapline.log"))
    }
}
