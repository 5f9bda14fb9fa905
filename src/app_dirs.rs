use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "typeboard";

/// Where the service keeps its database and settings
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME)
    }

    /// `$XDG_STATE_HOME/typeboard/scores.db`, falling back to
    /// `~/.local/state/typeboard/scores.db`
    pub fn db_path() -> Option<PathBuf> {
        let state_home = std::env::var_os("XDG_STATE_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("state"))
            });

        match state_home {
            Some(dir) => Some(dir.join(APP_NAME).join("scores.db")),
            None => Self::project().map(|p| p.data_local_dir().join("scores.db")),
        }
    }

    pub fn settings_path() -> Option<PathBuf> {
        Self::project().map(|p| p.config_dir().join("settings.json"))
    }
}
