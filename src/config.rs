use crate::app_dirs::AppDirs;
use crate::leaderboard::DEFAULT_LIMIT;
use crate::moderation::{ModerationPolicy, ModerationRules};
use crate::session::DEFAULT_SESSION_DAYS;
use crate::store::SqliteScoreStore;
use crate::submission::SubmitPolicy;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest session lifetime a settings file may ask for
pub const MAX_SESSION_DAYS: i64 = 365;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
    #[error("invalid blocked identity pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub bind_address: String,
    pub port: u16,
    pub database_path: Option<PathBuf>,
    pub leaderboard_limit: usize,
    pub submit_policy: SubmitPolicy,
    pub admin_token: Option<String>,
    pub secure_cookies: bool,
    pub session_days: i64,
    pub moderation: ModerationRules,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            database_path: None,
            leaderboard_limit: DEFAULT_LIMIT,
            submit_policy: SubmitPolicy::default(),
            admin_token: None,
            secure_cookies: true,
            session_days: DEFAULT_SESSION_DAYS,
            moderation: ModerationRules::default(),
        }
    }
}

impl Settings {
    /// Apply `PORT`, `BIND_ADDRESS`, `TYPEBOARD_DATABASE`,
    /// `TYPEBOARD_ADMIN_TOKEN` and `TYPEBOARD_SUBMIT_POLICY` from the environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = var("PORT") {
            self.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(addr) = var("BIND_ADDRESS") {
            self.bind_address = addr;
        }
        if let Some(path) = var("TYPEBOARD_DATABASE") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(token) = var("TYPEBOARD_ADMIN_TOKEN") {
            self.admin_token = Some(token);
        }
        if let Some(policy) = var("TYPEBOARD_SUBMIT_POLICY") {
            self.submit_policy =
                SubmitPolicy::from_str(policy.trim(), true).map_err(|_| ConfigError::Invalid {
                    key: "TYPEBOARD_SUBMIT_POLICY",
                    value: policy.clone(),
                })?;
        }

        Ok(())
    }

    pub fn moderation_policy(&self) -> Result<ModerationPolicy, ConfigError> {
        Ok(ModerationPolicy::from_rules(&self.moderation)?)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(SqliteScoreStore::default_path)
    }

    /// Values below one day are raised to one; above [`MAX_SESSION_DAYS`] is an error
    pub fn session_lifetime(&self) -> Result<chrono::Duration, ConfigError> {
        if self.session_days > MAX_SESSION_DAYS {
            return Err(ConfigError::Invalid {
                key: "session_days",
                value: self.session_days.to_string(),
            });
        }
        Ok(chrono::Duration::days(self.session_days.max(1)))
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

pub trait SettingsStore {
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::settings_path().unwrap_or_else(|| PathBuf::from("typeboard.json"));
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

    /// Like [`SettingsStore::load`], but a file that exists and does not
    /// parse is an error instead of silently becoming the defaults
    pub fn load_strict(&self) -> Result<Settings, ConfigError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for FileSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Settings {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(settings) = serde_json::from_slice::<Settings>(&bytes) {
                return settings;
            }
        }
        Settings::default()
    }

    fn save(&self, settings: &Settings) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(settings).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
