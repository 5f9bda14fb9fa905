use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_COLLEGE: &str = "Unknown";
pub const DEFAULT_DURATION_SECS: u32 = 60;

/// One submitted typing test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub username: String,
    pub college: String,
    pub wpm: f64,
    pub accuracy: f64,
    pub duration_seconds: u32,
}

impl ScoreEntry {
    pub fn new(username: impl Into<String>, wpm: f64, accuracy: f64) -> Self {
        Self {
            username: username.into(),
            college: UNKNOWN_COLLEGE.to_string(),
            wpm,
            accuracy,
            duration_seconds: DEFAULT_DURATION_SECS,
        }
    }

    pub fn with_college(mut self, college: impl Into<String>) -> Self {
        self.college = college.into();
        self
    }

    pub fn with_duration(mut self, duration_seconds: u32) -> Self {
        self.duration_seconds = duration_seconds;
        self
    }
}

/// A score row as it comes back from the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredScore {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub entry: ScoreEntry,
}

/// Per-user leaderboard line derived from every stored attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub username: String,
    pub college: String,
    pub best_wpm: f64,
    pub avg_accuracy: f64,
    pub tests_taken: u32,
}

/// Leaderboard line with its 1-based position, used by the JSON and HTML views
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRow {
    pub rank: usize,
    #[serde(flatten)]
    pub row: LeaderboardRow,
}

pub fn ranked(rows: Vec<LeaderboardRow>) -> Vec<RankedRow> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| RankedRow { rank: i + 1, row })
        .collect()
}

/// Blank college values fall back to "Unknown"
pub fn college_or_unknown(college: Option<&str>) -> String {
    match college.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => UNKNOWN_COLLEGE.to_string(),
    }
}
