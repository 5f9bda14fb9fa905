use crate::score::{college_or_unknown, ScoreEntry, DEFAULT_DURATION_SECS};
use crate::session::Identity;
use crate::store::{ScoreStore, StoreError};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LEADERBOARD_REDIRECT: &str = "/leaderboard";

/// What happens to a user's earlier rows when they submit again
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubmitPolicy {
    /// Keep every attempt; the leaderboard aggregates them
    #[default]
    Append,
    /// Delete the user's earlier rows before inserting the new one
    Replace,
}

/// JSON body of `POST /submit_result`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResultPayload {
    pub wpm: Option<f64>,
    pub accuracy: Option<f64>,
    pub duration_seconds: Option<u32>,
    pub college: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitReceipt {
    pub redirect: &'static str,
    pub replaced: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("Not logged in")]
    Unauthenticated,
    #[error("Missing required field: {0}")]
    MissingData(&'static str),
    #[error("Invalid {0}")]
    InvalidData(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Check the payload against the session and build the row to store.
/// Zero counts as missing for `wpm` and `accuracy`.
pub fn build_entry(
    identity: Option<&Identity>,
    payload: &ResultPayload,
) -> Result<ScoreEntry, SubmitError> {
    let identity = identity.ok_or(SubmitError::Unauthenticated)?;

    let wpm = payload
        .wpm
        .filter(|w| *w != 0.0)
        .ok_or(SubmitError::MissingData("wpm"))?;
    let accuracy = payload
        .accuracy
        .filter(|a| *a != 0.0)
        .ok_or(SubmitError::MissingData("accuracy"))?;

    if !wpm.is_finite() || wpm < 0.0 {
        return Err(SubmitError::InvalidData("wpm"));
    }
    if !accuracy.is_finite() || !(0.0..=100.0).contains(&accuracy) {
        return Err(SubmitError::InvalidData("accuracy"));
    }

    let duration_seconds = match payload.duration_seconds {
        None => DEFAULT_DURATION_SECS,
        Some(0) => return Err(SubmitError::InvalidData("duration_seconds")),
        Some(secs) => secs,
    };

    let college = payload
        .college
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .or(identity.college.as_deref());

    Ok(ScoreEntry {
        username: identity.username.clone(),
        college: college_or_unknown(college),
        wpm,
        accuracy,
        duration_seconds,
    })
}

/// Validate a submission and write it under `policy`. Store failures are
/// logged and returned as-is, never retried.
pub fn submit(
    store: &dyn ScoreStore,
    policy: SubmitPolicy,
    identity: Option<&Identity>,
    payload: &ResultPayload,
) -> Result<SubmitReceipt, SubmitError> {
    let entry = build_entry(identity, payload)?;

    let written = match policy {
        SubmitPolicy::Append => store.insert(&entry).map(|_| 0),
        SubmitPolicy::Replace => store.replace(&entry).map(|(_, removed)| removed),
    };

    match written {
        Ok(replaced) => {
            log::info!(
                "stored {} wpm / {}% for {} ({} policy)",
                entry.wpm,
                entry.accuracy,
                entry.username,
                policy
            );
            Ok(SubmitReceipt {
                redirect: LEADERBOARD_REDIRECT,
                replaced,
            })
        }
        Err(err) => {
            log::error!("failed to store score for {}: {}", entry.username, err);
            Err(err.into())
        }
    }
}
