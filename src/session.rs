use crate::moderation::{ModerationPolicy, UsernameRejection};
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

pub const DEFAULT_SESSION_DAYS: i64 = 7;
const TOKEN_LEN: usize = 48;

/// Who the current request belongs to. Trusted as typed at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub sap_id: String,
    pub username: String,
    pub college: Option<String>,
}

/// Fields of the login form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "sap-id")]
    pub sap_id: String,
    pub name: Option<String>,
    pub college: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("Email and SAP ID are required.")]
    MissingCredentials,
    #[error(transparent)]
    Rejected(#[from] UsernameRejection),
}

/// Turn a login form into an identity. The display name, if given, is the
/// username; otherwise the part of the email before `@` with punctuation
/// turned into underscores.
pub fn establish_identity(
    form: &LoginForm,
    policy: &ModerationPolicy,
) -> Result<Identity, LoginError> {
    let email = form.email.trim();
    let sap_id = form.sap_id.trim();
    if email.is_empty() || sap_id.is_empty() {
        return Err(LoginError::MissingCredentials);
    }

    let username = match form.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            let prefix = email.split('@').next().unwrap_or(email);
            // Content rules still see the address as typed
            if let Err(
                reason @ (UsernameRejection::Inappropriate | UsernameRejection::BlockedIdentity),
            ) = policy.validate(prefix)
            {
                return Err(reason.into());
            }
            username_from_email(prefix)
        }
    };

    policy.validate(&username)?;

    let college = form
        .college
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    Ok(Identity {
        email: email.to_string(),
        sap_id: sap_id.to_string(),
        username,
        college,
    })
}

/// `first.last` becomes `first_last`; anything outside letters, digits and
/// underscores maps to `_`
fn username_from_email(prefix: &str) -> String {
    prefix
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[derive(Debug, Clone)]
struct SessionRecord {
    identity: Identity,
    expires_at: DateTime<Utc>,
}

/// Server-side session table keyed by an opaque cookie token.
/// Each successful lookup pushes the expiry forward by the full lifetime.
#[derive(Debug)]
pub struct SessionStore {
    lifetime: Duration,
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl SessionStore {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn create(&self, identity: Identity) -> String {
        self.create_at(identity, Utc::now())
    }

    pub fn create_at(&self, identity: Identity, now: DateTime<Utc>) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();

        let mut sessions = self.lock();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(
            token.clone(),
            SessionRecord {
                identity,
                expires_at: now + self.lifetime,
            },
        );
        token
    }

    pub fn get(&self, token: &str) -> Option<Identity> {
        self.get_at(token, Utc::now())
    }

    pub fn get_at(&self, token: &str, now: DateTime<Utc>) -> Option<Identity> {
        let mut sessions = self.lock();
        let expired = match sessions.get_mut(token) {
            Some(record) if record.expires_at > now => {
                record.expires_at = now + self.lifetime;
                return Some(record.identity.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            sessions.remove(token);
        }
        None
    }

    pub fn remove(&self, token: &str) -> Option<Identity> {
        self.lock().remove(token).map(|r| r.identity)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Records are inserted and removed whole, so a poisoned map is still consistent
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionRecord>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::days(DEFAULT_SESSION_DAYS))
    }
}
