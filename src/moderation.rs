use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 30;

/// Why a username was turned away. The display string is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UsernameRejection {
    #[error("Username contains inappropriate content.")]
    Inappropriate,
    #[error("This username is not allowed.")]
    BlockedIdentity,
    #[error("Username must be at least 3 characters long.")]
    TooShort,
    #[error("Username must be at most 30 characters long.")]
    TooLong,
    #[error("Username can only contain letters, numbers, and underscores.")]
    InvalidCharacters,
}

/// A protected or abused name, matched as a regex against the lower-cased candidate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockedIdentity {
    pub label: String,
    pub pattern: String,
}

/// Moderation word lists as they appear in the settings file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModerationRules {
    pub blocked_terms: Vec<String>,
    pub blocked_identities: Vec<BlockedIdentity>,
}

impl Default for ModerationRules {
    fn default() -> Self {
        let blocked_terms = [
            "fuck",
            "shit",
            "bitch",
            "bastard",
            "asshole",
            "cunt",
            "whore",
            "slut",
            "teri maa",
            "maa ka",
            "ka client",
            "madarchod",
            "behenchod",
            "bhenchod",
            "chutiya",
            "bhosdi",
            "gandu",
        ];

        Self {
            blocked_terms: blocked_terms.iter().map(|t| t.to_string()).collect(),
            blocked_identities: vec![BlockedIdentity {
                label: "riya".to_string(),
                pattern: r"^r\s*[iey]+\s*y?\s*a+(?:\b|_)".to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone)]
struct BlockedTerm {
    lowered: String,
    stripped: String,
}

#[derive(Debug, Clone)]
struct IdentityMatcher {
    label: String,
    regex: Regex,
}

/// Compiled username policy. Construct once, then call [`ModerationPolicy::validate`].
#[derive(Debug, Clone)]
pub struct ModerationPolicy {
    terms: Vec<BlockedTerm>,
    identities: Vec<IdentityMatcher>,
}

impl ModerationPolicy {
    pub fn from_rules(rules: &ModerationRules) -> Result<Self, regex::Error> {
        let terms = rules
            .blocked_terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .map(|lowered| BlockedTerm {
                stripped: strip_separators(&lowered),
                lowered,
            })
            .collect();

        let identities = rules
            .blocked_identities
            .iter()
            .map(|id| {
                Ok(IdentityMatcher {
                    label: id.label.clone(),
                    regex: Regex::new(&id.pattern)?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { terms, identities })
    }

    /// Checks run in order and the first failure wins: content, blocked
    /// identities, minimum length, maximum length, character set.
    pub fn validate(&self, candidate: &str) -> Result<(), UsernameRejection> {
        let lowered = candidate.to_lowercase();

        if self.contains_blocked_term(&lowered) {
            return Err(UsernameRejection::Inappropriate);
        }

        if let Some(label) = self.matching_identity(&lowered) {
            log::debug!("username {:?} matched blocked identity {}", candidate, label);
            return Err(UsernameRejection::BlockedIdentity);
        }

        let len = candidate.chars().count();
        if len < MIN_USERNAME_LEN {
            return Err(UsernameRejection::TooShort);
        }
        if len > MAX_USERNAME_LEN {
            return Err(UsernameRejection::TooLong);
        }

        let without_underscores: String = candidate.chars().filter(|&c| c != '_').collect();
        if without_underscores.is_empty() || !without_underscores.chars().all(char::is_alphanumeric)
        {
            return Err(UsernameRejection::InvalidCharacters);
        }

        Ok(())
    }

    /// Tuple form of [`validate`](Self::validate): `(true, "")` when accepted.
    pub fn verdict(&self, candidate: &str) -> (bool, String) {
        match self.validate(candidate) {
            Ok(()) => (true, String::new()),
            Err(reason) => (false, reason.to_string()),
        }
    }

    fn contains_blocked_term(&self, lowered: &str) -> bool {
        if self.terms.iter().any(|t| lowered.contains(&t.lowered)) {
            return true;
        }

        // "m.a.a k.a" style spacing and dotting
        let stripped = strip_separators(lowered);
        self.terms
            .iter()
            .filter(|t| !t.stripped.is_empty())
            .any(|t| stripped.contains(&t.stripped))
    }

    fn matching_identity(&self, lowered: &str) -> Option<&str> {
        self.identities
            .iter()
            .find(|id| id.regex.is_match(lowered))
            .map(|id| id.label.as_str())
    }
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self::from_rules(&ModerationRules::default())
            .unwrap_or_else(|_| unreachable!("built-in identity patterns are valid"))
    }
}

fn strip_separators(s: &str) -> String {
    s.chars().filter(|&c| c != '.' && !c.is_whitespace()).collect()
}
