use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest accepted chirp body, counted in characters.
pub const MAX_CHIRP_LENGTH: usize = 140;

/// Replacement for any banned word found in a chirp body.
pub const MASK: &str = "****";

const BANNED_WORDS: &[&str] = &["kerfuffle", "sharbert", "fornax"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chirp {
    pub id: i64,
    pub body: String,
    pub user_id: i64,
}

/// A stored account. `password` is always an Argon2 PHC string, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default)]
    pub is_chirpy_red: bool,
}

/// Opaque refresh credential. At most one exists per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("chirp is too long")]
    ChirpTooLong,
    #[error("email is required")]
    EmptyEmail,
    #[error("password is required")]
    EmptyPassword,
}

/// Check a chirp body against the length limit and mask banned words.
///
/// Words are split on single spaces so the original spacing survives the
/// rewrite; matching is case-insensitive and only whole words are masked.
pub fn clean_chirp_body(body: &str) -> Result<String, ValidationError> {
    if body.chars().count() > MAX_CHIRP_LENGTH {
        return Err(ValidationError::ChirpTooLong);
    }

    let cleaned = body
        .split(' ')
        .map(|word| {
            if BANNED_WORDS.contains(&word.to_lowercase().as_str()) {
                MASK
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    Ok(cleaned)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
