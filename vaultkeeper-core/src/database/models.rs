//! Database models for users, sessions and secrets.

/// The operator behind a Telegram account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: i64,
    pub telegram_id: i64,
    pub created_at: i64,
}

/// A login session
///
/// `encrypted_password` is the login password encrypted under the session
/// token. The token itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: i64,
    pub user_id: i64,
    pub encrypted_password: String,
    pub reset_interval_secs: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Session {
    /// Unix timestamp after which the session is expired
    pub fn expires_at(&self) -> i64 {
        self.updated_at.saturating_add(self.reset_interval_secs)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at()
    }
}

/// A stored credential. `login` and `password` hold ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    pub secret_id: i64,
    pub user_id: i64,
    pub title: String,
    pub login: String,
    pub password: String,
    pub site_link: String,
    pub description: String,
    pub created_at: i64,
}

/// A credential about to be inserted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSecret {
    pub user_id: i64,
    pub title: String,
    pub login: String,
    pub password: String,
    pub site_link: String,
    pub description: String,
}

/// Title-only view used to build menu pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSummary {
    pub secret_id: i64,
    pub title: String,
}
