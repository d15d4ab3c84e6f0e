//! Session key management.
//!
//! Logging in binds the operator's password to a short random token. The
//! password is stored only encrypted under that token, and the token is
//! never stored at all: it travels in every callback payload and is the
//! only way to get the password back. Secret fields are encrypted under the
//! password, so a request without a valid token cannot read or write them.
//!
//! Sessions expire `reset_interval` after their last use. Each successful
//! unlock slides the window forward.

use crate::crypto::{self, token::DEFAULT_TOKEN_LENGTH};
use crate::database::{Database, Session, User};
use crate::{BotError, Result};
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Default sliding session lifetime
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(600);

/// Default interval of the expired session purge
pub const DEFAULT_SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Result of a login attempt
#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated { session: Session, token: String },
    WrongPassword,
}

/// A session whose token checked out
///
/// Holds the plaintext password for as long as the request needs it; the
/// buffer is wiped on drop.
pub struct UnlockedSession {
    pub user: User,
    pub session: Session,
    master_password: Zeroizing<String>,
}

impl UnlockedSession {
    /// Encrypt a secret field under the master password
    pub fn encrypt_field(&self, value: &str) -> Result<String> {
        Ok(crypto::encrypt(value, &self.master_password)?)
    }

    /// Decrypt a secret field stored under the master password
    pub fn decrypt_field(&self, blob: &str) -> Result<Zeroizing<String>> {
        Ok(Zeroizing::new(crypto::decrypt(blob, &self.master_password)?))
    }
}

impl std::fmt::Debug for UnlockedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnlockedSession")
            .field("user", &self.user)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Creates, unlocks and purges sessions
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    password_hash: String,
    reset_interval: Duration,
    token_length: usize,
}

impl SessionManager {
    /// `password_hash` is the SHA-256 hex digest of the shared password
    pub fn new(db: Database, password_hash: impl Into<String>) -> Self {
        Self {
            db,
            password_hash: password_hash.into(),
            reset_interval: DEFAULT_SESSION_TTL,
            token_length: DEFAULT_TOKEN_LENGTH,
        }
    }

    pub fn with_reset_interval(mut self, reset_interval: Duration) -> Self {
        self.reset_interval = reset_interval;
        self
    }

    pub fn with_token_length(mut self, token_length: usize) -> Self {
        self.token_length = token_length;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Check the password and open a new session
    pub fn login(&self, telegram_id: i64, password: &str) -> Result<LoginOutcome> {
        self.login_at(telegram_id, password, Utc::now().timestamp())
    }

    pub fn login_at(&self, telegram_id: i64, password: &str, now: i64) -> Result<LoginOutcome> {
        if !crypto::verify_hash(password, &self.password_hash) {
            warn!(telegram_id, "Rejected login with wrong password");
            return Ok(LoginOutcome::WrongPassword);
        }

        let user = self.db.get_or_create_user(telegram_id, now)?;
        let token = crypto::random_token(self.token_length);
        let encrypted_password = crypto::encrypt(password, &token)?;

        let session = self.db.insert_session(
            user.user_id,
            &encrypted_password,
            self.reset_interval_secs(),
            now,
        )?;

        info!(telegram_id, session_id = session.session_id, "Session opened");
        Ok(LoginOutcome::Authenticated { session, token })
    }

    /// Recover the master password for a request carrying `token`
    ///
    /// # Errors
    /// `NoActiveSession` when the user has no live session or the token
    /// does not decrypt the latest one.
    pub fn unlock(&self, telegram_id: i64, token: &str) -> Result<UnlockedSession> {
        self.unlock_at(telegram_id, token, Utc::now().timestamp())
    }

    pub fn unlock_at(&self, telegram_id: i64, token: &str, now: i64) -> Result<UnlockedSession> {
        let user = self
            .db
            .find_user(telegram_id)?
            .ok_or(BotError::NoActiveSession)?;
        let mut session = self
            .db
            .latest_active_session(user.user_id, now)?
            .ok_or(BotError::NoActiveSession)?;

        let master_password = match crypto::decrypt(&session.encrypted_password, token) {
            Ok(password) => Zeroizing::new(password),
            Err(e) => {
                debug!(telegram_id, "Session token rejected: {}", e);
                return Err(BotError::NoActiveSession);
            }
        };

        self.db.touch_session(session.session_id, now)?;
        session.updated_at = now;

        Ok(UnlockedSession {
            user,
            session,
            master_password,
        })
    }

    /// The live session of a user, if any, without checking a token
    pub fn active_session(&self, telegram_id: i64) -> Result<Option<Session>> {
        self.active_session_at(telegram_id, Utc::now().timestamp())
    }

    pub fn active_session_at(&self, telegram_id: i64, now: i64) -> Result<Option<Session>> {
        match self.db.find_user(telegram_id)? {
            Some(user) => self.db.latest_active_session(user.user_id, now),
            None => Ok(None),
        }
    }

    /// Delete every expired session
    pub fn purge_expired(&self, now: i64) -> Result<usize> {
        let deleted = self.db.delete_expired_sessions(now)?;
        if deleted > 0 {
            debug!(deleted, "Purged expired sessions");
        }
        Ok(deleted)
    }

    fn reset_interval_secs(&self) -> i64 {
        i64::try_from(self.reset_interval.as_secs()).unwrap_or(i64::MAX)
    }
}
