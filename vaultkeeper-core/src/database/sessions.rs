//! Session rows

use super::{Database, Session};
use crate::{DatabaseError, Result};
use rusqlite::{params, OptionalExtension, Row};

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        session_id: row.get(0)?,
        user_id: row.get(1)?,
        encrypted_password: row.get(2)?,
        reset_interval_secs: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl Database {
    /// Store a new session
    pub fn insert_session(
        &self,
        user_id: i64,
        encrypted_password: &str,
        reset_interval_secs: i64,
        now: i64,
    ) -> Result<Session> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (user_id, encrypted_password, reset_interval_secs, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![user_id, encrypted_password, reset_interval_secs, now],
        )
        .map_err(DatabaseError::Sqlite)?;

        Ok(Session {
            session_id: conn.last_insert_rowid(),
            user_id,
            encrypted_password: encrypted_password.to_string(),
            reset_interval_secs,
            created_at: now,
            updated_at: now,
        })
    }

    /// The most recently created session of a user that has not expired
    pub fn latest_active_session(&self, user_id: i64, now: i64) -> Result<Option<Session>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                "SELECT session_id, user_id, encrypted_password, reset_interval_secs, created_at, updated_at
                 FROM sessions
                 WHERE user_id = ?1 AND updated_at + reset_interval_secs >= ?2
                 ORDER BY created_at DESC, session_id DESC
                 LIMIT 1",
                params![user_id, now],
                session_from_row,
            )
            .optional()
            .map_err(DatabaseError::Sqlite)?;
        Ok(session)
    }

    /// Slide the expiry window of a session forward
    pub fn touch_session(&self, session_id: i64, now: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE sessions SET updated_at = ?1 WHERE session_id = ?2",
            params![now, session_id],
        )
        .map_err(DatabaseError::Sqlite)?;
        Ok(())
    }

    /// Delete every session past its expiry; returns the number removed
    pub fn delete_expired_sessions(&self, now: i64) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM sessions WHERE updated_at + reset_interval_secs < ?1",
                [now],
            )
            .map_err(DatabaseError::Sqlite)?;
        Ok(deleted)
    }
}
