//! Secret rows

use super::{Database, NewSecret, Secret, SecretSummary};
use crate::{DatabaseError, Result};
use rusqlite::{params, OptionalExtension};

impl Database {
    /// Insert a secret and return its id
    pub fn insert_secret(&self, secret: &NewSecret, now: i64) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO secrets (user_id, title, login, password, site_link, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                secret.user_id,
                secret.title,
                secret.login,
                secret.password,
                secret.site_link,
                secret.description,
                now,
            ],
        )
        .map_err(DatabaseError::Sqlite)?;
        Ok(conn.last_insert_rowid())
    }

    /// Number of secrets owned by a user
    pub fn count_secrets(&self, user_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn
            .query_row(
                "SELECT COUNT(*) FROM secrets WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .map_err(DatabaseError::Sqlite)?;
        Ok(count)
    }

    /// One page of secret titles, oldest first
    pub fn list_secrets(&self, user_id: i64, offset: i64, limit: i64) -> Result<Vec<SecretSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT secret_id, title FROM secrets
                 WHERE user_id = ?1
                 ORDER BY secret_id
                 LIMIT ?2 OFFSET ?3",
            )
            .map_err(DatabaseError::Sqlite)?;

        let rows = stmt
            .query_map(params![user_id, limit, offset], |row| {
                Ok(SecretSummary {
                    secret_id: row.get(0)?,
                    title: row.get(1)?,
                })
            })
            .map_err(DatabaseError::Sqlite)?;

        let mut secrets = Vec::new();
        for row in rows {
            secrets.push(row.map_err(DatabaseError::Sqlite)?);
        }
        Ok(secrets)
    }

    /// Load one secret owned by the user
    pub fn get_secret(&self, user_id: i64, secret_id: i64) -> Result<Option<Secret>> {
        let conn = self.conn()?;
        let secret = conn
            .query_row(
                "SELECT secret_id, user_id, title, login, password, site_link, description, created_at
                 FROM secrets WHERE secret_id = ?1 AND user_id = ?2",
                params![secret_id, user_id],
                |row| {
                    Ok(Secret {
                        secret_id: row.get(0)?,
                        user_id: row.get(1)?,
                        title: row.get(2)?,
                        login: row.get(3)?,
                        password: row.get(4)?,
                        site_link: row.get(5)?,
                        description: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                },
            )
            .optional()
            .map_err(DatabaseError::Sqlite)?;
        Ok(secret)
    }

    /// Delete one secret owned by the user; returns whether a row was removed
    pub fn delete_secret(&self, user_id: i64, secret_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM secrets WHERE secret_id = ?1 AND user_id = ?2",
                params![secret_id, user_id],
            )
            .map_err(DatabaseError::Sqlite)?;
        Ok(deleted > 0)
    }
}
