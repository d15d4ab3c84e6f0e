//! User rows

use super::{Database, User};
use crate::{DatabaseError, Result};
use rusqlite::OptionalExtension;

impl Database {
    /// Find a user by Telegram account id
    pub fn find_user(&self, telegram_id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT user_id, telegram_id, created_at FROM users WHERE telegram_id = ?1",
                [telegram_id],
                |row| {
                    Ok(User {
                        user_id: row.get(0)?,
                        telegram_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(DatabaseError::Sqlite)?;
        Ok(user)
    }

    /// Return the user for a Telegram account, creating it on first use
    pub fn get_or_create_user(&self, telegram_id: i64, now: i64) -> Result<User> {
        {
            let conn = self.conn()?;
            conn.execute(
                "INSERT OR IGNORE INTO users (telegram_id, created_at) VALUES (?1, ?2)",
                [telegram_id, now],
            )
            .map_err(DatabaseError::Sqlite)?;
        }

        self.find_user(telegram_id)?.ok_or_else(|| {
            crate::BotError::NotFound(format!("user for telegram id {}", telegram_id))
        })
    }
}
