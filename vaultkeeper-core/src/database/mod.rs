//! Database layer for the bot.
//!
//! Users, sessions and secrets live in SQLite. Logins and passwords arrive
//! here already encrypted; this layer never sees them in plaintext.

pub mod models;
pub mod schema;

mod secrets;
mod sessions;
mod users;

pub use models::{NewSecret, Secret, SecretSummary, Session, User};
pub use schema::Database;
