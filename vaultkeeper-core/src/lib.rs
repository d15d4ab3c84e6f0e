//! Vaultkeeper Core Library
//!
//! This library provides the core of the chat password manager: session
//! scoped encryption, the conversation step registry, update routing and
//! the bot actions built on top of them.

pub mod actions;
pub mod bot;
pub mod callback;
pub mod crypto;
pub mod database;
pub mod dispatch;
pub mod pagination;
pub mod session;
pub mod steps;
pub mod transport;

pub use bot::{Bot, BotSettings};
pub use callback::{CallbackAction, CallbackPayload};
pub use crypto::{decrypt, encrypt, hash, random_token, verify_hash, CryptoError};
pub use database::{Database, Secret, Session, User};
pub use dispatch::{Filter, Handler, Request, Route, Router};
pub use pagination::Page;
pub use session::{LoginOutcome, SessionManager, UnlockedSession};
pub use steps::{Step, StepAction, StepKey, StepRegistry};
pub use transport::{
    CallbackQuery, IncomingMessage, InlineButton, InlineKeyboard, OutgoingMessage, Transport,
    Update,
};

use thiserror::Error;

/// Result type for bot operations
pub type Result<T> = std::result::Result<T, BotError>;

/// Storage layer errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Lock error: {0}")]
    Lock(String),
}

/// General error type for bot operations
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("No active session")]
    NoActiveSession,

    #[error("Command received while a conversation step is pending")]
    CommandDuringStep,

    #[error("Malformed callback payload: {0}")]
    MalformedCallbackPayload(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),
}
