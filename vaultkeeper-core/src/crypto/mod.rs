//! Cryptographic primitives for the bot.
//!
//! This module provides:
//! - AES-256-CBC encryption of secret fields and session blobs
//! - SHA-256 digests for login password checks
//! - Random session tokens

pub mod cipher;
pub mod digest;
pub mod token;

pub use cipher::{decrypt, encrypt};
pub use digest::{hash, verify_hash};
pub use token::random_token;

use thiserror::Error;

/// Errors that can occur in cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Result type for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;
