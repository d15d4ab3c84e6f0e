//! Login password digests.
//!
//! A plain SHA-256 digest is enough to gate casual access to the bot. It is
//! unsalted and fast, so it offers no real protection if the configured
//! digest leaks to an offline attacker.

use data_encoding::HEXLOWER;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Hash a password into a lowercase hex SHA-256 digest
pub fn hash(text: &str) -> String {
    HEXLOWER.encode(&Sha256::digest(text.as_bytes()))
}

/// Check a password against a stored digest in constant time
pub fn verify_hash(text: &str, expected: &str) -> bool {
    let actual = hash(text);
    let expected = expected.trim().to_ascii_lowercase();

    actual.as_bytes().ct_eq(expected.as_bytes()).into()
}
