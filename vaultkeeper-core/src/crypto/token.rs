//! Random session tokens

use rand::rngs::OsRng;
use rand::Rng;

/// Characters a session token may contain
pub const TOKEN_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789?_!-";

/// Default token length, short enough to fit callback payloads
pub const DEFAULT_TOKEN_LENGTH: usize = 8;

/// Generate a random token from [`TOKEN_ALPHABET`] using the OS RNG
pub fn random_token(length: usize) -> String {
    let mut rng = OsRng;

    (0..length)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}
