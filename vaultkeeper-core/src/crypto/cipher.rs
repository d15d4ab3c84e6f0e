//! AES-256-CBC encryption for secret fields and session blobs.
//!
//! Uses AES-256-CBC with:
//! - 256-bit key, the SHA-256 digest of the caller's key material
//! - 128-bit IV, freshly random for every call
//! - PKCS#7 padding, validated on decrypt
//! - Output encoded as base64(iv || ciphertext)

use crate::crypto::{CryptoError, Result};
use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// AES block size, also the IV length
pub const BLOCK_SIZE: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

fn derive_key(key: &str) -> Zeroizing<[u8; 32]> {
    Zeroizing::new(Sha256::digest(key.as_bytes()).into())
}

/// Encrypt a string under the given key material
///
/// Each call draws a new IV from the OS RNG, so encrypting the same
/// plaintext twice yields different blobs.
pub fn encrypt(plaintext: &str, key: &str) -> Result<String> {
    let key = derive_key(key);

    let mut iv = [0u8; BLOCK_SIZE];
    OsRng.fill_bytes(&mut iv);

    let padded = Zeroizing::new(pad(plaintext.as_bytes()));

    let cipher = Aes256CbcEnc::new_from_slices(&key[..], &iv)
        .map_err(|e| CryptoError::EncryptionFailed(format!("{}", e)))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<NoPadding>(&padded);

    let mut blob = Vec::with_capacity(BLOCK_SIZE + ciphertext.len());
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&ciphertext);

    Ok(STANDARD.encode(blob))
}

/// Decrypt a blob produced by [`encrypt`]
///
/// A wrong key is caught by the padding check. Garbage plaintext still
/// carries valid padding about once in 256 tries (a final byte of `0x01`),
/// and the UTF-8 check rejects most of those, so a wrong key is accepted
/// far less often than 1 in 256.
///
/// # Errors
/// `DecryptionFailed` when the blob is not base64, is too short or not
/// block aligned, the padding does not validate, or the plaintext is not
/// UTF-8.
pub fn decrypt(blob: &str, key: &str) -> Result<String> {
    let raw = STANDARD
        .decode(blob.trim())
        .map_err(|e| CryptoError::DecryptionFailed(format!("Invalid base64: {}", e)))?;

    if raw.len() < 2 * BLOCK_SIZE || raw.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::DecryptionFailed(format!(
            "Malformed blob of {} bytes",
            raw.len()
        )));
    }

    let (iv, ciphertext) = raw.split_at(BLOCK_SIZE);
    let key = derive_key(key);

    let cipher = Aes256CbcDec::new_from_slices(&key[..], iv)
        .map_err(|e| CryptoError::DecryptionFailed(format!("{}", e)))?;
    let padded = Zeroizing::new(
        cipher
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed("Ciphertext not block aligned".to_string()))?,
    );

    let plaintext = unpad(&padded)?;
    String::from_utf8(plaintext.to_vec())
        .map_err(|_| CryptoError::DecryptionFailed("Invalid UTF-8".to_string()))
}

/// Apply PKCS#7 padding. Always adds between 1 and `BLOCK_SIZE` bytes.
pub(crate) fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);
    padded
}

/// Strip PKCS#7 padding, rejecting anything that is not well formed.
pub(crate) fn unpad(data: &[u8]) -> Result<&[u8]> {
    let pad_len = match data.last() {
        Some(&last) => last as usize,
        None => {
            return Err(CryptoError::DecryptionFailed(
                "Empty plaintext".to_string(),
            ))
        }
    };

    if pad_len == 0 || pad_len > BLOCK_SIZE || pad_len > data.len() {
        return Err(CryptoError::DecryptionFailed(format!(
            "Invalid padding length {}",
            pad_len
        )));
    }

    let (body, padding) = data.split_at(data.len() - pad_len);
    if padding.iter().any(|&b| b as usize != pad_len) {
        return Err(CryptoError::DecryptionFailed(
            "Inconsistent padding bytes".to_string(),
        ));
    }

    Ok(body)
}
