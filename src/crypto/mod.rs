//! AES-256-GCM encryption for OAuth tokens at rest.
//!
//! The 256-bit key is derived once at startup as the SHA-256 digest of the
//! configured secret and is read-only for the life of the process. Every
//! encryption draws a fresh random nonce; the stored blob is
//! `nonce || authTag || ciphertext`, base64-encoded.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Size of the nonce in bytes (96 bits, standard for GCM)
const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes
const TAG_SIZE: usize = 16;

/// Authenticated cipher for token custody.
///
/// Constructed once at startup and passed to every component that needs it;
/// the key never leaves memory and is never persisted.
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    /// Derive the process-wide key from the configured secret.
    ///
    /// An absent or empty secret is a fatal startup condition, not a
    /// per-call error.
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Configuration(
                "token encryption secret is not set".to_string(),
            ));
        }

        let key = Sha256::digest(secret.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|_| Error::Configuration("derived cipher key has invalid length".to_string()))?;

        Ok(Self { cipher })
    }

    /// Encrypt a token for storage.
    ///
    /// Non-deterministic: every call generates a fresh random nonce, so the
    /// same plaintext yields a different blob each time.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        // ciphertext || tag, per the aes-gcm crate layout
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .expect("AES-GCM encryption cannot fail with a valid key and nonce");
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);

        let mut blob = Vec::with_capacity(NONCE_SIZE + TAG_SIZE + ciphertext.len());
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(tag);
        blob.extend_from_slice(ciphertext);

        BASE64.encode(&blob)
    }

    /// Decrypt a stored blob.
    ///
    /// Fails with [`Error::Integrity`] when the blob is structurally corrupt
    /// or the authentication tag does not verify (tampered data or a key
    /// rotation mismatch).
    pub fn decrypt(&self, blob: &str) -> Result<String> {
        let data = BASE64.decode(blob).map_err(|_| Error::Integrity)?;

        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(Error::Integrity);
        }

        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        let tag = &data[NONCE_SIZE..NONCE_SIZE + TAG_SIZE];
        let ciphertext = &data[NONCE_SIZE + TAG_SIZE..];

        // Reassemble into the ciphertext || tag layout the crate expects
        let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);

        let plaintext = self
            .cipher
            .decrypt(nonce, sealed.as_ref())
            .map_err(|_| Error::Integrity)?;

        String::from_utf8(plaintext).map_err(|_| Error::Integrity)
    }
}
