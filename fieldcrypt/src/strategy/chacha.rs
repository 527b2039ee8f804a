//! Randomized ChaCha20-Poly1305 strategy.

use chacha20poly1305::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    ChaCha20Poly1305, Nonce,
};
use secrecy::{ExposeSecret, SecretVec};
use std::fmt;

use super::{CryptoStrategy, Marker};
use crate::error::{DecryptionError, Error};
use crate::kdf::derive_key;

/// Key size for ChaCha20-Poly1305 (256 bits).
const KEY_SIZE: usize = 32;

/// Nonce size for ChaCha20-Poly1305 (96 bits).
const NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag size.
const TAG_SIZE: usize = 16;

/// Randomized field encryption with ChaCha20-Poly1305.
///
/// A fresh nonce is drawn for every call and stored in front of the
/// ciphertext, so encrypting the same value twice yields different output.
/// Fields using this strategy round-trip through create, update and read, but
/// can never be matched by an equality or `IN` predicate.
pub struct ChaChaStrategy {
    key: SecretVec<u8>,
    marker: Marker,
}

impl ChaChaStrategy {
    /// Registration name of this strategy.
    pub const NAME: &'static str = "CHACHA20";

    /// Creates the strategy from raw key material.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidKey` if the key material is empty.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Result<Self, Error> {
        let material = SecretVec::new(secret_key.as_ref().to_vec());
        let key = derive_key(&material, b"fieldcrypt:CHACHA20-POLY1305", KEY_SIZE)?;

        Ok(Self { key: SecretVec::new(key.to_vec()), marker: Marker::new(Self::NAME) })
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305, Error> {
        ChaCha20Poly1305::new_from_slice(self.key.expose_secret())
            .map_err(|e| {
                Error::InvalidKey(format!("failed to create ChaCha20-Poly1305 cipher: {e}"))
            })
    }
}

impl CryptoStrategy for ChaChaStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn marker(&self) -> &Marker {
        &self.marker
    }

    fn is_deterministic(&self) -> bool {
        false
    }

    fn encrypt(&self, plaintext: &str) -> Result<String, Error> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(&nonce, Payload { msg: plaintext.as_bytes(), aad: Self::NAME.as_bytes() })
            .map_err(|e| {
                Error::EncryptionFailed(format!("ChaCha20-Poly1305 encryption failed: {e}"))
            })?;

        // [nonce][ciphertext + tag]
        let mut raw = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        raw.extend_from_slice(&nonce_bytes);
        raw.extend_from_slice(&ciphertext);

        Ok(self.marker.seal(&raw))
    }

    fn decrypt(&self, value: &str) -> Result<String, Error> {
        let Some(raw) = self.marker.open(value)? else {
            return Ok(value.to_string());
        };

        if raw.len() < NONCE_SIZE + TAG_SIZE {
            let len = raw.len();
            let err = DecryptionError::Truncated { strategy: Self::NAME.to_string(), len };
            return Err(err.into());
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher()?
            .decrypt(nonce, Payload { msg: ciphertext, aad: Self::NAME.as_bytes() })
            .map_err(|_| {
                DecryptionError::AuthenticationFailed { strategy: Self::NAME.to_string() }
            })?;

        String::from_utf8(plaintext).map_err(|source| {
            DecryptionError::InvalidUtf8 { strategy: Self::NAME.to_string(), source }.into()
        })
    }
}

impl fmt::Debug for ChaChaStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaChaStrategy")
            .field("marker", &self.marker.as_str())
            .finish_non_exhaustive()
    }
}
