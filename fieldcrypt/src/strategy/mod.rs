//! Cipher strategies: named, pluggable encrypt/decrypt algorithms.
//!
//! Every strategy produces self-describing ciphertext of the form
//! `{NAME}base64(raw)`. The marker lets [`CryptoStrategy::decrypt`] tell its
//! own ciphertext apart from plaintext, legacy rows or another strategy's
//! output, all of which are passed through unchanged.

mod aes;
mod chacha;

pub use aes::AesStrategy;
pub use chacha::ChaChaStrategy;

use crate::error::{DecryptionError, Error};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;

/// A named encrypt/decrypt algorithm bound to a key.
///
/// Implementations are immutable after construction and shared between
/// threads behind an `Arc`.
///
/// # Example
///
/// ```
/// use fieldcrypt::strategy::{AesStrategy, CryptoStrategy};
///
/// let aes = AesStrategy::new("1234567890123456").expect("valid key");
/// let sealed = aes.encrypt("user1@example.com").unwrap();
/// assert!(sealed.starts_with("{AES}"));
/// assert_eq!(aes.decrypt(&sealed).unwrap(), "user1@example.com");
/// assert_eq!(aes.decrypt("not encrypted").unwrap(), "not encrypted");
/// ```
pub trait CryptoStrategy: Send + Sync + fmt::Debug {
    /// Registration key of the strategy.
    fn name(&self) -> &str;

    /// Ciphertext marker owned by this strategy.
    fn marker(&self) -> &Marker;

    /// Whether equal plaintexts always produce equal ciphertexts.
    ///
    /// Only deterministic strategies can serve equality and `IN` predicates.
    fn is_deterministic(&self) -> bool;

    /// Encrypts `plaintext` into a marked string. Empty input stays empty.
    ///
    /// # Errors
    ///
    /// Returns `Error::EncryptionFailed` if the underlying cipher fails.
    fn encrypt(&self, plaintext: &str) -> Result<String, Error>;

    /// Decrypts a marked string. Unmarked input (including `""`) is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decryption` if a marked value cannot be decoded or
    /// authenticated.
    fn decrypt(&self, value: &str) -> Result<String, Error>;

    /// The literal prefix every ciphertext of this strategy starts with.
    fn prefix(&self) -> &str {
        self.marker().as_str()
    }

    /// Returns `true` if `value` already carries this strategy's marker.
    fn is_encrypted(&self, value: &str) -> bool {
        self.marker().is_marked(value)
    }
}

/// The `{NAME}` prefix framing a strategy's base64 ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    prefix: String,
}

impl Marker {
    /// Creates the marker `{NAME}` for a strategy name (uppercased).
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self { prefix: format!("{{{}}}", name.to_uppercase()) }
    }

    /// Returns the prefix text, braces included.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// Returns `true` if `value` starts with this marker.
    #[must_use]
    pub fn is_marked(&self, value: &str) -> bool {
        value.starts_with(&self.prefix)
    }

    /// Frames raw cipher output as `{NAME}base64(raw)`.
    #[must_use]
    pub fn seal(&self, raw: &[u8]) -> String {
        let mut out = String::with_capacity(self.prefix.len() + raw.len() * 4 / 3 + 4);
        out.push_str(&self.prefix);
        STANDARD.encode_string(raw, &mut out);
        out
    }

    /// Strips the marker and decodes the payload.
    ///
    /// Returns `Ok(None)` when `value` is not marked.
    ///
    /// # Errors
    ///
    /// Returns `DecryptionError::InvalidEncoding` if the payload is not base64.
    pub fn open(&self, value: &str) -> Result<Option<Vec<u8>>, DecryptionError> {
        let Some(payload) = value.strip_prefix(self.prefix.as_str()) else {
            return Ok(None);
        };

        STANDARD.decode(payload).map(Some).map_err(|source| DecryptionError::InvalidEncoding {
            strategy: self.name().to_string(),
            source,
        })
    }

    fn name(&self) -> &str {
        &self.prefix[1..self.prefix.len() - 1]
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}
