//! Deterministic AES-256-SIV strategy.
//!
//! AES-SIV (Synthetic IV) is a misuse-resistant authenticated encryption mode
//! that produces the same ciphertext for the same plaintext and key. That
//! property is what lets the query interceptor rewrite `WHERE email = ?` into
//! a comparison against the stored ciphertext.
//!
//! # Security Warning
//!
//! Deterministic encryption reveals equality patterns between rows. Use
//! [`ChaChaStrategy`](super::ChaChaStrategy) for fields that are never
//! filtered on.
//!
//! # Compatibility
//!
//! The `{AES}` marker is shared with older AES-ECB field encryptors, but the
//! payload is not. Values written by such an encryptor fail authentication
//! here and abort the read; they must be re-encrypted before switching over.

use aes_siv::{
    aead::{Aead, KeyInit, Payload},
    Aes256SivAead,
};
use secrecy::{ExposeSecret, SecretVec};
use std::fmt;

use super::{CryptoStrategy, Marker};
use crate::error::{DecryptionError, Error};
use crate::kdf::derive_key;

/// AES-256-SIV requires a 64-byte key (two 256-bit halves).
const KEY_SIZE: usize = 64;

/// Length of the synthetic IV prepended to every SIV ciphertext.
const TAG_SIZE: usize = 16;

/// Deterministic field encryption with AES-256-SIV.
///
/// The cipher key is expanded from the supplied key material with HKDF, so
/// any non-empty secret works, including the 16-character keys commonly kept
/// in application settings.
///
/// This is not a drop-in reader for `{AES}` values produced by AES-ECB
/// encryptors: those fail with `DecryptionError::AuthenticationFailed`.
///
/// # Example
///
/// ```
/// use fieldcrypt::strategy::{AesStrategy, CryptoStrategy};
///
/// let aes = AesStrategy::new("1234567890123456")?;
/// let a = aes.encrypt("user1@example.com")?;
/// let b = aes.encrypt("user1@example.com")?;
/// assert_eq!(a, b); // Deterministic!
/// # Ok::<(), fieldcrypt::error::Error>(())
/// ```
pub struct AesStrategy {
    key: SecretVec<u8>,
    marker: Marker,
}

impl AesStrategy {
    /// Registration name of this strategy.
    pub const NAME: &'static str = "AES";

    /// Creates the strategy from raw key material.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidKey` if the key material is empty.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Result<Self, Error> {
        let material = SecretVec::new(secret_key.as_ref().to_vec());
        let key = derive_key(&material, b"fieldcrypt:AES-256-SIV", KEY_SIZE)?;

        Ok(Self { key: SecretVec::new(key.to_vec()), marker: Marker::new(Self::NAME) })
    }

    fn cipher(&self) -> Result<Aes256SivAead, Error> {
        Aes256SivAead::new_from_slice(self.key.expose_secret())
            .map_err(|e| Error::InvalidKey(format!("failed to create AES-SIV cipher: {e}")))
    }
}

impl CryptoStrategy for AesStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn marker(&self) -> &Marker {
        &self.marker
    }

    fn is_deterministic(&self) -> bool {
        true
    }

    fn encrypt(&self, plaintext: &str) -> Result<String, Error> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        // Strategy name as AAD binds the ciphertext to its marker
        let payload = Payload { msg: plaintext.as_bytes(), aad: Self::NAME.as_bytes() };
        let raw = self
            .cipher()?
            .encrypt(&Default::default(), payload)
            .map_err(|e| Error::EncryptionFailed(format!("AES-SIV encryption failed: {e}")))?;

        Ok(self.marker.seal(&raw))
    }

    fn decrypt(&self, value: &str) -> Result<String, Error> {
        let Some(raw) = self.marker.open(value)? else {
            return Ok(value.to_string());
        };

        if raw.len() < TAG_SIZE {
            let len = raw.len();
            let err = DecryptionError::Truncated { strategy: Self::NAME.to_string(), len };
            return Err(err.into());
        }

        let payload = Payload { msg: raw.as_slice(), aad: Self::NAME.as_bytes() };
        let plaintext = self.cipher()?.decrypt(&Default::default(), payload).map_err(|_| {
            DecryptionError::AuthenticationFailed { strategy: Self::NAME.to_string() }
        })?;

        String::from_utf8(plaintext).map_err(|source| {
            DecryptionError::InvalidUtf8 { strategy: Self::NAME.to_string(), source }.into()
        })
    }
}

impl fmt::Debug for AesStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesStrategy").field("marker", &self.marker.as_str()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_strategy() -> AesStrategy {
        AesStrategy::new("1234567890123456").unwrap()
    }

    #[test]
    fn test_encrypt_has_marker() {
        let aes = create_test_strategy();
        let sealed = aes.encrypt("user1@example.com").unwrap();

        assert!(sealed.starts_with("{AES}"));
        assert_ne!(sealed, "{AES}");
    }

    #[test]
    fn test_deterministic_encryption() {
        let aes = create_test_strategy();

        let ct1 = aes.encrypt("user1@example.com").unwrap();
        let ct2 = aes.encrypt("user1@example.com").unwrap();

        assert_eq!(ct1, ct2, "Encryption must be deterministic");
    }

    #[test]
    fn test_round_trip() {
        let aes = create_test_strategy();
        let sealed = aes.encrypt("13812345671").unwrap();

        assert_eq!(aes.decrypt(&sealed).unwrap(), "13812345671");
    }

    #[test]
    fn test_different_plaintexts_different_ciphertexts() {
        let aes = create_test_strategy();

        let ct1 = aes.encrypt("alice@example.com").unwrap();
        let ct2 = aes.encrypt("bob@example.com").unwrap();

        assert_ne!(ct1, ct2);
    }

    #[test]
    fn test_different_keys_different_ciphertexts() {
        let aes1 = create_test_strategy();
        let aes2 = AesStrategy::new("6543210987654321").unwrap();

        assert_ne!(aes1.encrypt("same").unwrap(), aes2.encrypt("same").unwrap());
    }

    #[test]
    fn test_empty_value_identity() {
        let aes = create_test_strategy();

        assert_eq!(aes.encrypt("").unwrap(), "");
        assert_eq!(aes.decrypt("").unwrap(), "");
    }

    #[test]
    fn test_unmarked_value_passes_through() {
        let aes = create_test_strategy();

        assert_eq!(aes.decrypt("user1@example.com").unwrap(), "user1@example.com");
        assert_eq!(aes.decrypt("{CHACHA20}AAAA").unwrap(), "{CHACHA20}AAAA");
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let sealed = create_test_strategy().encrypt("secret").unwrap();
        let other = AesStrategy::new("another key").unwrap();

        let result = other.decrypt(&sealed);
        assert!(matches!(
            result,
            Err(Error::Decryption(DecryptionError::AuthenticationFailed { .. }))
        ));
    }

    #[test]
    fn test_ecb_payload_is_rejected() {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        // two ECB blocks under the same marker
        let legacy = format!("{{AES}}{}", STANDARD.encode([0x5a_u8; 32]));
        let result = create_test_strategy().decrypt(&legacy);

        assert!(matches!(
            result,
            Err(Error::Decryption(DecryptionError::AuthenticationFailed { .. }))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let aes = create_test_strategy();
        let result = aes.decrypt("{AES}AAAA");

        assert!(matches!(
            result,
            Err(Error::Decryption(DecryptionError::Truncated { len: 3, .. }))
        ));
    }

    #[test]
    fn test_malformed_base64() {
        let aes = create_test_strategy();
        let result = aes.decrypt("{AES}@@@");

        assert!(matches!(result, Err(Error::Decryption(DecryptionError::InvalidEncoding { .. }))));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let aes = create_test_strategy();
        let sealed = aes.encrypt("alice@example.com").unwrap();

        let mut raw = aes.marker().open(&sealed).unwrap().unwrap();
        if let Some(byte) = raw.last_mut() {
            *byte ^= 0xFF;
        }
        let tampered = aes.marker().seal(&raw);

        assert!(aes.decrypt(&tampered).is_err());
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(AesStrategy::new(""), Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", create_test_strategy());
        assert!(rendered.contains("{AES}"));
        assert!(!rendered.contains("key"));
    }
}
