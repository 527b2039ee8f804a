//! Key expansion using HKDF (HMAC-based Key Derivation Function).
//!
//! Strategies accept key material of any length (a short passphrase-like
//! string is common in configuration) and expand it with HKDF-SHA256 into the
//! exact key size their cipher needs. The `info` label keeps keys for
//! different algorithms independent even when the same material is reused.

use crate::error::Error;
use hkdf::Hkdf;
use secrecy::{ExposeSecret, SecretVec};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Expands key material into a subkey of `len` bytes.
///
/// # Errors
///
/// Returns `Error::InvalidKey` if the material is empty or `len` exceeds
/// what HKDF-SHA256 can produce (8160 bytes).
///
/// # Example
///
/// ```
/// use fieldcrypt::kdf::derive_key;
/// use secrecy::SecretVec;
///
/// let material = SecretVec::new(b"1234567890123456".to_vec());
/// let key = derive_key(&material, b"fieldcrypt:AES-SIV", 64).expect("derivation failed");
/// assert_eq!(key.len(), 64);
/// ```
pub fn derive_key(
    material: &SecretVec<u8>,
    info: &[u8],
    len: usize,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    if material.expose_secret().is_empty() {
        return Err(Error::InvalidKey("key material must not be empty".to_string()));
    }

    let hkdf = Hkdf::<Sha256>::new(None, material.expose_secret());

    let mut okm = Zeroizing::new(vec![0u8; len]);
    hkdf.expand(info, &mut okm)
        .map_err(|_| Error::InvalidKey(format!("cannot expand key to {len} bytes")))?;

    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(bytes: &[u8]) -> SecretVec<u8> {
        SecretVec::new(bytes.to_vec())
    }

    #[test]
    fn test_derive_key_deterministic() {
        let m = material(b"1234567890123456");

        let k1 = derive_key(&m, b"AES", 64).unwrap();
        let k2 = derive_key(&m, b"AES", 64).unwrap();

        assert_eq!(*k1, *k2);
    }

    #[test]
    fn test_derive_key_different_labels() {
        let m = material(b"1234567890123456");

        let k1 = derive_key(&m, b"AES", 32).unwrap();
        let k2 = derive_key(&m, b"CHACHA20", 32).unwrap();

        assert_ne!(*k1, *k2);
    }

    #[test]
    fn test_derive_key_different_material() {
        let k1 = derive_key(&material(b"key-one"), b"AES", 32).unwrap();
        let k2 = derive_key(&material(b"key-two"), b"AES", 32).unwrap();

        assert_ne!(*k1, *k2);
    }

    #[test]
    fn test_derive_key_rejects_empty_material() {
        let result = derive_key(&material(b""), b"AES", 32);
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_derive_key_rejects_oversized_output() {
        let result = derive_key(&material(b"k"), b"AES", 255 * 32 + 1);
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }

    // RFC 5869 Test Case 3: zero-length salt and info
    #[test]
    fn test_hkdf_rfc5869_test_case_3() {
        let ikm = material(&[0x0b; 22]);
        let okm = derive_key(&ikm, b"", 42).unwrap();

        let expected: [u8; 42] = [
            0x8d, 0xa4, 0xe7, 0x75, 0xa5, 0x63, 0xc1, 0x8f, 0x71, 0x5f, 0x80, 0x2a, 0x06, 0x3c,
            0x5a, 0x31, 0xb8, 0xa1, 0x1f, 0x5c, 0x5e, 0xe1, 0x87, 0x9e, 0xc3, 0x45, 0x4e, 0x5f,
            0x3c, 0x73, 0x8d, 0x2d, 0x9d, 0x20, 0x13, 0x95, 0xfa, 0xa4, 0xb6, 0x1a, 0x96, 0xc8,
        ];
        assert_eq!(okm.as_slice(), &expected);
    }
}
