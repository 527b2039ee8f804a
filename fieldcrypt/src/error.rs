//! Error types for `fieldcrypt` operations.

use std::fmt;

/// Main error type for `fieldcrypt` operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A field tag names a strategy that was never registered
    #[error("unknown crypto strategy `{strategy}` on field {schema}.{field}")]
    UnknownStrategy {
        /// Strategy name as declared on the field
        strategy: String,
        /// Schema identity of the entity
        schema: String,
        /// Field name carrying the tag
        field: String,
    },

    /// Key material rejected when constructing a strategy
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// Encryption operation failed
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption of a marked value failed
    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    /// Reading or writing an entity field failed
    #[error("field access error: {0}")]
    FieldAccess(#[from] FieldAccessError),

    /// A callback with the same name is already installed
    #[error("callback already registered: {0}")]
    DuplicateCallback(String),
}

/// Failures while turning a marked ciphertext back into plaintext.
#[derive(Debug, thiserror::Error)]
pub enum DecryptionError {
    /// The payload after the marker is not valid base64
    #[error("{strategy}: invalid base64 payload: {source}")]
    InvalidEncoding {
        /// Strategy that owns the marker
        strategy: String,
        /// Underlying decode error
        source: base64::DecodeError,
    },

    /// The decoded payload is too short to contain the cipher framing
    #[error("{strategy}: ciphertext truncated ({len} bytes)")]
    Truncated {
        /// Strategy that owns the marker
        strategy: String,
        /// Length of the decoded payload
        len: usize,
    },

    /// Authentication tag verification failed (wrong key or tampered data)
    #[error("{strategy}: authentication failed: ciphertext may be corrupted or tampered")]
    AuthenticationFailed {
        /// Strategy that owns the marker
        strategy: String,
    },

    /// The plaintext is not valid UTF-8
    #[error("{strategy}: decrypted value is not valid UTF-8")]
    InvalidUtf8 {
        /// Strategy that owns the marker
        strategy: String,
        /// Underlying conversion error
        source: std::string::FromUtf8Error,
    },
}

/// Errors raised by a [`Model`](crate::schema::Model) when a field cannot be
/// read or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAccessError {
    /// The schema has no field with this name
    UnknownField {
        /// Schema identity
        schema: String,
        /// Requested field
        field: String,
    },

    /// The field exists but does not hold a string
    NotAString {
        /// Schema identity
        schema: String,
        /// Requested field
        field: String,
    },
}

impl FieldAccessError {
    /// Shorthand for [`FieldAccessError::UnknownField`].
    pub fn unknown(schema: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField { schema: schema.into(), field: field.into() }
    }

    /// Shorthand for [`FieldAccessError::NotAString`].
    pub fn not_a_string(schema: impl Into<String>, field: impl Into<String>) -> Self {
        Self::NotAString { schema: schema.into(), field: field.into() }
    }
}

impl fmt::Display for FieldAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { schema, field } => write!(f, "no field {field} on {schema}"),
            Self::NotAString { schema, field } => {
                write!(f, "field {schema}.{field} is not a string")
            }
        }
    }
}

impl std::error::Error for FieldAccessError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_strategy_message() {
        let err = Error::UnknownStrategy {
            strategy: "rot13".to_string(),
            schema: "app::User".to_string(),
            field: "email".to_string(),
        };
        assert_eq!(err.to_string(), "unknown crypto strategy `rot13` on field app::User.email");
    }

    #[test]
    fn test_field_access_converts() {
        let err: Error = FieldAccessError::not_a_string("app::User", "age").into();
        assert!(matches!(err, Error::FieldAccess(FieldAccessError::NotAString { .. })));
        assert_eq!(err.to_string(), "field access error: field app::User.age is not a string");
    }
}
