//! Loosely typed values carried by statements and predicates.

use std::collections::BTreeMap;
use std::fmt;

/// Column name to value mapping used by partial updates and map-based creates.
pub type ColumnMap = BTreeMap<String, Value>;

/// A literal bound into a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL `NULL`
    Null,
    /// Boolean literal
    Bool(bool),
    /// Signed integer literal
    Int(i64),
    /// Unsigned integer literal
    Uint(u64),
    /// Floating point literal
    Float(f64),
    /// Text literal
    String(String),
    /// Binary literal
    Bytes(Vec<u8>),
    /// A plaintext explicitly marked for encryption under a column's strategy
    Crypto(CryptoValue),
}

impl Value {
    /// Shorthand for `Value::Crypto(CryptoValue::new(column, value))`.
    #[must_use]
    pub fn crypto(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Crypto(CryptoValue::new(column, value))
    }

    /// Returns the text of a `String` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Replaces a `Crypto` wrapper with its plaintext string.
    ///
    /// Used where the wrapped column turns out not to be encrypted, so the
    /// host only ever receives plain values.
    pub fn unwrap_crypto(&mut self) {
        if let Self::Crypto(wrapped) = self {
            let plaintext = std::mem::take(&mut wrapped.value);
            *self = Self::String(plaintext);
        }
    }

    /// Renders scalar values as text the way they would be stored in a text column.
    ///
    /// `Null` and non-UTF-8 bytes have no text form.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Uint(u) => Some(u.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::String(s) => Some(s.clone()),
            Self::Bytes(b) => String::from_utf8(b.clone()).ok(),
            Self::Crypto(cv) => Some(cv.value.clone()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Uint(u64::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Uint(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<CryptoValue> for Value {
    fn from(value: CryptoValue) -> Self {
        Self::Crypto(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A plaintext bound to the column whose strategy should encrypt it.
///
/// Raw SQL fragments carry no column binding for their placeholders, so a
/// literal compared against an encrypted column has to be wrapped explicitly:
///
/// ```
/// use fieldcrypt::clause::Expr;
/// use fieldcrypt::value::CryptoValue;
///
/// let expr = Expr::raw("email = ?", vec![CryptoValue::new("email", "user1@example.com").into()]);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct CryptoValue {
    column: String,
    value: String,
}

impl CryptoValue {
    /// Wraps `value` for encryption under `column`'s strategy.
    #[must_use]
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self { column: column.into(), value: value.into() }
    }

    /// Returns the target column.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Returns the wrapped plaintext.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Unwraps the plaintext.
    #[must_use]
    pub fn into_value(self) -> String {
        self.value
    }
}

// Plaintext stays out of logs.
impl fmt::Debug for CryptoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoValue").field("column", &self.column).finish_non_exhaustive()
    }
}
