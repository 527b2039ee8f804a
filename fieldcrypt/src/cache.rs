//! Per-schema memo of encryptable fields.
//!
//! The first time an entity schema is seen its field table is scanned once:
//! fields tagged with a strategy and declared as strings are kept, their
//! strategy resolved through the registry, and the result stored under the
//! schema identity. Every later lookup is a shared-read map hit.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::registry::StrategyRegistry;
use crate::schema::{FieldDef, Schema};
use crate::strategy::CryptoStrategy;

/// An encryptable field of an entity schema with its resolved strategy.
#[derive(Clone)]
pub struct CryptoField {
    field: &'static FieldDef,
    strategy: Arc<dyn CryptoStrategy>,
}

impl CryptoField {
    /// Returns the schema field.
    #[must_use]
    pub const fn field(&self) -> &'static FieldDef {
        self.field
    }

    /// Returns the field name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.field.name()
    }

    /// Returns the storage column.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        self.field.column()
    }

    /// Returns the strategy name as written on the field tag.
    #[must_use]
    pub fn strategy_name(&self) -> &'static str {
        self.field.crypto().unwrap_or_default()
    }

    /// Returns the resolved strategy.
    #[must_use]
    pub fn strategy(&self) -> &Arc<dyn CryptoStrategy> {
        &self.strategy
    }

    /// Encrypts a value bound for this field.
    ///
    /// Empty values are returned unchanged. Every other value is treated as
    /// plaintext, including one that happens to start with the marker.
    ///
    /// # Errors
    ///
    /// Returns the strategy's encryption error.
    pub fn encrypt(&self, value: &str) -> Result<String, Error> {
        if value.is_empty() {
            return Ok(String::new());
        }
        self.strategy.encrypt(value)
    }

    /// Decrypts a value read from this field.
    ///
    /// # Errors
    ///
    /// Returns the strategy's decryption error.
    pub fn decrypt(&self, value: &str) -> Result<String, Error> {
        self.strategy.decrypt(value)
    }
}

/// Finds the encryptable field bound to `name`.
///
/// `name` is resolved against the whole schema first, so a column owned by an
/// untagged field never resolves to a tagged field of the same name.
#[must_use]
pub fn find_field<'a>(
    schema: &Schema,
    fields: &'a [CryptoField],
    name: &str,
) -> Option<&'a CryptoField> {
    let def = schema.lookup_field(name)?;
    fields.iter().find(|f| f.field() == def)
}

impl fmt::Debug for CryptoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoField")
            .field("name", &self.name())
            .field("column", &self.column())
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

impl PartialEq for CryptoField {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && Arc::ptr_eq(&self.strategy, &other.strategy)
    }
}

/// Concurrency-safe cache from schema identity to its encryptable fields.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use fieldcrypt::cache::FieldCache;
/// use fieldcrypt::registry::StrategyRegistry;
/// use fieldcrypt::schema::{FieldDef, FieldKind, Schema};
/// use fieldcrypt::strategy::AesStrategy;
///
/// const FIELDS: &[FieldDef] =
///     &[FieldDef::new("email", "email", FieldKind::String).with_crypto("aes")];
/// static USER: Schema = Schema::new("app::User", "users", FIELDS);
///
/// let registry = Arc::new(StrategyRegistry::new());
/// registry.register(AesStrategy::new("1234567890123456")?);
///
/// let cache = FieldCache::new(registry);
/// let fields = cache.fields_for(&USER)?;
/// assert_eq!(fields.len(), 1);
/// assert_eq!(fields[0].column(), "email");
/// # Ok::<(), fieldcrypt::error::Error>(())
/// ```
#[derive(Debug)]
pub struct FieldCache {
    registry: Arc<StrategyRegistry>,
    entries: DashMap<&'static str, Arc<[CryptoField]>>,
}

impl FieldCache {
    /// Creates an empty cache resolving strategies through `registry`.
    #[must_use]
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self { registry, entries: DashMap::new() }
    }

    /// Returns the encryptable fields of `schema` in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownStrategy` if a string field is tagged with a
    /// strategy name that is not registered. Nothing is cached in that case.
    pub fn fields_for(&self, schema: &'static Schema) -> Result<Arc<[CryptoField]>, Error> {
        if let Some(entry) = self.entries.get(schema.name()) {
            return Ok(Arc::clone(entry.value()));
        }

        let scanned: Arc<[CryptoField]> = self.scan(schema)?.into();
        tracing::debug!(
            schema = schema.name(),
            encrypted_fields = scanned.len(),
            "cached crypto fields"
        );

        // A concurrent scan of the same schema may have won; keep its result.
        let entry = self.entries.entry(schema.name()).or_insert(scanned);
        Ok(Arc::clone(entry.value()))
    }

    /// Returns the number of cached schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no schema has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the registry strategies are resolved from.
    #[must_use]
    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    fn scan(&self, schema: &'static Schema) -> Result<Vec<CryptoField>, Error> {
        let mut fields = Vec::new();

        for field in schema.fields() {
            let Some(strategy_name) = field.crypto() else {
                continue;
            };

            if !field.kind().is_string() {
                tracing::debug!(
                    schema = schema.name(),
                    field = field.name(),
                    "skipping crypto tag on non-string field"
                );
                continue;
            }

            let strategy =
                self.registry.lookup(strategy_name).ok_or_else(|| Error::UnknownStrategy {
                    strategy: strategy_name.to_string(),
                    schema: schema.name().to_string(),
                    field: field.name().to_string(),
                })?;

            fields.push(CryptoField { field, strategy });
        }

        Ok(fields)
    }
}
