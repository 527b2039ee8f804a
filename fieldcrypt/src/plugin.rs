//! The encryption plugin and its four lifecycle interceptors.

use std::sync::Arc;

use crate::cache::{find_field, FieldCache};
use crate::callbacks::{Callbacks, Hook, Plugin};
use crate::error::Error;
use crate::registry::StrategyRegistry;
use crate::rewrite::Rewriter;
use crate::schema::{Model, Schema};
use crate::statement::{Dest, Statement};
use crate::value::{ColumnMap, Value};

type Interceptor = fn(&CryptoPlugin, &mut Statement<'_>) -> Result<(), Error>;

/// Encrypts tagged fields on the way into storage and decrypts them on the
/// way out.
///
/// The plugin is cheap to clone; clones share the field cache.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use fieldcrypt::callbacks::{CallbackChain, Hook};
/// use fieldcrypt::plugin::CryptoPlugin;
/// use fieldcrypt::registry::StrategyRegistry;
/// use fieldcrypt::strategy::AesStrategy;
///
/// let registry = Arc::new(StrategyRegistry::new());
/// registry.register(AesStrategy::new("1234567890123456")?);
///
/// let mut chain = CallbackChain::new();
/// chain.use_plugin(&CryptoPlugin::new(registry))?;
/// assert_eq!(chain.names(Hook::BeforeCreate), vec!["crypto:before_create"]);
/// # Ok::<(), fieldcrypt::error::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct CryptoPlugin {
    cache: Arc<FieldCache>,
}

impl CryptoPlugin {
    /// Plugin name; callback names are prefixed with it.
    pub const NAME: &'static str = "crypto";

    /// Creates a plugin resolving strategies through `registry`.
    #[must_use]
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self::with_cache(Arc::new(FieldCache::new(registry)))
    }

    /// Creates a plugin over an existing field cache.
    #[must_use]
    pub const fn with_cache(cache: Arc<FieldCache>) -> Self {
        Self { cache }
    }

    /// Returns the field cache.
    #[must_use]
    pub fn cache(&self) -> &FieldCache {
        &self.cache
    }

    /// Encrypts tagged fields of the entities or column map about to be inserted.
    ///
    /// # Errors
    ///
    /// Returns configuration, field access and encryption errors.
    pub fn before_create(&self, stmt: &mut Statement<'_>) -> Result<(), Error> {
        self.encrypt_dest(Hook::BeforeCreate, stmt)
    }

    /// Encrypts tagged fields of an update, whether given as entities or as a
    /// column map.
    ///
    /// # Errors
    ///
    /// Returns configuration, field access and encryption errors.
    pub fn before_update(&self, stmt: &mut Statement<'_>) -> Result<(), Error> {
        self.encrypt_dest(Hook::BeforeUpdate, stmt)
    }

    /// Replaces predicate literals bound to encrypted columns with ciphertext.
    ///
    /// # Errors
    ///
    /// Returns configuration and encryption errors.
    pub fn before_query(&self, stmt: &mut Statement<'_>) -> Result<(), Error> {
        let Some(clause) = stmt.where_clause.as_mut() else {
            return Ok(());
        };
        let Some(schema) = stmt.schema else {
            tracing::debug!(hook = %Hook::BeforeQuery, "statement has no schema, skipping");
            return Ok(());
        };

        let fields = self.cache.fields_for(schema)?;
        if fields.is_empty() {
            return Ok(());
        }

        let rewritten = Rewriter::new(schema, &fields).rewrite_where(clause)?;
        tracing::trace!(schema = schema.name(), rewritten, "rewrote query literals");
        Ok(())
    }

    /// Decrypts tagged fields of the entities a query was scanned into.
    ///
    /// # Errors
    ///
    /// Returns configuration, field access and decryption errors.
    pub fn after_query(&self, stmt: &mut Statement<'_>) -> Result<(), Error> {
        match &mut stmt.dest {
            Dest::Model(model) => self.decrypt_model(&mut **model),
            Dest::Models(models) => {
                for model in models.iter_mut() {
                    self.decrypt_model(&mut **model)?;
                }
                Ok(())
            }
            other => {
                tracing::debug!(
                    hook = %Hook::AfterQuery,
                    dest = other.kind(),
                    "unsupported destination"
                );
                Ok(())
            }
        }
    }

    fn encrypt_dest(&self, hook: Hook, stmt: &mut Statement<'_>) -> Result<(), Error> {
        match &mut stmt.dest {
            Dest::Model(model) => self.encrypt_model(&mut **model),
            Dest::Models(models) => {
                for model in models.iter_mut() {
                    self.encrypt_model(&mut **model)?;
                }
                Ok(())
            }
            Dest::Columns(columns) => match stmt.schema {
                Some(schema) => self.encrypt_columns(schema, columns),
                None => {
                    tracing::debug!(%hook, "column map without schema, skipping");
                    Ok(())
                }
            },
            other => {
                tracing::debug!(%hook, dest = other.kind(), "unsupported destination");
                Ok(())
            }
        }
    }

    fn encrypt_model(&self, model: &mut dyn Model) -> Result<(), Error> {
        let fields = self.cache.fields_for(model.schema())?;

        for field in fields.iter() {
            let Some(current) = model.get_str(field.name())? else {
                continue;
            };
            if current.is_empty() {
                continue;
            }

            let sealed = field.encrypt(current)?;
            model.set_str(field.name(), sealed)?;
        }
        Ok(())
    }

    fn decrypt_model(&self, model: &mut dyn Model) -> Result<(), Error> {
        let fields = self.cache.fields_for(model.schema())?;

        for field in fields.iter() {
            let Some(current) = model.get_str(field.name())? else {
                continue;
            };
            if !field.strategy().is_encrypted(current) {
                continue;
            }

            let plaintext = field.decrypt(current)?;
            model.set_str(field.name(), plaintext)?;
        }
        Ok(())
    }

    fn encrypt_columns(
        &self,
        schema: &'static Schema,
        columns: &mut ColumnMap,
    ) -> Result<(), Error> {
        let fields = self.cache.fields_for(schema)?;

        for (key, value) in columns.iter_mut() {
            let Some(field) = find_field(schema, &fields, key) else {
                value.unwrap_crypto();
                continue;
            };
            let Some(text) = value.to_text() else {
                continue;
            };
            if text.is_empty() {
                value.unwrap_crypto();
                continue;
            }

            *value = Value::String(field.encrypt(&text)?);
            tracing::trace!(
                column = key.as_str(),
                strategy = field.strategy().name(),
                "encrypted column"
            );
        }
        Ok(())
    }
}

impl Plugin for CryptoPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn initialize(&self, callbacks: &mut dyn Callbacks) -> Result<(), Error> {
        let interceptors: [(Hook, Interceptor); 4] = [
            (Hook::BeforeCreate, Self::before_create),
            (Hook::BeforeUpdate, Self::before_update),
            (Hook::BeforeQuery, Self::before_query),
            (Hook::AfterQuery, Self::after_query),
        ];

        for (hook, interceptor) in interceptors {
            let plugin = self.clone();
            let name = format!("{}:{hook}", Self::NAME);
            callbacks.register(
                hook,
                &name,
                Arc::new(move |stmt: &mut Statement<'_>| interceptor(&plugin, stmt)),
            )?;
        }
        Ok(())
    }
}
