//! # `fieldcrypt`
//!
//! Transparent field-level encryption for entities persisted through an
//! ORM-style data mapper.
//!
//! Tag string fields with a strategy name and install [`CryptoPlugin`] into the
//! host's callback chain: tagged values are encrypted before create and update,
//! predicate literals compared against them are encrypted before a query, and
//! rows read back are decrypted in place. Calling code never handles ciphertext.
//!
//! ## Features
//!
//! - Pluggable, named cipher strategies with self-describing `{NAME}base64`
//!   ciphertext
//! - Deterministic AES-256-SIV (equality and `IN` queries keep working)
//! - Randomized ChaCha20-Poly1305 for fields that are never queried
//! - Per-schema field discovery cached once, safe under concurrent access
//! - `#[derive(Entity)]` for static schema tables
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fieldcrypt::prelude::*;
//!
//! #[derive(Entity, Default)]
//! #[entity(table = "users")]
//! struct User {
//!     id: u64,
//!     #[crypto("aes")]
//!     email: String,
//! }
//!
//! let registry = Arc::new(StrategyRegistry::new());
//! registry.register(AesStrategy::new("1234567890123456")?);
//!
//! let mut chain = CallbackChain::new();
//! chain.use_plugin(&CryptoPlugin::new(registry))?;
//!
//! let mut user = User { id: 1, email: "user1@example.com".into() };
//! chain.run(Hook::BeforeCreate, &mut Statement::new(Dest::model(&mut user)))?;
//! assert!(user.email.starts_with("{AES}"));
//! ```

#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

// Lets `#[derive(Entity)]` output, which names `::fieldcrypt`, resolve inside this crate.
extern crate self as fieldcrypt;

pub mod cache;
pub mod callbacks;
pub mod clause;
pub mod error;
pub mod kdf;
pub mod plugin;
pub mod registry;
pub mod rewrite;
pub mod schema;
pub mod statement;
pub mod strategy;
pub mod value;

pub use plugin::CryptoPlugin;

#[cfg(feature = "derive")]
pub use fieldcrypt_derive::Entity;

pub mod prelude {
    //! Convenience re-exports for common use.
    pub use crate::callbacks::{CallbackChain, Callbacks, Hook, Plugin};
    pub use crate::clause::{Expr, Where};
    pub use crate::error::{DecryptionError, Error, FieldAccessError};
    pub use crate::plugin::CryptoPlugin;
    pub use crate::registry::StrategyRegistry;
    pub use crate::schema::{Entity, Model, Schema};
    pub use crate::statement::{Dest, Statement};
    pub use crate::strategy::{AesStrategy, ChaChaStrategy, CryptoStrategy};
    pub use crate::value::{ColumnMap, CryptoValue, Value};

    #[cfg(feature = "derive")]
    pub use fieldcrypt_derive::Entity;
}
