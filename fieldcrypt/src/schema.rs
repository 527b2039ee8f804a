//! Static entity schemas and the field access contract.
//!
//! Entities describe themselves once, as a `'static` [`Schema`] table, instead
//! of being inspected at runtime. `#[derive(Entity)]` writes that table and
//! the [`Model`] accessors; both can also be implemented by hand.

use crate::error::FieldAccessError;

/// Declared type of an entity field, as far as encryption cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `String`
    String,
    /// `Option<String>`
    OptionalString,
    /// Anything else; never encrypted
    Other,
}

impl FieldKind {
    /// Returns `true` for the string kinds that can hold ciphertext.
    #[must_use]
    pub const fn is_string(self) -> bool {
        matches!(self, Self::String | Self::OptionalString)
    }
}

/// One declared field of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    name: &'static str,
    column: &'static str,
    kind: FieldKind,
    crypto: Option<&'static str>,
}

impl FieldDef {
    /// Creates an untagged field.
    #[must_use]
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { name, column, kind, crypto: None }
    }

    /// Tags the field with the strategy that encrypts it.
    #[must_use]
    pub const fn with_crypto(mut self, strategy: &'static str) -> Self {
        self.crypto = Some(strategy);
        self
    }

    /// Returns the field name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the storage column name.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        self.column
    }

    /// Returns the declared kind.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Returns the strategy name from the field's crypto tag.
    #[must_use]
    pub const fn crypto(&self) -> Option<&'static str> {
        self.crypto
    }
}

/// Structural description of a persisted entity type.
///
/// # Example
///
/// ```
/// use fieldcrypt::schema::{FieldDef, FieldKind, Schema};
///
/// const FIELDS: &[FieldDef] = &[
///     FieldDef::new("id", "id", FieldKind::Other),
///     FieldDef::new("email", "email", FieldKind::String).with_crypto("aes"),
/// ];
/// static USER: Schema = Schema::new("app::User", "users", FIELDS);
///
/// assert_eq!(USER.lookup_field("email").unwrap().crypto(), Some("aes"));
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    name: &'static str,
    table: &'static str,
    fields: &'static [FieldDef],
}

impl Schema {
    /// Creates a schema table.
    ///
    /// `name` is the schema identity and must be unique per entity type;
    /// the derive uses the type's module path.
    #[must_use]
    pub const fn new(name: &'static str, table: &'static str, fields: &'static [FieldDef]) -> Self {
        Self { name, table, fields }
    }

    /// Returns the schema identity.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the table name.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        self.table
    }

    /// Returns the declared fields in declaration order.
    #[must_use]
    pub const fn fields(&self) -> &'static [FieldDef] {
        self.fields
    }

    /// Finds a field by column name, falling back to the field name.
    #[must_use]
    pub fn lookup_field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields
            .iter()
            .find(|f| f.column == name)
            .or_else(|| self.fields.iter().find(|f| f.name == name))
    }
}

/// Types with a static schema table.
pub trait Entity {
    /// The schema shared by every instance of the type.
    const SCHEMA: &'static Schema;
}

/// Object-safe access to an entity instance's string fields.
///
/// Only string kinds need accessors: those are the only fields the
/// interceptors ever read or write.
pub trait Model {
    /// Returns the schema of this instance.
    fn schema(&self) -> &'static Schema;

    /// Reads a string field. `Ok(None)` means an `Option<String>` field is unset.
    ///
    /// # Errors
    ///
    /// Returns `FieldAccessError` if the field does not exist or is not a string.
    fn get_str(&self, field: &str) -> Result<Option<&str>, FieldAccessError>;

    /// Writes a string field.
    ///
    /// # Errors
    ///
    /// Returns `FieldAccessError` if the field does not exist or is not a string.
    fn set_str(&mut self, field: &str, value: String) -> Result<(), FieldAccessError>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-written entities shared by the unit tests.

    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct User {
        pub id: u64,
        pub name: String,
        pub age: u32,
        pub email: String,
        pub mobile: String,
        pub nickname: Option<String>,
    }

    impl User {
        pub fn new(id: u64, name: &str, email: &str, mobile: &str) -> Self {
            Self {
                id,
                name: name.to_string(),
                age: 18,
                email: email.to_string(),
                mobile: mobile.to_string(),
                nickname: None,
            }
        }
    }

    impl Entity for User {
        const SCHEMA: &'static Schema = {
            const FIELDS: &[FieldDef] = &[
                FieldDef::new("id", "id", FieldKind::Other),
                FieldDef::new("name", "name", FieldKind::String),
                FieldDef::new("age", "age", FieldKind::Other).with_crypto("aes"),
                FieldDef::new("email", "email", FieldKind::String).with_crypto("aes"),
                FieldDef::new("mobile", "mobile", FieldKind::String).with_crypto("AES"),
                FieldDef::new("nickname", "nick_name", FieldKind::OptionalString)
                    .with_crypto("aes"),
            ];
            &Schema::new("fixtures::User", "test_user", FIELDS)
        };
    }

    impl Model for User {
        fn schema(&self) -> &'static Schema {
            Self::SCHEMA
        }

        fn get_str(&self, field: &str) -> Result<Option<&str>, FieldAccessError> {
            match field {
                "name" => Ok(Some(&self.name)),
                "email" => Ok(Some(&self.email)),
                "mobile" => Ok(Some(&self.mobile)),
                "nickname" => Ok(self.nickname.as_deref()),
                "id" | "age" => Err(FieldAccessError::not_a_string(Self::SCHEMA.name(), field)),
                _ => Err(FieldAccessError::unknown(Self::SCHEMA.name(), field)),
            }
        }

        fn set_str(&mut self, field: &str, value: String) -> Result<(), FieldAccessError> {
            match field {
                "name" => self.name = value,
                "email" => self.email = value,
                "mobile" => self.mobile = value,
                "nickname" => self.nickname = Some(value),
                "id" | "age" => {
                    return Err(FieldAccessError::not_a_string(Self::SCHEMA.name(), field))
                }
                _ => return Err(FieldAccessError::unknown(Self::SCHEMA.name(), field)),
            }
            Ok(())
        }
    }

    /// Entity without any crypto tags.
    #[derive(Debug, Clone, Default)]
    pub struct Tag {
        pub label: String,
    }

    impl Entity for Tag {
        const SCHEMA: &'static Schema = {
            const FIELDS: &[FieldDef] = &[FieldDef::new("label", "label", FieldKind::String)];
            &Schema::new("fixtures::Tag", "tags", FIELDS)
        };
    }

    impl Model for Tag {
        fn schema(&self) -> &'static Schema {
            Self::SCHEMA
        }

        fn get_str(&self, field: &str) -> Result<Option<&str>, FieldAccessError> {
            match field {
                "label" => Ok(Some(&self.label)),
                _ => Err(FieldAccessError::unknown(Self::SCHEMA.name(), field)),
            }
        }

        fn set_str(&mut self, field: &str, value: String) -> Result<(), FieldAccessError> {
            match field {
                "label" => {
                    self.label = value;
                    Ok(())
                }
                _ => Err(FieldAccessError::unknown(Self::SCHEMA.name(), field)),
            }
        }
    }

    /// Entity whose tag names a strategy nobody registered.
    #[derive(Debug, Clone, Default)]
    pub struct Secret {
        pub body: String,
    }

    impl Entity for Secret {
        const SCHEMA: &'static Schema = {
            const FIELDS: &[FieldDef] =
                &[FieldDef::new("body", "body", FieldKind::String).with_crypto("rot13")];
            &Schema::new("fixtures::Secret", "secrets", FIELDS)
        };
    }

    impl Model for Secret {
        fn schema(&self) -> &'static Schema {
            Self::SCHEMA
        }

        fn get_str(&self, field: &str) -> Result<Option<&str>, FieldAccessError> {
            match field {
                "body" => Ok(Some(&self.body)),
                _ => Err(FieldAccessError::unknown(Self::SCHEMA.name(), field)),
            }
        }

        fn set_str(&mut self, field: &str, value: String) -> Result<(), FieldAccessError> {
            match field {
                "body" => {
                    self.body = value;
                    Ok(())
                }
                _ => Err(FieldAccessError::unknown(Self::SCHEMA.name(), field)),
            }
        }
    }
}
