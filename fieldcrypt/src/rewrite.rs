//! `WHERE` literal rewriting for encrypted columns.
//!
//! Equality, inequality and membership literals compared against an encrypted
//! column are replaced by their ciphertext, so the database compares
//! ciphertext with ciphertext. Raw fragments only have their explicitly
//! wrapped [`CryptoValue`](crate::value::CryptoValue) arguments touched.

use crate::cache::{find_field, CryptoField};
use crate::clause::{Column, Expr, Where};
use crate::error::Error;
use crate::schema::Schema;
use crate::value::Value;

/// Rewrites predicate literals of one statement.
#[derive(Debug)]
pub struct Rewriter<'a> {
    schema: &'a Schema,
    fields: &'a [CryptoField],
}

impl<'a> Rewriter<'a> {
    /// Creates a rewriter for a schema and its encryptable fields.
    #[must_use]
    pub const fn new(schema: &'a Schema, fields: &'a [CryptoField]) -> Self {
        Self { schema, fields }
    }

    /// Rewrites every top-level condition of `clause`.
    ///
    /// Returns the number of literals replaced.
    ///
    /// # Errors
    ///
    /// Returns the first encryption error.
    pub fn rewrite_where(&self, clause: &mut Where) -> Result<usize, Error> {
        let mut rewritten = 0;
        for expr in &mut clause.exprs {
            rewritten += self.rewrite(expr)?;
        }
        Ok(rewritten)
    }

    /// Rewrites one predicate node and its children.
    ///
    /// # Errors
    ///
    /// Returns the first encryption error.
    pub fn rewrite(&self, expr: &mut Expr) -> Result<usize, Error> {
        match expr {
            Expr::Eq { column, value } | Expr::Neq { column, value } => {
                match self.resolve(column) {
                    Some(field) => encrypt_literal(field, value),
                    None => {
                        value.unwrap_crypto();
                        Ok(0)
                    }
                }
            }
            Expr::In { column, values } => {
                let field = self.resolve(column);
                let mut rewritten = 0;
                for value in values {
                    match field {
                        Some(field) => rewritten += encrypt_literal(field, value)?,
                        None => value.unwrap_crypto(),
                    }
                }
                Ok(rewritten)
            }
            Expr::Raw { vars, .. } => {
                let mut rewritten = 0;
                for var in vars {
                    rewritten += self.rewrite_raw_var(var)?;
                }
                Ok(rewritten)
            }
            Expr::And(children) | Expr::Or(children) => {
                let mut rewritten = 0;
                for child in children {
                    rewritten += self.rewrite(child)?;
                }
                Ok(rewritten)
            }
            Expr::Not(child) => self.rewrite(child),
            Expr::Like { .. } | Expr::Compare { .. } => Ok(0),
        }
    }

    fn rewrite_raw_var(&self, var: &mut Value) -> Result<usize, Error> {
        let Value::Crypto(wrapped) = var else {
            return Ok(0);
        };

        match self.resolve(&Column::from(wrapped.column())) {
            Some(field) => {
                *var = Value::String(field.encrypt(wrapped.value())?);
                trace_rewrite(field);
                Ok(1)
            }
            None => {
                var.unwrap_crypto();
                Ok(0)
            }
        }
    }

    fn resolve(&self, column: &Column) -> Option<&'a CryptoField> {
        match column.table() {
            Some(table) if table != self.schema.table() => None,
            _ => find_field(self.schema, self.fields, column.name()),
        }
    }
}

fn encrypt_literal(field: &CryptoField, value: &mut Value) -> Result<usize, Error> {
    let plaintext = match value {
        Value::String(s) => s.as_str(),
        Value::Crypto(wrapped) => wrapped.value(),
        _ => return Ok(0),
    };

    if !field.strategy().is_deterministic() {
        tracing::warn!(
            column = field.column(),
            strategy = field.strategy().name(),
            "randomized strategy used in a predicate; the comparison will never match"
        );
    }

    let sealed = field.encrypt(plaintext)?;
    *value = Value::String(sealed);
    trace_rewrite(field);
    Ok(1)
}

fn trace_rewrite(field: &CryptoField) {
    tracing::trace!(column = field.column(), strategy = field.strategy().name(), "rewrote literal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FieldCache;
    use crate::clause::CompareOp;
    use crate::registry::StrategyRegistry;
    use crate::schema::fixtures::User;
    use crate::schema::Entity;
    use crate::strategy::{AesStrategy, ChaChaStrategy, CryptoStrategy};
    use std::sync::Arc;

    const KEY: &str = "1234567890123456";

    fn user_fields() -> Arc<[CryptoField]> {
        let registry = Arc::new(StrategyRegistry::new());
        registry.register(AesStrategy::new(KEY).unwrap());
        FieldCache::new(registry).fields_for(User::SCHEMA).unwrap()
    }

    fn sealed(plaintext: &str) -> Value {
        Value::String(AesStrategy::new(KEY).unwrap().encrypt(plaintext).unwrap())
    }

    fn rewrite(expr: Expr) -> (Expr, usize) {
        let fields = user_fields();
        let rewriter = Rewriter::new(User::SCHEMA, &fields);
        let mut expr = expr;
        let count = rewriter.rewrite(&mut expr).unwrap();
        (expr, count)
    }

    #[test]
    fn test_eq_on_encrypted_column() {
        let (expr, count) = rewrite(Expr::eq("email", "user1@example.com"));
        assert_eq!(expr, Expr::eq("email", sealed("user1@example.com")));
        assert_eq!(count, 1);
    }

    #[test]
    fn test_eq_on_plain_column_untouched() {
        let original = Expr::eq("name", "User1");
        let (expr, count) = rewrite(original.clone());
        assert_eq!(expr, original);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_eq_non_string_literal_untouched() {
        let original = Expr::eq("email", 42);
        assert_eq!(rewrite(original.clone()).0, original);
    }

    #[test]
    fn test_neq_and_field_name_alias() {
        let (expr, _) = rewrite(Expr::neq("nickname", "u1"));
        assert_eq!(expr, Expr::neq("nickname", sealed("u1")));
    }

    #[test]
    fn test_in_element_wise() {
        let (expr, count) = rewrite(Expr::In {
            column: Column::new("mobile"),
            values: vec![Value::from("13812345671"), Value::from(7), Value::from("13812345672")],
        });

        let expected = Expr::In {
            column: Column::new("mobile"),
            values: vec![sealed("13812345671"), Value::from(7), sealed("13812345672")],
        };
        assert_eq!(expr, expected);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_raw_crypto_value() {
        let (expr, count) = rewrite(Expr::raw(
            "email = ? AND age > ?",
            vec![Value::crypto("email", "user1@example.com"), Value::from(10)],
        ));

        assert_eq!(
            expr,
            Expr::raw("email = ? AND age > ?", vec![sealed("user1@example.com"), Value::from(10)])
        );
        assert_eq!(count, 1);
    }

    #[test]
    fn test_raw_plain_string_untouched() {
        let original = Expr::raw("email = ?", vec![Value::from("user1@example.com")]);
        assert_eq!(rewrite(original.clone()).0, original);
    }

    #[test]
    fn test_raw_crypto_value_on_plain_column_unwrapped() {
        let (expr, count) = rewrite(Expr::raw("name = ?", vec![Value::crypto("name", "User1")]));
        assert_eq!(expr, Expr::raw("name = ?", vec![Value::from("User1")]));
        assert_eq!(count, 0);
    }

    #[test]
    fn test_nested_groups() {
        let (expr, count) = rewrite(Expr::Or(vec![
            Expr::eq("email", "a@example.com"),
            Expr::And(vec![Expr::eq("name", "User1"), Expr::not(Expr::eq("mobile", "1"))]),
        ]));

        let expected = Expr::Or(vec![
            Expr::eq("email", sealed("a@example.com")),
            Expr::And(vec![Expr::eq("name", "User1"), Expr::not(Expr::eq("mobile", sealed("1")))]),
        ]);
        assert_eq!(expr, expected);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_table_qualifier() {
        let (own, _) = rewrite(Expr::eq("test_user.email", "a@example.com"));
        assert_eq!(own, Expr::eq("test_user.email", sealed("a@example.com")));

        let foreign = Expr::eq("profiles.email", "a@example.com");
        assert_eq!(rewrite(foreign.clone()).0, foreign);
    }

    #[test]
    fn test_like_and_compare_untouched() {
        let like = Expr::like("email", "%@example.com");
        assert_eq!(rewrite(like.clone()).0, like);

        let compare = Expr::compare("email", CompareOp::Gt, "a");
        assert_eq!(rewrite(compare.clone()).0, compare);
    }

    #[test]
    fn test_marker_lookalike_literal_is_encrypted() {
        let (expr, count) = rewrite(Expr::eq("email", "{AES}bob"));
        assert_eq!(expr, Expr::eq("email", sealed("{AES}bob")));
        assert_eq!(count, 1);
    }

    #[test]
    fn test_column_owned_by_untagged_field() {
        use crate::schema::{FieldDef, FieldKind};

        const FIELDS: &[FieldDef] = &[
            FieldDef::new("email", "email_enc", FieldKind::String).with_crypto("aes"),
            FieldDef::new("legacy", "email", FieldKind::String),
        ];
        static ACCOUNT: Schema = Schema::new("tests::Account", "accounts", FIELDS);

        let registry = Arc::new(StrategyRegistry::new());
        registry.register(AesStrategy::new(KEY).unwrap());
        let fields = FieldCache::new(registry).fields_for(&ACCOUNT).unwrap();
        let rewriter = Rewriter::new(&ACCOUNT, &fields);

        // `email` is the plaintext column of `legacy`
        let mut by_column = Expr::eq("email", "a@example.com");
        assert_eq!(rewriter.rewrite(&mut by_column).unwrap(), 0);
        assert_eq!(by_column, Expr::eq("email", "a@example.com"));

        let mut encrypted = Expr::eq("email_enc", "a@example.com");
        assert_eq!(rewriter.rewrite(&mut encrypted).unwrap(), 1);
        assert_eq!(encrypted, Expr::eq("email_enc", sealed("a@example.com")));
    }

    #[test]
    fn test_rewrite_where_counts_all() {
        let fields = user_fields();
        let rewriter = Rewriter::new(User::SCHEMA, &fields);
        let mut clause = Where::new()
            .and(Expr::eq("email", "a@example.com"))
            .and(Expr::in_list("mobile", ["1", "2"]))
            .and(Expr::eq("age", 18));

        assert_eq!(rewriter.rewrite_where(&mut clause).unwrap(), 3);
    }

    #[test]
    fn test_randomized_strategy_still_rewrites() {
        use crate::schema::{FieldDef, FieldKind};

        const FIELDS: &[FieldDef] =
            &[FieldDef::new("token", "token", FieldKind::String).with_crypto("chacha20")];
        static SESSION: Schema = Schema::new("tests::Session", "sessions", FIELDS);

        let registry = Arc::new(StrategyRegistry::new());
        registry.register(ChaChaStrategy::new(KEY).unwrap());
        let fields = FieldCache::new(registry).fields_for(&SESSION).unwrap();
        let rewriter = Rewriter::new(&SESSION, &fields);

        let mut expr = Expr::eq("token", "abc");
        assert_eq!(rewriter.rewrite(&mut expr).unwrap(), 1);

        let Expr::Eq { value: Value::String(sealed), .. } = expr else {
            panic!("expected rewritten string literal");
        };
        assert!(sealed.starts_with("{CHACHA20}"));
        assert!(!fields[0].strategy().is_deterministic());
    }
}
