//! Predicate trees for `WHERE` clauses.
//!
//! Hosts translate their query builder's conditions into [`Expr`] nodes so the
//! query interceptor can find literals bound to encrypted columns. Only
//! equality, inequality, membership and raw nodes carry rewritable literals;
//! everything else is carried through untouched.

use std::fmt;

use crate::value::Value;

/// A column reference, optionally qualified with its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    table: Option<String>,
    name: String,
}

impl Column {
    /// Creates an unqualified column reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { table: None, name: name.into() }
    }

    /// Creates a `table.column` reference.
    #[must_use]
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self { table: Some(table.into()), name: name.into() }
    }

    /// Returns the table qualifier, if any.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        match name.split_once('.') {
            Some((table, column)) => Self::qualified(table, column),
            None => Self::new(name),
        }
    }
}

impl From<String> for Column {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{table}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Ordered comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

/// A node of a `WHERE` predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `column = value`
    Eq {
        /// Compared column
        column: Column,
        /// Literal operand
        value: Value,
    },
    /// `column <> value`
    Neq {
        /// Compared column
        column: Column,
        /// Literal operand
        value: Value,
    },
    /// `column IN (values...)`
    In {
        /// Compared column
        column: Column,
        /// Literal operands
        values: Vec<Value>,
    },
    /// `column LIKE pattern`
    Like {
        /// Compared column
        column: Column,
        /// Pattern operand
        pattern: Value,
    },
    /// `column <op> value`
    Compare {
        /// Compared column
        column: Column,
        /// Operator
        op: CompareOp,
        /// Literal operand
        value: Value,
    },
    /// Raw SQL with `?` placeholders bound positionally to `vars`
    Raw {
        /// SQL fragment
        sql: String,
        /// Placeholder arguments
        vars: Vec<Value>,
    },
    /// All children must hold
    And(Vec<Expr>),
    /// Any child must hold
    Or(Vec<Expr>),
    /// The child must not hold
    Not(Box<Expr>),
}

impl Expr {
    /// `column = value`
    pub fn eq(column: impl Into<Column>, value: impl Into<Value>) -> Self {
        Self::Eq { column: column.into(), value: value.into() }
    }

    /// `column <> value`
    pub fn neq(column: impl Into<Column>, value: impl Into<Value>) -> Self {
        Self::Neq { column: column.into(), value: value.into() }
    }

    /// `column IN (values...)`
    pub fn in_list<V: Into<Value>>(
        column: impl Into<Column>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In { column: column.into(), values: values.into_iter().map(Into::into).collect() }
    }

    /// `column LIKE pattern`
    pub fn like(column: impl Into<Column>, pattern: impl Into<Value>) -> Self {
        Self::Like { column: column.into(), pattern: pattern.into() }
    }

    /// `column <op> value`
    pub fn compare(column: impl Into<Column>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare { column: column.into(), op, value: value.into() }
    }

    /// Raw SQL with positional `?` placeholders.
    pub fn raw(sql: impl Into<String>, vars: Vec<Value>) -> Self {
        Self::Raw { sql: sql.into(), vars }
    }

    /// Negates `expr`.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Self) -> Self {
        Self::Not(Box::new(expr))
    }
}

/// The conjunction of top-level conditions of a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Where {
    /// Conditions joined with `AND`
    pub exprs: Vec<Expr>,
}

impl Where {
    /// Creates an empty clause.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition.
    #[must_use]
    pub fn and(mut self, expr: Expr) -> Self {
        self.exprs.push(expr);
        self
    }

    /// Returns `true` if there are no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

impl FromIterator<Expr> for Where {
    fn from_iter<I: IntoIterator<Item = Expr>>(iter: I) -> Self {
        Self { exprs: iter.into_iter().collect() }
    }
}
