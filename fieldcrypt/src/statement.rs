//! The in-flight statement handed to lifecycle callbacks.

use std::fmt;

use crate::clause::{Expr, Where};
use crate::schema::{Model, Schema};
use crate::value::ColumnMap;

/// What a statement writes from or reads into.
pub enum Dest<'a> {
    /// A single entity
    Model(&'a mut dyn Model),
    /// A list of entities, in row order
    Models(Vec<&'a mut dyn Model>),
    /// A column to value mapping
    Columns(&'a mut ColumnMap),
    /// No destination bound yet
    None,
    /// A destination the interceptors cannot walk, described for diagnostics
    Other(&'static str),
}

impl<'a> Dest<'a> {
    /// Binds a single entity.
    pub fn model<T: Model + 'a>(model: &'a mut T) -> Self {
        Self::Model(model)
    }

    /// Binds a slice of entities.
    pub fn models<T: Model + 'a>(models: &'a mut [T]) -> Self {
        Self::Models(models.iter_mut().map(|m| m as &mut dyn Model).collect())
    }

    /// Binds a slice of boxed entities.
    pub fn boxed<T: Model + 'a>(models: &'a mut [Box<T>]) -> Self {
        Self::Models(models.iter_mut().map(|m| &mut **m as &mut dyn Model).collect())
    }

    /// Binds a column mapping.
    pub fn columns(columns: &'a mut ColumnMap) -> Self {
        Self::Columns(columns)
    }

    /// Short description of the destination shape.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Model(_) => "model",
            Self::Models(_) => "models",
            Self::Columns(_) => "columns",
            Self::None => "none",
            Self::Other(kind) => *kind,
        }
    }

    /// Schema of the bound entities, if it can be told from the destination.
    #[must_use]
    pub fn schema(&self) -> Option<&'static Schema> {
        match self {
            Self::Model(model) => Some(model.schema()),
            Self::Models(models) => models.first().map(|m| m.schema()),
            _ => None,
        }
    }
}

impl fmt::Debug for Dest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Models(models) => write!(f, "Models(len={})", models.len()),
            Self::Columns(columns) => f.debug_tuple("Columns").field(&columns.keys()).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// A create, update or query passing through the callback chain.
///
/// # Example
///
/// ```
/// use fieldcrypt::clause::Expr;
/// use fieldcrypt::statement::{Dest, Statement};
/// use fieldcrypt::value::{ColumnMap, Value};
///
/// let mut updates = ColumnMap::new();
/// updates.insert("email".to_string(), Value::from("new@example.com"));
///
/// let stmt = Statement::new(Dest::columns(&mut updates)).filter(Expr::eq("id", 1));
/// assert!(stmt.schema.is_none());
/// ```
#[derive(Debug)]
pub struct Statement<'a> {
    /// Schema of the entity the statement targets
    pub schema: Option<&'static Schema>,
    /// Values written from, or rows read into
    pub dest: Dest<'a>,
    /// `WHERE` conditions
    pub where_clause: Option<Where>,
}

impl<'a> Statement<'a> {
    /// Creates a statement, taking the schema from the destination when possible.
    #[must_use]
    pub fn new(dest: Dest<'a>) -> Self {
        Self { schema: dest.schema(), dest, where_clause: None }
    }

    /// Sets the target schema explicitly (e.g. for map updates).
    #[must_use]
    pub fn with_schema(mut self, schema: &'static Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Replaces the `WHERE` clause.
    #[must_use]
    pub fn with_where(mut self, where_clause: Where) -> Self {
        self.where_clause = Some(where_clause);
        self
    }

    /// Adds a condition to the `WHERE` clause.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.where_clause.get_or_insert_with(Where::new).exprs.push(expr);
        self
    }
}
