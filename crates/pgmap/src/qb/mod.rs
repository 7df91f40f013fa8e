//! Stateful statement builder.
//!
//! A [`QueryBuilder`] is obtained from a [`TableProxy`](crate::TableProxy) CRUD entry
//! point and accumulates one statement. Clauses are validated against the statement
//! kind and the clauses already applied; a rejected call leaves the builder unchanged.
//!
//! ```ignore
//! let mut q = users.update(&token)?;
//! q.set(&["name"], values!["alice"])?.where_("id = ?", values![7])?;
//! assert_eq!(q.to_sql(), "UPDATE users SET name=? WHERE id = ?");
//! let affected = q.execute(false).await?;
//! ```

mod builder;
mod placeholder;

pub use builder::{MAX_LIMIT, QueryBuilder};
pub use placeholder::{count_placeholders, number_placeholders};

use crate::row::Record;

/// The statement a builder was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`QueryBuilder::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Rows returned by the statement.
    Rows(Vec<Record>),
    /// Number of rows affected.
    Affected(u64),
}

impl Outcome {
    pub fn rows(&self) -> Option<&[Record]> {
        match self {
            Outcome::Rows(rows) => Some(rows),
            Outcome::Affected(_) => None,
        }
    }

    pub fn affected(&self) -> Option<u64> {
        match self {
            Outcome::Rows(_) => None,
            Outcome::Affected(n) => Some(*n),
        }
    }

    /// The returned rows; empty for [`Outcome::Affected`].
    pub fn into_rows(self) -> Vec<Record> {
        match self {
            Outcome::Rows(rows) => rows,
            Outcome::Affected(_) => Vec::new(),
        }
    }
}
