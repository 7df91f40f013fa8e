//! Catalog introspection through the guard.

use crate::client::Session;
use crate::error::{OrmError, OrmResult};
use crate::guard::ConnectionGuard;
use crate::ident::quote_literal;
use crate::row::Record;

pub(crate) fn tables_sql(database: &str, schema: &str) -> String {
    format!(
        "SELECT table_name::text AS table_name FROM information_schema.tables \
         WHERE table_catalog = {} AND table_schema = {} ORDER BY table_name",
        quote_literal(database),
        quote_literal(schema)
    )
}

pub(crate) fn columns_sql(database: &str, schema: &str, table: &str) -> String {
    format!(
        "SELECT column_name::text AS column_name FROM information_schema.columns \
         WHERE table_catalog = {} AND table_schema = {} AND table_name = {} \
         ORDER BY ordinal_position",
        quote_literal(database),
        quote_literal(schema),
        quote_literal(table)
    )
}

fn text_column(rows: &[Record], column: &str) -> OrmResult<Vec<String>> {
    rows.iter()
        .map(|row| {
            row.try_get(column)?
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| OrmError::decode(column, "expected text"))
        })
        .collect()
}

/// Table names in `schema`, in catalog order.
pub(crate) async fn discover_tables<S: Session>(
    guard: &ConnectionGuard<S>,
    database: &str,
    schema: &str,
) -> OrmResult<Vec<String>> {
    let rows = guard.query(&tables_sql(database, schema)).await?;
    text_column(&rows, "table_name")
}

/// Column names of `table`, in ordinal order.
pub(crate) async fn discover_columns<S: Session>(
    guard: &ConnectionGuard<S>,
    database: &str,
    schema: &str,
    table: &str,
) -> OrmResult<Vec<String>> {
    let rows = guard.query(&columns_sql(database, schema, table)).await?;
    text_column(&rows, "column_name")
}
