use super::placeholder::{count_placeholders, number_placeholders};
use super::{Outcome, StatementKind};
use crate::client::Session;
use crate::error::{OrmError, OrmResult};
use crate::ident::quote_ident;
use crate::mapper::MapperShared;
use crate::row::Record;
use crate::table::{Columns, TableProxy};
use crate::value::Value;
use std::sync::Arc;

/// Largest accepted `LIMIT`.
pub const MAX_LIMIT: i64 = 10_000;

const MAX_LOGGED_SQL_BYTES: usize = 512;

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// One statement under construction against a mapped table.
pub struct QueryBuilder<'t, S: Session = tokio_postgres::Client> {
    kind: StatementKind,
    table: &'t TableProxy<S>,
    mapper: Arc<MapperShared<S>>,
    sql: String,
    params: Vec<Value>,
    set_applied: bool,
    where_applied: bool,
    limit_set: bool,
    executed: bool,
}

impl<S: Session> std::fmt::Debug for QueryBuilder<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("kind", &self.kind)
            .field("table", &self.table.name())
            .field("sql", &self.sql)
            .field("params", &self.params)
            .field("executed", &self.executed)
            .finish_non_exhaustive()
    }
}

impl<'t, S: Session> QueryBuilder<'t, S> {
    fn new(
        kind: StatementKind,
        table: &'t TableProxy<S>,
        mapper: Arc<MapperShared<S>>,
        sql: String,
    ) -> Self {
        Self {
            kind,
            table,
            mapper,
            sql,
            params: Vec::new(),
            set_applied: false,
            where_applied: false,
            limit_set: false,
            executed: false,
        }
    }

    pub(crate) fn select(
        table: &'t TableProxy<S>,
        mapper: Arc<MapperShared<S>>,
        columns: &Columns,
    ) -> Self {
        let sql = format!(
            "SELECT {} FROM {}",
            columns.to_sql(),
            quote_ident(table.name())
        );
        Self::new(StatementKind::Select, table, mapper, sql)
    }

    pub(crate) fn insert(
        table: &'t TableProxy<S>,
        mapper: Arc<MapperShared<S>>,
        values: Vec<Value>,
    ) -> OrmResult<Self> {
        let expected = table.columns().len();
        if values.len() != expected {
            let err = OrmError::ColumnMismatch {
                expected,
                got: values.len(),
            };
            mapper.error_log.record(&err);
            return Err(err);
        }
        if expected == 0 {
            let err = OrmError::state(format!(
                "table {} has no mapped columns to insert into",
                table.name()
            ));
            mapper.error_log.record(&err);
            return Err(err);
        }

        let placeholders = vec!["?"; values.len()].join(",");
        let sql = format!(
            "INSERT INTO {} VALUES({placeholders})",
            quote_ident(table.name())
        );
        let mut builder = Self::new(StatementKind::Insert, table, mapper, sql);
        builder.params = values;
        Ok(builder)
    }

    pub(crate) fn update(table: &'t TableProxy<S>, mapper: Arc<MapperShared<S>>) -> Self {
        let sql = format!("UPDATE {}", quote_ident(table.name()));
        Self::new(StatementKind::Update, table, mapper, sql)
    }

    pub(crate) fn delete(table: &'t TableProxy<S>, mapper: Arc<MapperShared<S>>) -> Self {
        let sql = format!("DELETE FROM {}", quote_ident(table.name()));
        Self::new(StatementKind::Delete, table, mapper, sql)
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn table(&self) -> &'t TableProxy<S> {
        self.table
    }

    /// Statement text with `?` placeholders.
    pub fn to_sql(&self) -> &str {
        &self.sql
    }

    /// Statement text as sent to the server, with `$n` placeholders.
    pub fn exec_sql(&self) -> String {
        number_placeholders(&self.sql)
    }

    /// Bound parameters, in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    #[track_caller]
    fn fail<T>(&self, err: OrmError) -> OrmResult<T> {
        self.mapper.error_log.record(&err);
        Err(err)
    }

    /// Append ` SET c1=?,c2=?`. UPDATE only, once, before WHERE.
    pub fn set<C: AsRef<str>>(&mut self, columns: &[C], values: Vec<Value>) -> OrmResult<&mut Self> {
        if self.kind != StatementKind::Update {
            return self.fail(OrmError::state(format!(
                "SET is only valid on UPDATE, not {}",
                self.kind
            )));
        }
        if self.set_applied {
            return self.fail(OrmError::state("SET already applied"));
        }
        if self.where_applied {
            return self.fail(OrmError::state("SET must come before WHERE"));
        }
        if columns.len() != values.len() {
            return self.fail(OrmError::ParamMismatch {
                expected: columns.len(),
                got: values.len(),
            });
        }
        if columns.is_empty() {
            return self.fail(OrmError::state("SET needs at least one column"));
        }
        if let Some(unknown) = columns
            .iter()
            .map(AsRef::<str>::as_ref)
            .find(|c| !self.table.has_column(c))
        {
            return self.fail(OrmError::UnknownColumn {
                table: self.table.name().to_string(),
                column: unknown.to_string(),
            });
        }

        let assignments = columns
            .iter()
            .map(|c| format!("{}=?", quote_ident(c.as_ref())))
            .collect::<Vec<_>>()
            .join(",");
        self.sql.push_str(" SET ");
        self.sql.push_str(&assignments);
        self.params.extend(values);
        self.set_applied = true;
        Ok(self)
    }

    /// Append ` WHERE <condition>`.
    ///
    /// `condition` is trusted SQL; every value must have a matching `?` in it.
    pub fn where_(&mut self, condition: &str, values: Vec<Value>) -> OrmResult<&mut Self> {
        if self.kind == StatementKind::Insert {
            return self.fail(OrmError::state("WHERE is not valid on INSERT"));
        }
        if self.limit_set {
            return self.fail(OrmError::state("WHERE cannot follow LIMIT"));
        }
        if self.where_applied {
            return self.fail(OrmError::state("WHERE already applied"));
        }
        if self.kind == StatementKind::Update && !self.set_applied {
            return self.fail(OrmError::state("UPDATE needs SET before WHERE"));
        }
        if condition.trim().is_empty() {
            return self.fail(OrmError::state("WHERE condition must not be empty"));
        }
        let expected = count_placeholders(condition);
        if expected != values.len() {
            return self.fail(OrmError::ParamMismatch {
                expected,
                got: values.len(),
            });
        }

        self.sql.push_str(" WHERE ");
        self.sql.push_str(condition);
        self.params.extend(values);
        self.where_applied = true;
        Ok(self)
    }

    /// Append ` LIMIT <n>`. SELECT only, once, `1..=MAX_LIMIT`.
    pub fn limit(&mut self, n: i64) -> OrmResult<&mut Self> {
        if self.limit_set {
            return self.fail(OrmError::state("LIMIT already applied"));
        }
        if self.kind != StatementKind::Select {
            return self.fail(OrmError::state(format!(
                "LIMIT is only valid on SELECT, not {}",
                self.kind
            )));
        }
        if !(1..=MAX_LIMIT).contains(&n) {
            return self.fail(OrmError::BadLimit(n));
        }

        self.sql.push_str(" LIMIT ");
        self.sql.push_str(&n.to_string());
        self.limit_set = true;
        Ok(self)
    }

    /// Run the statement on the mapper's session.
    ///
    /// With `want_results` the rows are returned, otherwise the affected count. A
    /// builder runs at most once, even if the database rejects the statement.
    pub async fn execute(&mut self, want_results: bool) -> OrmResult<Outcome> {
        if self.executed {
            return self.fail(OrmError::state("statement already executed"));
        }
        if self.kind == StatementKind::Update && !self.set_applied {
            return self.fail(OrmError::state("UPDATE needs SET before execute"));
        }
        self.executed = true;

        let sql = self.exec_sql();
        tracing::debug!(
            target: "pgmap.sql",
            kind = %self.kind,
            table = %self.table.name(),
            param_count = self.params.len(),
            sql = %truncate_sql_bytes(&sql, MAX_LOGGED_SQL_BYTES),
            "execute"
        );

        let session = self.mapper.guard.session();
        let result = if want_results {
            session.query(&sql, &self.params).await.map(Outcome::Rows)
        } else {
            session.execute(&sql, &self.params).await.map(Outcome::Affected)
        };
        result.inspect_err(|e| self.mapper.error_log.record(e))
    }

    /// `execute(true)`, returning the rows.
    pub async fn fetch_all(&mut self) -> OrmResult<Vec<Record>> {
        Ok(self.execute(true).await?.into_rows())
    }
}
