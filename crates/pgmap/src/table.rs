//! Per-table CRUD entry points.

use crate::access::AccessToken;
use crate::client::Session;
use crate::error::{OrmError, OrmResult};
use crate::function::TableFunction;
use crate::mapper::MapperShared;
use crate::qb::QueryBuilder;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

/// Column list of a SELECT.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Columns {
    /// `*`
    #[default]
    All,
    /// Trusted select-list text, inserted verbatim. Empty means `*`.
    Raw(String),
    /// Column expressions joined with `,`. Empty means `*`.
    List(Vec<String>),
}

impl Columns {
    pub fn to_sql(&self) -> String {
        match self {
            Columns::All => "*".to_string(),
            Columns::Raw(raw) if raw.trim().is_empty() => "*".to_string(),
            Columns::Raw(raw) => raw.clone(),
            Columns::List(list) if list.is_empty() => "*".to_string(),
            Columns::List(list) => list.join(","),
        }
    }
}

impl From<&str> for Columns {
    fn from(raw: &str) -> Self {
        Columns::Raw(raw.to_string())
    }
}

impl From<String> for Columns {
    fn from(raw: String) -> Self {
        Columns::Raw(raw)
    }
}

impl From<Vec<String>> for Columns {
    fn from(list: Vec<String>) -> Self {
        Columns::List(list)
    }
}

impl From<Vec<&str>> for Columns {
    fn from(list: Vec<&str>) -> Self {
        Columns::List(list.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Columns {
    fn from(list: &[&str]) -> Self {
        Columns::List(list.iter().map(|c| c.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Columns {
    fn from(list: [&str; N]) -> Self {
        Columns::List(list.iter().map(|c| c.to_string()).collect())
    }
}

/// A mapped table.
///
/// Holds a weak handle to its mapper; every CRUD entry point checks the caller's
/// [`AccessToken`] against it before a builder is handed out.
pub struct TableProxy<S: Session = tokio_postgres::Client> {
    name: String,
    key: String,
    columns: Vec<String>,
    mapper: Weak<MapperShared<S>>,
    attached: BTreeMap<String, Arc<dyn TableFunction<S>>>,
}

impl<S: Session> std::fmt::Debug for TableProxy<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableProxy")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("columns", &self.columns)
            .field("attached", &self.attached.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<S: Session> TableProxy<S> {
    pub(crate) fn new(
        name: String,
        key: String,
        columns: Vec<String>,
        mapper: Weak<MapperShared<S>>,
    ) -> Self {
        Self {
            name,
            key,
            columns,
            mapper,
            attached: BTreeMap::new(),
        }
    }

    /// Table name as stored in the catalog.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized lookup key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Column names in ordinal order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    #[track_caller]
    fn authorize(&self, access: &AccessToken) -> OrmResult<Arc<MapperShared<S>>> {
        let Some(mapper) = self.mapper.upgrade() else {
            return Err(OrmError::state(format!(
                "mapper for table {} has been dropped",
                self.name
            )));
        };
        if let Err(e) = mapper.trusted.verify(access) {
            mapper.error_log.record(&e);
            tracing::warn!(
                target: "pgmap",
                table = %self.name,
                identity = %access.identity(),
                "access denied"
            );
            return Err(e);
        }
        Ok(mapper)
    }

    /// `INSERT INTO <table> VALUES(?,...)` with one value per mapped column.
    pub fn insert(
        &self,
        access: &AccessToken,
        values: Vec<Value>,
    ) -> OrmResult<QueryBuilder<'_, S>> {
        let mapper = self.authorize(access)?;
        QueryBuilder::insert(self, mapper, values)
    }

    pub fn select(
        &self,
        access: &AccessToken,
        columns: impl Into<Columns>,
    ) -> OrmResult<QueryBuilder<'_, S>> {
        let mapper = self.authorize(access)?;
        Ok(QueryBuilder::select(self, mapper, &columns.into()))
    }

    pub fn update(&self, access: &AccessToken) -> OrmResult<QueryBuilder<'_, S>> {
        let mapper = self.authorize(access)?;
        Ok(QueryBuilder::update(self, mapper))
    }

    pub fn delete(&self, access: &AccessToken) -> OrmResult<QueryBuilder<'_, S>> {
        let mapper = self.authorize(access)?;
        Ok(QueryBuilder::delete(self, mapper))
    }

    /// Attach registered functions by name.
    ///
    /// Every name must be allowed by the mapper and present in its registry; otherwise
    /// nothing is attached.
    pub fn load<I, N>(&mut self, names: I) -> OrmResult<()>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let Some(mapper) = self.mapper.upgrade() else {
            return Err(OrmError::state(format!(
                "mapper for table {} has been dropped",
                self.name
            )));
        };

        let mut resolved = Vec::new();
        for name in names {
            let key = name.as_ref().to_ascii_lowercase();
            if !mapper.allowed_functions.contains(&key) {
                let err = OrmError::Load(format!("function {} is not allowed", name.as_ref()));
                mapper.error_log.record(&err);
                return Err(err);
            }
            let Some(function) = mapper.functions.get(&key) else {
                let err = OrmError::Load(format!("function {} is not registered", name.as_ref()));
                mapper.error_log.record(&err);
                return Err(err);
            };
            resolved.push((key, function));
        }

        for (key, function) in resolved {
            tracing::debug!(target: "pgmap", table = %self.name, function = %key, "attached");
            self.attached.insert(key, function);
        }
        Ok(())
    }

    /// Names of the attached functions, sorted.
    pub fn attached_functions(&self) -> impl Iterator<Item = &str> {
        self.attached.keys().map(String::as_str)
    }

    pub fn is_attached(&self, name: &str) -> bool {
        self.attached.contains_key(&name.to_ascii_lowercase())
    }

    /// Invoke an attached function. Returns `Ok(None)` when `name` is not attached.
    pub async fn call(
        &self,
        name: &str,
        access: &AccessToken,
        args: Vec<Value>,
    ) -> OrmResult<Option<Value>> {
        let Some(function) = self.attached.get(&name.to_ascii_lowercase()).cloned() else {
            return Ok(None);
        };
        self.authorize(access)?;
        function.call(self, access, args).await.map(Some)
    }
}
