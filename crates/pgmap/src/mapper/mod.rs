//! Schema mapper: one [`TableProxy`] per discovered table.
//!
//! Construction opens (or wraps) a session, lists the tables of the configured schema,
//! lists the columns of each table in ordinal order, and indexes the proxies by their
//! normalized name. The result is a snapshot; it is never refreshed.
//!
//! ```ignore
//! let options = MapperOptions::default()
//!     .trust("handlers/users")
//!     .allow_function("touch")
//!     .functions(FunctionRegistry::new().register("touch", Touch));
//! let mapper = SchemaMapper::connect(&spec, options).await?;
//! let token = mapper.issue_token("handlers/users")?;
//! let rows = mapper.table("users")?.select(&token, Columns::All)?.fetch_all().await?;
//! ```

mod introspect;

use crate::access::{AccessToken, TrustedCallers};
use crate::client::Session;
use crate::config::{DEFAULT_BLACKLIST, MapperConfig};
use crate::dsn::ConnectionSpec;
use crate::errlog::ErrorLog;
use crate::error::{OrmError, OrmResult};
use crate::function::FunctionRegistry;
use crate::guard::ConnectionGuard;
use crate::table::TableProxy;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Capitalized lookup key: first character upper-cased, the rest lower-cased.
pub fn normalize_table_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// State shared between a mapper and its table proxies.
pub(crate) struct MapperShared<S: Session> {
    pub(crate) guard: ConnectionGuard<S>,
    pub(crate) trusted: TrustedCallers,
    pub(crate) allowed_functions: BTreeSet<String>,
    pub(crate) functions: FunctionRegistry<S>,
    pub(crate) error_log: ErrorLog,
}

/// Construction options for a [`SchemaMapper`].
pub struct MapperOptions<S: Session = tokio_postgres::Client> {
    pub schema: String,
    pub connect_timeout: Duration,
    pub blacklist: Vec<String>,
    pub trusted_callers: Vec<String>,
    pub allowed_functions: Vec<String>,
    pub functions: FunctionRegistry<S>,
    pub error_log: ErrorLog,
}

impl<S: Session> Default for MapperOptions<S> {
    fn default() -> Self {
        Self::from_config(&MapperConfig::default())
    }
}

impl<S: Session> MapperOptions<S> {
    /// Options from `config`, with an empty registry and the global error log.
    pub fn from_config(config: &MapperConfig) -> Self {
        Self {
            schema: config.schema.clone(),
            connect_timeout: config.connect_timeout(),
            blacklist: config.blacklist.clone(),
            trusted_callers: config.trusted_callers.clone(),
            allowed_functions: config.allowed_functions.clone(),
            functions: FunctionRegistry::new(),
            error_log: ErrorLog::global().clone(),
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn blacklist<I, V>(mut self, verbs: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.blacklist = verbs.into_iter().map(Into::into).collect();
        self
    }

    pub fn trust(mut self, identity: impl Into<String>) -> Self {
        self.trusted_callers.push(identity.into());
        self
    }

    pub fn allow_function(mut self, name: impl Into<String>) -> Self {
        self.allowed_functions.push(name.into());
        self
    }

    pub fn functions(mut self, registry: FunctionRegistry<S>) -> Self {
        self.functions = registry;
        self
    }

    pub fn error_log(mut self, log: ErrorLog) -> Self {
        self.error_log = log;
        self
    }
}

impl<S: Session> std::fmt::Debug for MapperOptions<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperOptions")
            .field("schema", &self.schema)
            .field("connect_timeout", &self.connect_timeout)
            .field("blacklist", &self.blacklist)
            .field("trusted_callers", &self.trusted_callers)
            .field("allowed_functions", &self.allowed_functions)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

/// Introspected view of one database schema.
pub struct SchemaMapper<S: Session = tokio_postgres::Client> {
    shared: Arc<MapperShared<S>>,
    database_name: String,
    schema: String,
    tables: Vec<TableProxy<S>>,
    index: BTreeMap<String, usize>,
}

impl<S: Session> std::fmt::Debug for SchemaMapper<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaMapper")
            .field("id", &self.id())
            .field("database_name", &self.database_name)
            .field("schema", &self.schema)
            .field("tables", &self.table_names())
            .finish_non_exhaustive()
    }
}

impl SchemaMapper<tokio_postgres::Client> {
    /// Connect to `spec` and map its schema.
    pub async fn connect(spec: &ConnectionSpec, options: MapperOptions) -> OrmResult<Self> {
        let guard =
            ConnectionGuard::open(spec, options.connect_timeout, options.error_log.clone()).await?;
        Self::build(guard, spec.database.clone(), options).await
    }
}

impl<S: Session> SchemaMapper<S> {
    /// Map the schema behind an established session.
    pub async fn from_session(
        session: S,
        database_name: impl Into<String>,
        options: MapperOptions<S>,
    ) -> OrmResult<Self> {
        let guard = ConnectionGuard::from_session(session, options.error_log.clone()).await?;
        Self::build(guard, database_name.into(), options).await
    }

    async fn build(
        guard: ConnectionGuard<S>,
        database_name: String,
        options: MapperOptions<S>,
    ) -> OrmResult<Self> {
        let MapperOptions {
            schema,
            blacklist,
            trusted_callers,
            allowed_functions,
            functions,
            error_log,
            ..
        } = options;

        if blacklist.is_empty() {
            guard.set_blacklist(DEFAULT_BLACKLIST);
        } else {
            guard.set_blacklist(&blacklist);
        }

        let names = match introspect::discover_tables(&guard, &database_name, &schema).await {
            Ok(names) => names,
            Err(e) => {
                let err = OrmError::introspection(
                    format!("{database_name}.{schema}"),
                    "table discovery failed",
                    e,
                );
                error_log.record(&err);
                return Err(err);
            }
        };

        let mut discovered = Vec::with_capacity(names.len());
        for name in names {
            let columns =
                match introspect::discover_columns(&guard, &database_name, &schema, &name).await {
                    Ok(columns) => columns,
                    Err(e) => {
                        error_log.record(&OrmError::introspection(
                            name.as_str(),
                            "column discovery failed",
                            e,
                        ));
                        Vec::new()
                    }
                };
            discovered.push((name, columns));
        }

        let shared = Arc::new(MapperShared {
            guard,
            trusted: TrustedCallers::new(trusted_callers),
            allowed_functions: allowed_functions
                .iter()
                .map(|name| name.to_ascii_lowercase())
                .collect(),
            functions,
            error_log,
        });

        let mut tables: Vec<TableProxy<S>> = Vec::with_capacity(discovered.len());
        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        for (name, columns) in discovered {
            let key = normalize_table_name(&name);
            if let Some(&existing) = index.get(&key) {
                let err = OrmError::DuplicateTable {
                    key,
                    existing: tables[existing].name().to_string(),
                    duplicate: name,
                };
                shared.error_log.record(&err);
                return Err(err);
            }
            index.insert(key.clone(), tables.len());
            tables.push(TableProxy::new(name, key, columns, Arc::downgrade(&shared)));
        }

        tracing::info!(
            target: "pgmap",
            database = %database_name,
            schema = %schema,
            tables = tables.len(),
            "schema mapped"
        );

        Ok(Self {
            shared,
            database_name,
            schema,
            tables,
            index,
        })
    }

    /// Identifier of this mapper instance; tokens are bound to it.
    pub fn id(&self) -> Uuid {
        self.shared.trusted.mapper_id()
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn guard(&self) -> &ConnectionGuard<S> {
        &self.shared.guard
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.shared.error_log
    }

    fn position(&self, name: &str) -> OrmResult<usize> {
        let key = normalize_table_name(name);
        match self.index.get(&key) {
            Some(&pos) => Ok(pos),
            None => {
                let err = OrmError::not_found(format!("table {name} (key {key})"));
                self.shared.error_log.record(&err);
                Err(err)
            }
        }
    }

    /// Proxy for `name`, matched by normalized key.
    pub fn table(&self, name: &str) -> OrmResult<&TableProxy<S>> {
        let pos = self.position(name)?;
        Ok(&self.tables[pos])
    }

    pub fn table_mut(&mut self, name: &str) -> OrmResult<&mut TableProxy<S>> {
        let pos = self.position(name)?;
        Ok(&mut self.tables[pos])
    }

    /// Proxies in discovery order.
    pub fn tables(&self) -> impl Iterator<Item = &TableProxy<S>> {
        self.tables.iter()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(TableProxy::name).collect()
    }

    pub fn columns(&self, table: &str) -> OrmResult<&[String]> {
        Ok(self.table(table)?.columns())
    }

    /// Mint a CRUD token for `identity` if it is a trusted caller.
    pub fn issue_token(&self, identity: &str) -> OrmResult<AccessToken> {
        self.shared.trusted.issue(identity).inspect_err(|e| {
            self.shared.error_log.record(e);
        })
    }

    /// Stop trusting `identity`; tokens already issued to it stop working.
    pub fn revoke_caller(&self, identity: &str) -> bool {
        self.shared.trusted.revoke(identity)
    }

    pub fn trusted_callers(&self) -> Vec<String> {
        self.shared.trusted.list()
    }

    pub fn allowed_functions(&self) -> impl Iterator<Item = &str> {
        self.shared.allowed_functions.iter().map(String::as_str)
    }
}
