//! Named connection registry.
//!
//! Connection tuples come from ordered `KEY=value` pairs, usually a `.env` file:
//!
//! ```text
//! DB_NAME=main
//! DB_TYPE=pgsql
//! DB_HOST=localhost
//! DB_PORT=5432
//! DB_DATABASE=shop
//! DB_USER=app
//! DB_PASSWORD=secret
//! ```
//!
//! The registry is filled once and only read afterwards.

use crate::client::Session;
use crate::config::MapperConfig;
use crate::dsn::{ConnectionSpec, group_connections};
use crate::errlog::ErrorLog;
use crate::error::{OrmError, OrmResult};
use crate::function::FunctionRegistry;
use crate::mapper::{MapperOptions, SchemaMapper};
use std::path::Path;

/// Named connections plus the options every opened mapper shares.
pub struct Database<S: Session = tokio_postgres::Client> {
    connections: Vec<ConnectionSpec>,
    config: MapperConfig,
    functions: FunctionRegistry<S>,
    error_log: ErrorLog,
}

impl<S: Session> std::fmt::Debug for Database<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("connections", &self.connections)
            .field("config", &self.config)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

impl<S: Session> Database<S> {
    pub fn new(connections: Vec<ConnectionSpec>, config: MapperConfig) -> Self {
        Self {
            connections,
            config,
            functions: FunctionRegistry::new(),
            error_log: ErrorLog::global().clone(),
        }
    }

    /// Group ordered pairs using the configured connection marker.
    pub fn from_pairs<I, K, V>(pairs: I, config: MapperConfig) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let connections = group_connections(pairs, &config.connection_marker);
        Self::new(connections, config)
    }

    /// Read an env file in file order. The process environment is not modified.
    pub fn from_env_file(path: impl AsRef<Path>, config: MapperConfig) -> OrmResult<Self> {
        let path = path.as_ref();
        let iter = dotenvy::from_path_iter(path).map_err(|e| {
            OrmError::Config(format!("failed to read env file {}: {e}", path.display()))
        })?;
        let pairs = iter
            .collect::<Result<Vec<(String, String)>, _>>()
            .map_err(|e| {
                OrmError::Config(format!("failed to parse env file {}: {e}", path.display()))
            })?;

        let database = Self::from_pairs(pairs, config);
        tracing::debug!(
            target: "pgmap",
            path = %path.display(),
            connections = database.connections.len(),
            "env file loaded"
        );
        Ok(database)
    }

    /// Functions made available to every mapper opened from this registry.
    pub fn with_functions(mut self, functions: FunctionRegistry<S>) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_error_log(mut self, log: ErrorLog) -> Self {
        self.error_log = log;
        self
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    pub fn connections(&self) -> &[ConnectionSpec] {
        &self.connections
    }

    pub fn connection(&self, name: &str) -> Option<&ConnectionSpec> {
        self.connections.iter().find(|spec| spec.name == name)
    }

    /// Mapper options derived from the configuration.
    pub fn options(&self) -> MapperOptions<S> {
        MapperOptions::from_config(&self.config)
            .functions(self.functions.clone())
            .error_log(self.error_log.clone())
    }

    fn lookup(&self, name: &str) -> OrmResult<&ConnectionSpec> {
        self.connection(name).ok_or_else(|| {
            let err = OrmError::not_found(format!("connection {name}"));
            self.error_log.record(&err);
            err
        })
    }
}

impl Database<tokio_postgres::Client> {
    /// Connect to `name` and map its schema.
    pub async fn try_open_connection(
        &self,
        name: &str,
    ) -> OrmResult<SchemaMapper<tokio_postgres::Client>> {
        let spec = self.lookup(name)?;
        SchemaMapper::connect(spec, self.options()).await
    }

    /// Like [`Database::try_open_connection`], but failures only reach the error log.
    pub async fn open_connection(&self, name: &str) -> Option<SchemaMapper> {
        self.try_open_connection(name).await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemorySession;
    use std::io::Write;

    const ENV: &str = "\
DB_NAME=main
DB_TYPE=pgsql
DB_HOST=localhost
DB_PORT=5432
DB_DATABASE=shop
DB_USER=app
DB_PASSWORD=secret
APP_ENV=dev
DB_NAME=broken
DB_TYPE=pgsql
";

    fn env_file(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("pgmap-{}.env", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn env_file_groups_in_file_order() {
        let path = env_file(ENV);
        let db: Database<MemorySession> =
            Database::from_env_file(&path, MapperConfig::default()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(db.connections().len(), 1);
        let main = db.connection("main").unwrap();
        assert_eq!(main.dsn(), "pgsql:host=localhost;port=5432;dbname=shop");
        assert_eq!(main.user, "app");
        assert!(db.connection("broken").is_none());
    }

    #[test]
    fn missing_env_file_is_a_config_error() {
        let err = Database::<MemorySession>::from_env_file(
            "/nonexistent/pgmap.env",
            MapperConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, OrmError::Config(_)));
    }

    #[test]
    fn custom_marker_selects_other_keys() {
        let config = MapperConfig {
            connection_marker: "PG".to_string(),
            ..MapperConfig::default()
        };
        let pairs = [
            ("PG_NAME", "reports"),
            ("PG_DRIVER", "postgres"),
            ("PG_HOST", "db.internal"),
            ("PG_PORT", "6432"),
            ("PG_DB", "reports"),
            ("PG_USER", "ro"),
            ("PG_PASS", "pw"),
        ];
        let db: Database<MemorySession> = Database::from_pairs(pairs, config);
        assert_eq!(db.connections()[0].name, "reports");
        assert_eq!(db.connections()[0].port, "6432");
    }

    #[test]
    fn options_carry_config_and_shared_log() {
        let log = ErrorLog::new();
        let config = MapperConfig {
            trusted_callers: vec!["svc".to_string()],
            allowed_functions: vec!["touch".to_string()],
            ..MapperConfig::default()
        };
        let db: Database<MemorySession> = Database::new(Vec::new(), config).with_error_log(log);
        let options = db.options();
        assert_eq!(options.trusted_callers, vec!["svc"]);
        assert_eq!(options.allowed_functions, vec!["touch"]);
        assert_eq!(options.schema, "public");

        assert!(db.lookup("nope").unwrap_err().is_not_found());
        assert_eq!(db.error_log().last().map(|r| r.kind), Some("NotFoundError"));
    }

    #[tokio::test]
    async fn unknown_connection_opens_nothing() {
        let log = ErrorLog::new();
        let db: Database = Database::new(Vec::new(), MapperConfig::default()).with_error_log(log.clone());
        assert!(db.open_connection("missing").await.is_none());
        assert_eq!(log.len(), 1);
    }
}
