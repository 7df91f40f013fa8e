//! Connection tuples and DSN assembly.

use crate::error::{OrmError, OrmResult};
use std::time::Duration;

/// Driver prefixes accepted in a DSN.
pub const SUPPORTED_DRIVERS: [&str; 3] = ["pgsql", "postgres", "postgresql"];

/// One named connection: `(name, driver, host, port, database, user, password)`.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    pub name: String,
    pub driver: String,
    pub host: String,
    pub port: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for ConnectionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSpec")
            .field("name", &self.name)
            .field("dsn", &self.dsn())
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ConnectionSpec {
    /// Build a spec from a 7-tuple in configuration order. Any other length is `None`.
    pub fn from_tuple(parts: Vec<String>) -> Option<Self> {
        let [name, driver, host, port, database, user, password]: [String; 7] =
            parts.try_into().ok()?;
        Some(Self {
            name,
            driver,
            host,
            port,
            database,
            user,
            password,
        })
    }

    /// Parse `driver:host=<host>;port=<port>;dbname=<db>`.
    pub fn from_dsn(
        name: impl Into<String>,
        dsn: &str,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> OrmResult<Self> {
        let (driver, rest) = dsn
            .split_once(':')
            .ok_or_else(|| OrmError::Config(format!("DSN '{dsn}' has no driver prefix")))?;

        let (mut host, mut port, mut database) = (None, None, None);
        for pair in rest.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| OrmError::Config(format!("malformed DSN segment '{pair}'")))?;
            match key.trim() {
                "host" => host = Some(value.trim().to_string()),
                "port" => port = Some(value.trim().to_string()),
                "dbname" => database = Some(value.trim().to_string()),
                other => {
                    return Err(OrmError::Config(format!("unknown DSN key '{other}'")));
                }
            }
        }

        let missing = |key: &str| OrmError::Config(format!("DSN '{dsn}' is missing {key}"));
        Ok(Self {
            name: name.into(),
            driver: driver.trim().to_string(),
            host: host.ok_or_else(|| missing("host"))?,
            port: port.unwrap_or_else(|| "5432".to_string()),
            database: database.ok_or_else(|| missing("dbname"))?,
            user: user.into(),
            password: password.into(),
        })
    }

    /// `driver:host=<host>;port=<port>;dbname=<db>`
    pub fn dsn(&self) -> String {
        format!(
            "{}:host={};port={};dbname={}",
            self.driver, self.host, self.port, self.database
        )
    }

    /// Translate into a `tokio_postgres::Config`.
    pub fn to_pg_config(&self, connect_timeout: Duration) -> OrmResult<tokio_postgres::Config> {
        if !SUPPORTED_DRIVERS.contains(&self.driver.to_ascii_lowercase().as_str()) {
            return Err(OrmError::Connection(format!(
                "unsupported driver '{}' for connection '{}'",
                self.driver, self.name
            )));
        }
        let port: u16 = self.port.parse().map_err(|_| {
            OrmError::Config(format!(
                "invalid port '{}' for connection '{}'",
                self.port, self.name
            ))
        })?;

        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(port)
            .dbname(&self.database)
            .user(&self.user)
            .password(&self.password)
            .application_name("pgmap")
            .connect_timeout(connect_timeout);
        Ok(config)
    }
}

/// Group ordered `(key, value)` pairs into connection specs.
///
/// Contiguous keys containing `marker` are collected seven at a time. A key without
/// the marker breaks the run and drops any partial group, as does the end of input.
/// A later group with an existing name replaces the earlier one.
pub fn group_connections<I, K, V>(pairs: I, marker: &str) -> Vec<ConnectionSpec>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut specs: Vec<ConnectionSpec> = Vec::new();
    let mut group: Vec<String> = Vec::with_capacity(7);

    for (key, value) in pairs {
        if !key.as_ref().contains(marker) {
            if !group.is_empty() {
                tracing::debug!(dropped = group.len(), "incomplete connection group dropped");
            }
            group.clear();
            continue;
        }

        group.push(value.into());
        if group.len() == 7 {
            if let Some(spec) = ConnectionSpec::from_tuple(std::mem::take(&mut group)) {
                specs.retain(|s| s.name != spec.name);
                specs.push(spec);
            }
        }
    }

    specs
}
