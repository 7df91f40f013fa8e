//! TOML configuration.
//!
//! ```toml
//! schema = "public"
//! connect_timeout_secs = 5
//! connection_marker = "DB"
//! blacklist = ["DELETE", "DROP", "TRUNCATE"]
//! trusted_callers = ["app/controllers/users.rs"]
//! allowed_functions = ["touch"]
//! ```

use crate::error::{OrmError, OrmResult};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Verbs refused by [`ConnectionGuard::query`](crate::ConnectionGuard::query) by default.
pub const DEFAULT_BLACKLIST: [&str; 3] = ["DELETE", "DROP", "TRUNCATE"];

/// Substring that marks a key as part of a connection tuple.
pub const DEFAULT_CONNECTION_MARKER: &str = "DB";

/// Mapper and registry configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapperConfig {
    /// Catalog schema whose tables are mapped.
    pub schema: String,
    pub connect_timeout_secs: u64,
    pub connection_marker: String,
    pub blacklist: Vec<String>,
    pub trusted_callers: Vec<String>,
    pub allowed_functions: Vec<String>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            connect_timeout_secs: 5,
            connection_marker: DEFAULT_CONNECTION_MARKER.to_string(),
            blacklist: DEFAULT_BLACKLIST.iter().map(|s| s.to_string()).collect(),
            trusted_callers: Vec::new(),
            allowed_functions: Vec::new(),
        }
    }
}

impl MapperConfig {
    pub fn from_toml_str(raw: &str) -> OrmResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| OrmError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> OrmResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OrmError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    fn validate(&self) -> OrmResult<()> {
        if self.schema.trim().is_empty() {
            return Err(OrmError::Config("schema must not be empty".to_string()));
        }
        if self.connection_marker.is_empty() {
            return Err(OrmError::Config(
                "connection_marker must not be empty".to_string(),
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(OrmError::Config(
                "connect_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = MapperConfig::from_toml_str("").unwrap();
        assert_eq!(config, MapperConfig::default());
        assert_eq!(config.blacklist, vec!["DELETE", "DROP", "TRUNCATE"]);
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn parses_lists() {
        let config = MapperConfig::from_toml_str(
            r#"
schema = "app"
trusted_callers = ["handlers/users"]
allowed_functions = ["touch", "archive"]
blacklist = ["DROP"]
"#,
        )
        .unwrap();
        assert_eq!(config.schema, "app");
        assert_eq!(config.trusted_callers, vec!["handlers/users"]);
        assert_eq!(config.allowed_functions.len(), 2);
        assert_eq!(config.blacklist, vec!["DROP"]);
        assert_eq!(config.connection_marker, "DB");
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(matches!(
            MapperConfig::from_toml_str("shcema = \"x\""),
            Err(OrmError::Config(_))
        ));
        assert!(matches!(
            MapperConfig::from_toml_str("connect_timeout_secs = 0"),
            Err(OrmError::Config(_))
        ));
    }
}
