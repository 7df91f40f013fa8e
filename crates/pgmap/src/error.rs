//! Error types for pgmap

use thiserror::Error;

/// Result type alias for pgmap operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Boxed underlying cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for mapping and query building
#[derive(Debug, Error)]
pub enum OrmError {
    /// The session could not be established or failed its liveness probe.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid configuration (unparsable file, bad port, unknown driver...)
    #[error("Config error: {0}")]
    Config(String),

    /// Catalog introspection failed for a table (or for table discovery).
    #[error("Introspection error on '{table}': {message}")]
    Introspection {
        table: String,
        message: String,
        #[source]
        source: Box<OrmError>,
    },

    /// Two source tables normalize to the same proxy key.
    #[error("Duplicate table key '{key}': '{existing}' and '{duplicate}'")]
    DuplicateTable {
        key: String,
        existing: String,
        duplicate: String,
    },

    /// Table (or connection) not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not trusted for CRUD on this mapper.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// INSERT value count does not match the table's column count.
    #[error("Column mismatch: table has {expected} columns, got {got} values")]
    ColumnMismatch { expected: usize, got: usize },

    /// Placeholder / value count mismatch.
    #[error("Parameter mismatch: expected {expected} values, got {got}")]
    ParamMismatch { expected: usize, got: usize },

    /// SET references a column the table does not have.
    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// LIMIT outside `1..=10000`.
    #[error("Bad limit {0}: expected an integer between 1 and 10000")]
    BadLimit(i64),

    /// Modifier applied in a state that does not allow it.
    #[error("State error: {0}")]
    State(String),

    /// Raw statement refused by the guard.
    #[error("Statement refused: {0}")]
    Refused(String),

    /// Function could not be attached to a table.
    #[error("Load error: {0}")]
    Load(String),

    /// Prepare/bind/execute failed; carries the database diagnostic.
    #[error("Execution error: {message}")]
    Execution {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Create an access denied error
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied(message.into())
    }

    /// Create an introspection error for a table, caused by `source`
    pub fn introspection(
        table: impl Into<String>,
        message: impl Into<String>,
        source: OrmError,
    ) -> Self {
        Self::Introspection {
            table: table.into(),
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Create an execution error caused by `source`
    pub fn execution(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Execution {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Stable kind name, used in error records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "ConnectionError",
            Self::Config(_) => "ConfigError",
            Self::Introspection { .. } => "IntrospectionError",
            Self::DuplicateTable { .. } => "DuplicateTableError",
            Self::NotFound(_) => "NotFoundError",
            Self::AccessDenied(_) => "AccessDeniedError",
            Self::ColumnMismatch { .. } => "ColumnMismatchError",
            Self::ParamMismatch { .. } => "ParamMismatchError",
            Self::UnknownColumn { .. } => "UnknownColumnError",
            Self::BadLimit(_) => "BadLimitError",
            Self::State(_) => "StateError",
            Self::Refused(_) => "RefusedError",
            Self::Load(_) => "LoadError",
            Self::Execution { .. } => "ExecutionError",
            Self::Decode { .. } => "DecodeError",
            Self::Other(_) => "Error",
        }
    }

    /// Check if this is an access denied error
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a state error
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }

    /// Check if this is an execution error
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    /// Convert a tokio_postgres error into an execution error, keeping SQLSTATE when present.
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        let message = match err.as_db_error() {
            Some(db_err) => format!("{} (SQLSTATE {})", db_err.message(), db_err.code().code()),
            None => err.to_string(),
        };
        Self::execution(message, err)
    }
}
