//! # pgmap
//!
//! A schema-introspecting data-access layer for PostgreSQL.
//!
//! ## Features
//!
//! - **Schema snapshot**: tables and columns are discovered once, at connection time
//! - **Per-table proxies**: `insert` / `select` / `update` / `delete` entry points, looked
//!   up by a normalized name (`users`, `Users` and `USERS` are the same table)
//! - **Capability access check**: CRUD requires an [`AccessToken`] minted by the mapper
//!   for a trusted caller identity
//! - **Stateful builders**: clause order and arity are validated; values are always bound
//! - **Guarded raw reads**: raw text only runs through [`ConnectionGuard::query`], which
//!   refuses blacklisted verbs
//! - **Error log**: every failure is returned *and* recorded with its source location
//!
//! ## Usage
//!
//! ```ignore
//! use pgmap::{Database, MapperConfig, values};
//!
//! let db: Database = Database::from_env_file(".env", MapperConfig::load("pgmap.toml")?)?;
//! let mapper = db.try_open_connection("main").await?;
//! let token = mapper.issue_token("handlers/users")?;
//! let users = mapper.table("users")?;
//!
//! // SELECT
//! let rows = users
//!     .select(&token, ["id", "name"])?
//!     .where_("status = ?", values!["active"])?
//!     .limit(20)?
//!     .fetch_all()
//!     .await?;
//!
//! // INSERT
//! users.insert(&token, values![7, "alice", "active"])?.execute(false).await?;
//!
//! // UPDATE
//! users
//!     .update(&token)?
//!     .set(&["status"], values!["inactive"])?
//!     .where_("id = ?", values![7])?
//!     .execute(false)
//!     .await?;
//! ```

pub mod access;
pub mod client;
pub mod config;
pub mod dsn;
pub mod errlog;
pub mod error;
pub mod function;
pub mod guard;
pub mod ident;
pub mod mapper;
pub mod qb;
pub mod registry;
pub mod row;
pub mod table;
pub mod value;

#[cfg(test)]
mod testing;

pub use access::AccessToken;
pub use client::Session;
pub use config::{DEFAULT_BLACKLIST, DEFAULT_CONNECTION_MARKER, MapperConfig};
pub use dsn::{ConnectionSpec, SUPPORTED_DRIVERS, group_connections};
pub use errlog::{ErrorLog, ErrorRecord};
pub use error::{BoxError, OrmError, OrmResult};
pub use function::{FunctionRegistry, TableFunction};
pub use guard::ConnectionGuard;
pub use mapper::{MapperOptions, SchemaMapper, normalize_table_name};
pub use qb::{MAX_LIMIT, Outcome, QueryBuilder, StatementKind};
pub use registry::Database;
pub use row::Record;
pub use table::{Columns, TableProxy};
pub use value::Value;
