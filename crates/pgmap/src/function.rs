//! Named functions that can be attached to a table.
//!
//! The host registers implementations in a [`FunctionRegistry`] and lists the names it
//! permits in the mapper's allowed-function set. [`TableProxy::load`] attaches a
//! function only when both agree. Attached functions receive the table as an explicit
//! argument and go through the same access-checked CRUD entry points as any caller.
//!
//! ```ignore
//! struct CountRows;
//!
//! #[async_trait::async_trait]
//! impl TableFunction<tokio_postgres::Client> for CountRows {
//!     async fn call(
//!         &self,
//!         table: &TableProxy<tokio_postgres::Client>,
//!         access: &AccessToken,
//!         _args: Vec<Value>,
//!     ) -> OrmResult<Value> {
//!         let rows = table.select(access, "COUNT(*) AS n")?.fetch_all().await?;
//!         Ok(rows[0].try_get("n")?.clone())
//!     }
//! }
//! ```
//!
//! [`TableProxy::load`]: crate::TableProxy::load

use crate::access::AccessToken;
use crate::client::Session;
use crate::error::OrmResult;
use crate::table::TableProxy;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A callable attached to a table.
#[async_trait::async_trait]
pub trait TableFunction<S: Session>: Send + Sync {
    async fn call(
        &self,
        table: &TableProxy<S>,
        access: &AccessToken,
        args: Vec<Value>,
    ) -> OrmResult<Value>;
}

/// Name → implementation. Names are case-insensitive.
pub struct FunctionRegistry<S: Session> {
    functions: BTreeMap<String, Arc<dyn TableFunction<S>>>,
}

impl<S: Session> Default for FunctionRegistry<S> {
    fn default() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }
}

impl<S: Session> Clone for FunctionRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            functions: self.functions.clone(),
        }
    }
}

impl<S: Session> std::fmt::Debug for FunctionRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.functions.keys()).finish()
    }
}

impl<S: Session> FunctionRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `name`, replacing any previous registration.
    pub fn register(mut self, name: &str, function: impl TableFunction<S> + 'static) -> Self {
        self.functions
            .insert(name.to_ascii_lowercase(), Arc::new(function));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TableFunction<S>>> {
        self.functions.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
