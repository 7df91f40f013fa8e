//! Connection guard: the live session plus a coarse raw-statement filter.
//!
//! Raw text reaches the database only through [`ConnectionGuard::query`], and only
//! when it looks like a read: it must mention `select` and must not contain any
//! blacklisted verb. The check is a case-insensitive substring test, not a parser, so
//! `SELECT * FROM dropped_items` is refused as well. Builders bypass the filter and
//! bind their parameters instead.

use crate::client::Session;
use crate::config::DEFAULT_BLACKLIST;
use crate::dsn::ConnectionSpec;
use crate::errlog::ErrorLog;
use crate::error::{OrmError, OrmResult};
use crate::row::Record;
use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard};
use std::time::Duration;
use tokio_postgres::NoTls;

/// Owns a live session and refuses raw statements containing blacklisted verbs.
pub struct ConnectionGuard<S: Session = tokio_postgres::Client> {
    session: S,
    blacklist: RwLock<BTreeSet<String>>,
    error_log: ErrorLog,
}

impl<S: Session> std::fmt::Debug for ConnectionGuard<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionGuard")
            .field("connected", &self.is_connected())
            .field("blacklist", &self.blacklist())
            .finish_non_exhaustive()
    }
}

impl ConnectionGuard<tokio_postgres::Client> {
    /// Connect to the database described by `spec`.
    ///
    /// The session is non-persistent (no pool), uses server-side prepared statements,
    /// and must answer `SELECT 1` before the guard is returned.
    pub async fn open(
        spec: &ConnectionSpec,
        connect_timeout: Duration,
        error_log: ErrorLog,
    ) -> OrmResult<Self> {
        let config = match spec.to_pg_config(connect_timeout) {
            Ok(config) => config,
            Err(e) => {
                error_log.record(&e);
                return Err(e);
            }
        };

        let (client, connection) = match config.connect(NoTls).await {
            Ok(pair) => pair,
            Err(e) => {
                let err = OrmError::Connection(format!(
                    "could not connect to '{}' ({}): {e}",
                    spec.name,
                    spec.dsn()
                ));
                error_log.record(&err);
                return Err(err);
            }
        };

        let name = spec.name.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "pgmap", connection = %name, "postgres connection error: {e}");
            }
        });

        tracing::info!(target: "pgmap", connection = %spec.name, dsn = %spec.dsn(), "connected");
        Self::from_session(client, error_log).await
    }
}

impl<S: Session> ConnectionGuard<S> {
    /// Wrap an established session, running the `SELECT 1` liveness probe.
    pub async fn from_session(session: S, error_log: ErrorLog) -> OrmResult<Self> {
        if let Err(e) = session.query("SELECT 1", &[]).await {
            let err = OrmError::Connection(format!("liveness probe failed: {e}"));
            error_log.record(&err);
            return Err(err);
        }

        Ok(Self {
            session,
            blacklist: RwLock::new(DEFAULT_BLACKLIST.iter().map(|v| v.to_string()).collect()),
            error_log,
        })
    }

    /// The underlying session.
    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// Whether the session is still usable.
    pub fn is_connected(&self) -> bool {
        !self.session.is_closed()
    }

    fn verbs(&self) -> RwLockReadGuard<'_, BTreeSet<String>> {
        self.blacklist.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the blacklist. Applies to subsequent [`ConnectionGuard::query`] calls.
    pub fn set_blacklist<I, V>(&self, verbs: I)
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let verbs: BTreeSet<String> = verbs
            .into_iter()
            .map(|v| v.as_ref().trim().to_ascii_uppercase())
            .filter(|v| !v.is_empty())
            .collect();
        *self.blacklist.write().unwrap_or_else(|e| e.into_inner()) = verbs;
    }

    /// Current blacklist, sorted and upper-cased.
    pub fn blacklist(&self) -> Vec<String> {
        self.verbs().iter().cloned().collect()
    }

    /// First blacklisted verb contained in `text`, ignoring case.
    pub fn blacklisted_verb(&self, text: &str) -> Option<String> {
        let upper = text.to_ascii_uppercase();
        self.verbs().iter().find(|v| upper.contains(v.as_str())).cloned()
    }

    /// Run a raw read-only statement.
    ///
    /// Returns [`OrmError::Refused`] without touching the session when `text` contains a
    /// blacklisted verb or does not contain `select`.
    pub async fn query(&self, text: &str) -> OrmResult<Vec<Record>> {
        if let Some(verb) = self.blacklisted_verb(text) {
            tracing::debug!(target: "pgmap.sql", verb = %verb, "raw statement refused");
            return Err(OrmError::Refused(format!(
                "statement contains blacklisted verb {verb}"
            )));
        }
        if !text.to_ascii_lowercase().contains("select") {
            return Err(OrmError::Refused(
                "only SELECT statements may run as raw text".to_string(),
            ));
        }

        tracing::debug!(target: "pgmap.sql", sql = %text, "raw query");
        self.session.query(text, &[]).await.inspect_err(|e| {
            self.error_log.record(e);
        })
    }
}

#[cfg(test)]
mod tests;
