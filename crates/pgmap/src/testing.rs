//! In-memory session for unit tests.

use crate::access::AccessToken;
use crate::client::Session;
use crate::errlog::ErrorLog;
use crate::error::{OrmError, OrmResult};
use crate::mapper::{MapperOptions, SchemaMapper};
use crate::row::Record;
use crate::value::Value;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
enum Response {
    Rows(Vec<Record>),
    Fail(String),
}

#[derive(Default)]
struct State {
    statements: Vec<(String, Vec<Value>)>,
    rules: Vec<(Vec<String>, Response)>,
    closed: bool,
}

/// Records every statement and answers from rules keyed by SQL substrings.
///
/// The most recently added rule whose needles all occur in the SQL wins; with no
/// matching rule a query returns no rows and an execute affects one row.
#[derive(Clone, Default)]
pub(crate) struct MemorySession {
    state: Arc<Mutex<State>>,
}

impl MemorySession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Seed catalog answers for `tables` (name, columns) in the given order.
    pub(crate) fn with_schema(tables: &[(&str, &[&str])]) -> Self {
        let session = Self::new();
        let table_rows = tables
            .iter()
            .map(|(name, _)| [("table_name", Value::from(*name))].into_iter().collect())
            .collect();
        session.respond(&["information_schema.tables"], table_rows);

        for (name, columns) in tables {
            let column_rows = columns
                .iter()
                .map(|c| [("column_name", Value::from(*c))].into_iter().collect())
                .collect();
            let needle = format!("table_name = '{}'", name.replace('\'', "''"));
            session.respond(&["information_schema.columns", &needle], column_rows);
        }
        session
    }

    pub(crate) fn respond(&self, needles: &[&str], rows: Vec<Record>) {
        self.add_rule(needles, Response::Rows(rows));
    }

    pub(crate) fn fail_on(&self, needles: &[&str], message: &str) {
        self.add_rule(needles, Response::Fail(message.to_string()));
    }

    pub(crate) fn close(&self) {
        self.state.lock().unwrap().closed = true;
    }

    fn add_rule(&self, needles: &[&str], response: Response) {
        let needles = needles.iter().map(|n| n.to_string()).collect();
        self.state.lock().unwrap().rules.push((needles, response));
    }

    /// Every statement seen so far, with its bound parameters.
    pub(crate) fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().unwrap().statements.clone()
    }

    /// Statements other than the liveness probe and catalog introspection.
    pub(crate) fn user_statements(&self) -> Vec<(String, Vec<Value>)> {
        self.statements()
            .into_iter()
            .filter(|(sql, _)| sql != "SELECT 1" && !sql.contains("information_schema"))
            .collect()
    }

    fn answer(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
        let mut state = self.state.lock().unwrap();
        state.statements.push((sql.to_string(), params.to_vec()));
        let response = state
            .rules
            .iter()
            .rev()
            .find(|(needles, _)| needles.iter().all(|n| sql.contains(n.as_str())))
            .map(|(_, response)| response.clone());
        match response {
            Some(Response::Rows(rows)) => Ok(rows),
            Some(Response::Fail(message)) => Err(OrmError::execution(
                "statement failed",
                std::io::Error::other(message),
            )),
            None => Ok(Vec::new()),
        }
    }
}

impl Session for MemorySession {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
        self.answer(sql, params)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let rows = self.answer(sql, params)?;
        Ok(rows.len().max(1) as u64)
    }

    fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

/// Identity trusted by [`mapped`].
pub(crate) const TRUSTED: &str = "tests/handler";

/// Map `tables` over a fresh session with a private error log, trusting [`TRUSTED`].
pub(crate) async fn mapped(
    tables: &[(&str, &[&str])],
) -> (SchemaMapper<MemorySession>, MemorySession, AccessToken) {
    let session = MemorySession::with_schema(tables);
    let options = MapperOptions::default()
        .trust(TRUSTED)
        .error_log(ErrorLog::new());
    let mapper = SchemaMapper::from_session(session.clone(), "app", options)
        .await
        .unwrap();
    let token = mapper.issue_token(TRUSTED).unwrap();
    (mapper, session, token)
}
