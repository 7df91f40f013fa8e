use super::*;
use crate::testing::MemorySession;
use crate::value::Value;

async fn guard() -> (ConnectionGuard<MemorySession>, MemorySession) {
    let session = MemorySession::new();
    let guard = ConnectionGuard::from_session(session.clone(), ErrorLog::new())
        .await
        .unwrap();
    (guard, session)
}

#[tokio::test]
async fn probe_runs_on_construction() {
    let (guard, session) = guard().await;
    assert!(guard.is_connected());
    assert_eq!(session.statements()[0].0, "SELECT 1");
}

#[tokio::test]
async fn failed_probe_is_a_connection_error() {
    let session = MemorySession::new();
    session.fail_on(&["SELECT 1"], "server closed the connection");
    let log = ErrorLog::new();

    let err = ConnectionGuard::from_session(session, log.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Connection(_)));
    assert_eq!(log.last().map(|r| r.kind), Some("ConnectionError"));
}

#[tokio::test]
async fn blacklisted_verbs_are_refused_in_any_case_or_position() {
    let (guard, session) = guard().await;
    let before = session.statements().len();

    for text in [
        "DELETE FROM users",
        "select 1; drop table users",
        "SELECT * FROM users; Truncate users",
        "SELECT * FROM dropbox_links",
        "select id from t where note = 'please delete me'",
    ] {
        let err = guard.query(text).await.unwrap_err();
        assert!(matches!(err, OrmError::Refused(_)), "{text}");
    }

    assert_eq!(session.statements().len(), before);
}

#[tokio::test]
async fn non_select_text_is_refused() {
    let (guard, session) = guard().await;
    let before = session.statements().len();

    let err = guard.query("UPDATE users SET name = 'x'").await.unwrap_err();
    assert!(matches!(err, OrmError::Refused(_)));
    assert_eq!(session.statements().len(), before);
}

#[tokio::test]
async fn select_runs_and_returns_rows() {
    let (guard, session) = guard().await;
    session.respond(
        &["FROM users"],
        vec![[("id", Value::Int(1))].into_iter().collect()],
    );

    let rows = guard.query("select id FROM users").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("id"), Some(&Value::Int(1)));
}

#[tokio::test]
async fn replaced_blacklist_applies_to_later_calls() {
    let (guard, _session) = guard().await;
    assert_eq!(guard.blacklist(), vec!["DELETE", "DROP", "TRUNCATE"]);
    assert!(guard.query("SELECT * FROM dropbox").await.is_err());

    guard.set_blacklist(["grant", " ", "revoke"]);
    assert_eq!(guard.blacklist(), vec!["GRANT", "REVOKE"]);
    assert!(guard.query("SELECT * FROM dropbox").await.is_ok());
    assert!(guard.query("SELECT 1; grant all on t to x").await.is_err());
}

#[tokio::test]
async fn execution_failures_are_recorded() {
    let session = MemorySession::new();
    session.fail_on(&["FROM missing"], "relation \"missing\" does not exist");
    let log = ErrorLog::new();
    let guard = ConnectionGuard::from_session(session, log.clone()).await.unwrap();

    let err = guard.query("SELECT * FROM missing").await.unwrap_err();
    assert!(err.is_execution());
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn closed_session_reports_disconnected() {
    let (guard, session) = guard().await;
    session.close();
    assert!(!guard.is_connected());
}
