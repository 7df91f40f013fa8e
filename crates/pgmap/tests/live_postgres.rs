use pgmap::{Columns, ErrorLog, MapperOptions, OrmError, OrmResult, SchemaMapper, Value, values};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_postgres::NoTls;

async fn try_connect() -> Option<tokio_postgres::Client> {
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let (client, connection) = tokio_postgres::connect(&database_url, NoTls)
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("tokio-postgres connection error: {e}");
        }
    });
    Some(client)
}

#[tokio::test]
async fn maps_and_round_trips_a_live_schema() -> OrmResult<()> {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return Ok(());
    };

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    let schema = format!("pgmap_test_{}_{}", std::process::id(), nanos);

    client
        .batch_execute(&format!(
            "CREATE SCHEMA {schema};
             SET search_path TO {schema};
             CREATE TABLE users (id int4 PRIMARY KEY, name text NOT NULL);
             CREATE TABLE \"AuditLog\" (at timestamptz);"
        ))
        .await
        .map_err(OrmError::from_db_error)?;
    let database: String = client
        .query_one("SELECT current_database()", &[])
        .await
        .map_err(OrmError::from_db_error)?
        .get(0);

    let log = ErrorLog::new();
    let options = MapperOptions::default()
        .schema(schema.as_str())
        .trust("live")
        .error_log(log.clone());
    let mapper = SchemaMapper::from_session(client, database, options).await?;

    assert_eq!(mapper.table_names(), vec!["AuditLog", "users"]);
    assert_eq!(mapper.columns("users")?, ["id", "name"]);
    assert_eq!(mapper.columns("auditlog")?, ["at"]);

    let token = mapper.issue_token("live")?;
    let users = mapper.table("Users")?;

    users.insert(&token, values![1, "a"])?.execute(false).await?;
    users.insert(&token, values![2, "b"])?.execute(false).await?;

    let rows = users
        .select(&token, Columns::All)?
        .where_("id = ?", values![1])?
        .fetch_all()
        .await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::from("a")));

    let affected = users
        .update(&token)?
        .set(&["name"], values!["c"])?
        .where_("id = ?", values![2])?
        .execute(false)
        .await?;
    assert_eq!(affected.affected(), Some(1));

    let rows = users
        .select(&token, "COUNT(*) AS n")?
        .where_("name = ?", values!["c"])?
        .fetch_all()
        .await?;
    assert_eq!(rows[0].get("n"), Some(&Value::Int(1)));

    let deleted = users
        .delete(&token)?
        .where_("id > ?", values![0])?
        .execute(false)
        .await?;
    assert_eq!(deleted.affected(), Some(2));

    let err = users
        .insert(&token, values!["not a number", "x"])?
        .execute(false)
        .await
        .unwrap_err();
    assert!(err.is_execution());

    assert!(mapper.guard().query("SELECT 1; DROP TABLE users").await.is_err());

    mapper
        .guard()
        .session()
        .batch_execute(&format!("DROP SCHEMA {schema} CASCADE"))
        .await
        .map_err(OrmError::from_db_error)?;
    Ok(())
}
