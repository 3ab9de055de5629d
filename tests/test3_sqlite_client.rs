#![cfg(feature = "sqlite")]

use std::time::Duration;

use sql_mapper::params::params_from_pairs;
use sql_mapper::prelude::*;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

const SLOW_QUERY: &str = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 100000000)
     SELECT COUNT(*) FROM c";

#[tokio::test]
async fn every_row_statement_becomes_a_table() -> Result<(), Box<dyn std::error::Error>> {
    let client = SqlClient::new_sqlite("file::memory:".to_string()).await?;
    let result = client
        .query(
            "CREATE TABLE item (id INTEGER PRIMARY KEY, name TEXT, qty INTEGER);
             INSERT INTO item (name, qty) VALUES ('bolt', 10), ('nut', 0), ('gear', 3);
             SELECT id, name FROM item WHERE qty > @min ORDER BY id;
             SELECT COUNT(*) AS n FROM item;
             SELECT name FROM item WHERE qty > 1000;",
        )
        .param("min", 1_i64)
        .execute()
        .await?;

    assert_eq!(result.len(), 3);
    assert_eq!(result.row_count(), 2);
    assert_eq!(result.columns(), ["id", "name"]);
    assert_eq!(result.table(1)?.rows()[0].get("n"), Some(&RowValues::Int(3)));
    assert!(result.table(2)?.is_empty());
    assert_eq!(result.table(2)?.columns(), ["name"]);
    assert!(result.table(3).is_err());
    Ok(())
}

#[tokio::test]
async fn statements_without_rows_give_no_tables() -> Result<(), Box<dyn std::error::Error>> {
    let client = SqlClient::new_sqlite("file::memory:".to_string()).await?;
    let result = client
        .query("CREATE TABLE t (a INTEGER); INSERT INTO t VALUES (1);")
        .execute()
        .await?;
    assert!(result.is_empty());
    assert!(result.first_table().is_empty());
    assert!(client.query("DELETE FROM t").first_row().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn named_params_bind_in_every_marker_style() -> Result<(), Box<dyn std::error::Error>> {
    let client = SqlClient::new_sqlite("file::memory:".to_string()).await?;
    let row = client
        .query("SELECT @a AS a, :b AS b, $c AS c, @missing AS m")
        .params(params_from_pairs([("a", 1_i64), ("@b", 2_i64), (":c", 3_i64)]))
        .first_row()
        .await?
        .ok_or("no row")?;
    assert_eq!(row.get("a"), Some(&RowValues::Int(1)));
    assert_eq!(row.get("b"), Some(&RowValues::Int(2)));
    assert_eq!(row.get("c"), Some(&RowValues::Int(3)));
    assert_eq!(row.get("m"), Some(&RowValues::Null));

    let name: Option<String> = client
        .query("SELECT upper(@name)")
        .param("name", "erick")
        .scalar()
        .await?;
    assert_eq!(name.as_deref(), Some("ERICK"));
    Ok(())
}

#[tokio::test]
async fn stored_procedures_are_not_supported() -> Result<(), Box<dyn std::error::Error>> {
    let client = SqlClient::new_sqlite("file::memory:".to_string()).await?;
    let err = client.stored_procedure("GetUsers").execute().await.unwrap_err();
    assert!(matches!(err, SqlMapperError::Unimplemented(_)));
    assert_eq!(client.database_type(), Some(DatabaseType::Sqlite));
    Ok(())
}

#[tokio::test]
async fn blank_command_text_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let client = SqlClient::new_sqlite("file::memory:".to_string()).await?;
    let err = client.query("   ").execute().await.unwrap_err();
    assert!(matches!(err, SqlMapperError::ConfigError(_)));
    Ok(())
}

#[tokio::test]
async fn sql_errors_surface_from_the_driver() -> Result<(), Box<dyn std::error::Error>> {
    let client = SqlClient::new_sqlite("file::memory:".to_string()).await?;
    let err = client.query("SELECT * FROM nowhere").execute().await.unwrap_err();
    assert!(matches!(err, SqlMapperError::SqliteError(_)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_commands_are_interrupted_on_timeout() -> Result<(), Box<dyn std::error::Error>> {
    let client = SqlClient::sqlite_builder("file::memory:".to_string())
        .timeout(Duration::from_millis(100))
        .build()
        .await?;

    let err = client.query(SLOW_QUERY).execute().await.unwrap_err();
    assert!(matches!(err, SqlMapperError::Timeout(_)));

    // The interrupted statement releases the connection.
    let one: Option<i64> = client
        .query("SELECT 1")
        .timeout(Duration::from_secs(60))
        .scalar()
        .await?;
    assert_eq!(one, Some(1));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_commands_stop() -> Result<(), Box<dyn std::error::Error>> {
    let client = SqlClient::new_sqlite("file::memory:".to_string()).await?;
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = client.query(SLOW_QUERY).cancel_on(token).execute().await.unwrap_err();
    assert!(matches!(err, SqlMapperError::Cancelled));
    Ok(())
}

#[tokio::test]
async fn file_databases_persist_between_clients() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("persist.db").to_string_lossy().into_owned();

    let writer = SqlClient::new_sqlite(path.clone()).await?;
    writer
        .query("CREATE TABLE kv (k TEXT, v INTEGER); INSERT INTO kv VALUES (@k, @v);")
        .param("k", "answer")
        .param("v", 42_i64)
        .execute()
        .await?;
    drop(writer);

    let reader = SqlClient::new_sqlite(path).await?;
    let v: Option<i64> = reader
        .query("SELECT v FROM kv WHERE k = 'answer'")
        .scalar()
        .await?;
    assert_eq!(v, Some(42));
    Ok(())
}
