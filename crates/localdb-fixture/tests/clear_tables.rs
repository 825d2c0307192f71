//! Table clearing tests against an in-memory server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{CONSTRAINT_CONFLICT, FakeServer};
use localdb_fixture::{
    ConnectionString, Connector, DbParams, DbWrapper, Endpoint, Error, SchemaScript,
};

const SCHEMA: &str = "\
CREATE DATABASE [$(DatabaseName)]
GO
USE [$(DatabaseName)];
GO
CREATE TABLE [dbo].[T1] ([Id] INT NOT NULL PRIMARY KEY);
GO
CREATE TABLE [dbo].[T2] ([Id] INT NOT NULL, [T1Id] INT REFERENCES [dbo].[T1] ([Id]));
GO
";

async fn deployed(server: &FakeServer) -> DbWrapper<FakeServer> {
    let params = DbParams::new(
        ConnectionString::custom("Server=localhost;User Id=sa;Password=secret").unwrap(),
        SchemaScript::new(SCHEMA),
        "clear-tests",
        false,
    );
    let db = DbWrapper::with_connector(params, server.clone()).unwrap();
    db.deploy_schema().await.unwrap();
    db
}

fn last_batch(server: &FakeServer) -> (String, String) {
    let last = server.executed().pop().unwrap();
    (last.database, last.sql)
}

#[tokio::test]
async fn test_clear_tables_runs_three_passes_on_target() {
    let server = FakeServer::new();
    let db = deployed(&server).await;

    db.clear_tables(["[dbo].[T1]", "[dbo].[T2]"]).await.unwrap();

    let (database, sql) = last_batch(&server);
    assert_eq!(database, "clear-tests");
    let lines: Vec<&str> = sql.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[..2].iter().all(|l| l.ends_with("NOCHECK CONSTRAINT ALL")));
    assert!(lines[2..4].iter().all(|l| l.starts_with("DELETE FROM")));
    assert!(lines[4..].iter().all(|l| l.ends_with(" CHECK CONSTRAINT ALL") && !l.contains("NOCHECK")));
}

fn seed(server: &FakeServer) {
    server.insert_rows("clear-tests", "[dbo].[T1]", 3);
    server.insert_rows("clear-tests", "[dbo].[T2]", 5);
}

#[tokio::test]
async fn test_clear_tables_order_independent() {
    let server = FakeServer::new();
    let db = deployed(&server).await;

    for tables in [["[dbo].[T2]", "[dbo].[T1]"], ["[dbo].[T1]", "[dbo].[T2]"]] {
        seed(&server);

        db.clear_tables(tables).await.unwrap();

        assert_eq!(server.row_count("clear-tests", "[dbo].[T1]"), 0);
        assert_eq!(server.row_count("clear-tests", "[dbo].[T2]"), 0);
        assert!(!server.constraints_disabled("clear-tests", "[dbo].[T1]"));
        assert!(!server.constraints_disabled("clear-tests", "[dbo].[T2]"));
    }
}

#[tokio::test]
async fn test_referenced_table_delete_conflicts_with_enabled_constraint() {
    let server = FakeServer::new();
    let db = deployed(&server).await;
    seed(&server);

    let endpoint = Endpoint::resolve(&db.params().connection_string, "clear-tests");
    let mut conn = server.connect(&endpoint).await.unwrap();
    let err = conn.execute("DELETE FROM [dbo].[T1]").await.unwrap_err();

    assert!(err.is_server_error(CONSTRAINT_CONFLICT));
    assert_eq!(server.row_count("clear-tests", "[dbo].[T1]"), 3);
}

#[tokio::test]
async fn test_clear_referenced_table_alone_keeps_child_constraint() {
    let server = FakeServer::new();
    let db = deployed(&server).await;
    seed(&server);

    // Only the listed tables have their constraints disabled.
    let err = db.clear_tables(["[dbo].[T1]"]).await.unwrap_err();

    assert!(err.is_server_error(CONSTRAINT_CONFLICT));
    assert_eq!(server.row_count("clear-tests", "[dbo].[T2]"), 5);
}

#[tokio::test]
async fn test_clear_tables_uses_schema_table_list() {
    let server = FakeServer::new();
    let db = deployed(&server).await;

    db.clear_tables(db.created_tables()).await.unwrap();

    let (_, sql) = last_batch(&server);
    assert!(sql.contains("DELETE FROM [dbo].[T1]"));
    assert!(sql.contains("DELETE FROM [dbo].[T2]"));
}

#[tokio::test]
async fn test_clear_tables_runs_every_time() {
    let server = FakeServer::new();
    let db = deployed(&server).await;

    db.clear_tables(["[dbo].[T1]"]).await.unwrap();
    db.clear_tables(["[dbo].[T1]"]).await.unwrap();

    assert_eq!(server.executed_count("DELETE FROM [dbo].[T1]"), 2);
}

#[tokio::test]
async fn test_clear_unknown_table_is_an_error() {
    let server = FakeServer::new();
    let db = deployed(&server).await;

    let err = db.clear_tables(["[dbo].[Missing]"]).await.unwrap_err();

    assert!(err.is_object_not_found());
}

#[tokio::test]
async fn test_clear_tables_rejects_injection() {
    let server = FakeServer::new();
    let db = deployed(&server).await;
    let before = server.executed().len();

    let err = db
        .clear_tables(["[dbo].[T1]; DROP DATABASE [clear-tests]"])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Script(_)));
    assert_eq!(server.executed().len(), before);
}

#[tokio::test]
async fn test_clear_no_tables_does_not_connect() {
    let server = FakeServer::new();
    let db = deployed(&server).await;
    let connects = server.connects().len();

    db.clear_tables(Vec::<String>::new()).await.unwrap();

    assert_eq!(server.connects().len(), connects);
}
