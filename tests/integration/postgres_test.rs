//! PostgreSQL client integration tests.
//!
//! These tests require a running PostgreSQL database. Set DATABASE_URL to
//! run them; they skip themselves otherwise.

use prismatic::db::{CommandKind, DatabaseClient, PostgresClient, RunOptions, Value};
use prismatic::error::PrismaticError;
use tokio_util::sync::CancellationToken;

fn get_test_client() -> Option<PostgresClient> {
    let url = std::env::var("DATABASE_URL").ok()?;
    PostgresClient::connect_lazy(&url, 5, 10).ok()
}

fn export_options(commit: bool) -> RunOptions {
    RunOptions {
        use_cache: false,
        commit,
        command: CommandKind::Export,
    }
}

#[tokio::test]
async fn test_ping() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    client.ping().await.unwrap();
    client.close().await;
}

#[tokio::test]
async fn test_execute_simple_select() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let cancel = CancellationToken::new();
    let result = client
        .execute(
            &cancel,
            "test",
            "SELECT 1 as num, 'hello' as greeting",
            export_options(false),
        )
        .await
        .unwrap()
        .expect("export runs materialize a result set");

    assert_eq!(result.columns.len(), 2);
    assert_eq!(result.columns[0].name, "num");
    assert_eq!(result.columns[0].type_name, "int32");
    assert_eq!(result.columns[1].name, "greeting");
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0][0], Value::Int(1));
    assert_eq!(result.rows[0][1], Value::String("hello".to_string()));

    client.close().await;
}

#[tokio::test]
async fn test_run_command_returns_no_result_set() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let cancel = CancellationToken::new();
    let options = RunOptions {
        use_cache: false,
        commit: false,
        command: CommandKind::Run,
    };
    let result = client
        .execute(&cancel, "test", "SELECT 1", options)
        .await
        .unwrap();

    assert!(result.is_none());
    client.close().await;
}

#[tokio::test]
async fn test_execute_error_is_reported() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let cancel = CancellationToken::new();
    let result = client
        .execute(
            &cancel,
            "test",
            "SELECT * FROM nonexistent_table_xyz",
            export_options(false),
        )
        .await;

    assert!(result.is_err());
    client.close().await;
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = client
        .execute(&cancel, "test", "SELECT 1", export_options(false))
        .await;

    assert!(matches!(result, Err(PrismaticError::Cancelled)));
    client.close().await;
}

#[tokio::test]
async fn test_rollback_discards_changes() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let cancel = CancellationToken::new();

    client
        .execute(
            &cancel,
            "test",
            "CREATE TABLE IF NOT EXISTS prismatic_rollback_probe (id int)",
            RunOptions {
                use_cache: false,
                commit: true,
                command: CommandKind::Run,
            },
        )
        .await
        .unwrap();

    // Insert without committing; the row must not survive.
    client
        .execute(
            &cancel,
            "test",
            "INSERT INTO prismatic_rollback_probe VALUES (1)",
            RunOptions {
                use_cache: false,
                commit: false,
                command: CommandKind::Run,
            },
        )
        .await
        .unwrap();

    let result = client
        .execute(
            &cancel,
            "test",
            "SELECT count(*) FROM prismatic_rollback_probe",
            export_options(false),
        )
        .await
        .unwrap()
        .expect("export runs materialize a result set");

    assert_eq!(result.rows[0][0], Value::Int(0));

    client
        .execute(
            &cancel,
            "test",
            "DROP TABLE prismatic_rollback_probe",
            RunOptions {
                use_cache: false,
                commit: true,
                command: CommandKind::Run,
            },
        )
        .await
        .unwrap();

    client.close().await;
}
