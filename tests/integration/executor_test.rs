//! Fan-out executor integration tests.
//!
//! Exercises the executor's collection semantics, subset filtering,
//! concurrency bound, cancellation, and the exit-status mapping, all
//! against mock database clients.

use async_trait::async_trait;
use prismatic::db::{
    CommandKind, Column, Connection, DatabaseClient, Executor, FailingDatabaseClient,
    HangingDatabaseClient, Manager, MockDatabaseClient, ResultSet, RunOptions, Value,
};
use prismatic::error::{PrismaticError, Result};
use prismatic::outcome::RunStatus;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn export_options() -> RunOptions {
    RunOptions {
        use_cache: false,
        commit: false,
        command: CommandKind::Export,
    }
}

fn run_options(commit: bool) -> RunOptions {
    RunOptions {
        use_cache: false,
        commit,
        command: CommandKind::Run,
    }
}

fn mock_manager(names: &[&str]) -> Manager {
    let connections = names
        .iter()
        .map(|name| {
            (
                name.to_string(),
                Connection::ready(Box::new(MockDatabaseClient::new())),
            )
        })
        .collect();
    Manager::from_connections(connections)
}

#[tokio::test]
async fn all_connections_succeed_on_export() {
    let manager = mock_manager(&["a", "b", "c"]);
    let executor = Executor::new(&manager);
    let cancel = CancellationToken::new();

    let outcome = executor
        .run(&cancel, 4, "SELECT 1, 'x'", export_options(), &[])
        .await;

    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.errors.is_empty());
    for name in ["a", "b", "c"] {
        let result = &outcome.results[name];
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0].len(), result.columns.len());
    }

    assert_eq!(RunStatus::from_summary(outcome.summary).exit_code(), 0);
}

#[tokio::test]
async fn results_and_errors_are_disjoint() {
    let mut connections = HashMap::new();
    connections.insert(
        "good".to_string(),
        Connection::ready(Box::new(MockDatabaseClient::new())),
    );
    connections.insert(
        "bad".to_string(),
        Connection::dead(PrismaticError::connect("open failed")),
    );
    connections.insert(
        "ugly".to_string(),
        Connection::ready(Box::new(FailingDatabaseClient::new("query exploded"))),
    );
    let manager = Manager::from_connections(connections);
    let executor = Executor::new(&manager);
    let cancel = CancellationToken::new();

    let outcome = executor
        .run(&cancel, 3, "SELECT 1", export_options(), &[])
        .await;

    for name in outcome.results.keys() {
        assert!(!outcome.errors.contains_key(name));
    }
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.errors.len(), 2);
    assert_eq!(outcome.summary.successful, 1);
    assert_eq!(outcome.summary.failed, 2);
}

#[tokio::test]
async fn partial_failure_maps_to_exit_102() {
    let mut connections = HashMap::new();
    connections.insert(
        "good".to_string(),
        Connection::ready(Box::new(MockDatabaseClient::new())),
    );
    connections.insert(
        "bad".to_string(),
        Connection::dead(PrismaticError::connect("open failed")),
    );
    let manager = Manager::from_connections(connections);
    let executor = Executor::new(&manager);
    let cancel = CancellationToken::new();

    let outcome = executor
        .run(&cancel, 2, "UPDATE t SET x = 1", run_options(false), &[])
        .await;

    assert_eq!(RunStatus::from_summary(outcome.summary).exit_code(), 102);
}

#[tokio::test]
async fn full_failure_maps_to_exit_101() {
    let mut connections = HashMap::new();
    for name in ["a", "b"] {
        connections.insert(
            name.to_string(),
            Connection::dead(PrismaticError::connect("open failed")),
        );
    }
    let manager = Manager::from_connections(connections);
    let executor = Executor::new(&manager);
    let cancel = CancellationToken::new();

    let outcome = executor
        .run(&cancel, 2, "UPDATE t SET x = 1", run_options(false), &[])
        .await;

    assert!(outcome.results.is_empty());
    assert_eq!(outcome.errors.len(), 2);
    assert_eq!(RunStatus::from_summary(outcome.summary).exit_code(), 101);
}

#[tokio::test]
async fn subset_filter_dispatches_only_named_connections() {
    let manager = mock_manager(&["a", "b", "c", "d"]);
    let executor = Executor::new(&manager);
    let cancel = CancellationToken::new();

    let subset = vec!["a".to_string(), "c".to_string()];
    let outcome = executor
        .run(&cancel, 4, "SELECT 1", export_options(), &subset)
        .await;

    assert_eq!(outcome.results.len(), 2);
    for name in ["b", "d"] {
        assert!(!outcome.results.contains_key(name));
        assert!(!outcome.errors.contains_key(name));
    }
    assert_eq!(outcome.summary.successful, 2);
}

#[tokio::test]
async fn select_under_run_command_succeeds_with_empty_maps() {
    let manager = mock_manager(&["a", "b"]);
    let executor = Executor::new(&manager);
    let cancel = CancellationToken::new();

    let outcome = executor
        .run(&cancel, 2, "SELECT 1", run_options(false), &[])
        .await;

    // Run-command successes carry no result sets, so both maps stay empty
    // while the summary still records the successes.
    assert!(outcome.results.is_empty());
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.summary.successful, 2);
    assert_eq!(RunStatus::from_summary(outcome.summary).exit_code(), 0);
}

/// Client that records how many executions overlap.
struct CountingClient {
    active: Arc<AtomicUsize>,
    max_seen: Arc<AtomicUsize>,
}

#[async_trait]
impl DatabaseClient for CountingClient {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn execute(
        &self,
        _cancel: &CancellationToken,
        _name: &str,
        _query: &str,
        _options: RunOptions,
    ) -> Result<Option<ResultSet>> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        Ok(Some(ResultSet::with_data(
            vec![Column::new(0, "id", "int32")],
            vec![vec![Value::Int(1)]],
        )))
    }

    async fn close(&self) {}
}

#[tokio::test]
async fn worker_budget_bounds_in_flight_executions() {
    let active = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let mut connections = HashMap::new();
    for i in 0..8 {
        connections.insert(
            format!("conn_{i}"),
            Connection::ready(Box::new(CountingClient {
                active: Arc::clone(&active),
                max_seen: Arc::clone(&max_seen),
            })),
        );
    }
    let manager = Manager::from_connections(connections);
    let executor = Executor::new(&manager);
    let cancel = CancellationToken::new();

    let outcome = executor
        .run(&cancel, 2, "SELECT 1", export_options(), &[])
        .await;

    assert_eq!(outcome.results.len(), 8);
    assert!(
        max_seen.load(Ordering::SeqCst) <= 2,
        "worker budget exceeded: {} concurrent executions",
        max_seen.load(Ordering::SeqCst)
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_fails_in_flight_connections_only() {
    let mut connections = HashMap::new();
    connections.insert(
        "fast".to_string(),
        Connection::ready(Box::new(MockDatabaseClient::new())),
    );
    connections.insert(
        "slow".to_string(),
        Connection::ready(Box::new(HangingDatabaseClient)),
    );
    let manager = Manager::from_connections(connections);
    let executor = Executor::new(&manager);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = executor
        .run(&cancel, 2, "SELECT pg_sleep(3600)", export_options(), &[])
        .await;

    // The fast peer completed before cancellation; the slow one reports it.
    assert!(outcome.results.contains_key("fast"));
    assert!(matches!(
        outcome.errors.get("slow"),
        Some(PrismaticError::Cancelled)
    ));
    assert_eq!(RunStatus::from_summary(outcome.summary).exit_code(), 102);
}
