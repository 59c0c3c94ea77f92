//! Mock database clients for testing.
//!
//! Stand-ins for `PostgresClient` so the manager and executor can be
//! exercised without a running database.

use crate::db::types::{Column, ResultSet, Row, Value};
use crate::db::{CommandKind, DatabaseClient, RunOptions};
use crate::error::{PrismaticError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A mock database client that returns predefined results.
pub struct MockDatabaseClient {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl MockDatabaseClient {
    /// Creates a mock client returning a single `[1, "x"]` row.
    pub fn new() -> Self {
        Self {
            columns: vec![
                Column::new(0, "id", "int32"),
                Column::new(1, "label", "string"),
            ],
            rows: vec![vec![Value::Int(1), Value::String("x".to_string())]],
        }
    }

    /// Creates a mock client returning the given columns and rows.
    pub fn with_data(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Creates a mock client returning an empty result set.
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        _name: &str,
        _query: &str,
        options: RunOptions,
    ) -> Result<Option<ResultSet>> {
        if cancel.is_cancelled() {
            return Err(PrismaticError::Cancelled);
        }

        if options.command != CommandKind::Export {
            return Ok(None);
        }

        Ok(Some(
            ResultSet::with_data(self.columns.clone(), self.rows.clone())
                .with_duration(Duration::from_millis(1)),
        ))
    }

    async fn close(&self) {}
}

/// A mock client whose every operation fails with the given message.
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a failing client with the given error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn ping(&self) -> Result<()> {
        Err(PrismaticError::ping(self.message.clone()))
    }

    async fn execute(
        &self,
        _cancel: &CancellationToken,
        _name: &str,
        _query: &str,
        _options: RunOptions,
    ) -> Result<Option<ResultSet>> {
        Err(PrismaticError::query(self.message.clone()))
    }

    async fn close(&self) {}
}

/// A mock client that blocks until the run is cancelled.
///
/// Useful for exercising mid-flight cancellation.
pub struct HangingDatabaseClient;

#[async_trait]
impl DatabaseClient for HangingDatabaseClient {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        _name: &str,
        _query: &str,
        _options: RunOptions,
    ) -> Result<Option<ResultSet>> {
        cancel.cancelled().await;
        Err(PrismaticError::Cancelled)
    }

    async fn close(&self) {}
}
