//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient`
//! trait using a lazy sqlx connection pool. Every query runs inside a
//! transaction that is committed or rolled back on all exit paths.

use crate::db::types::{Column, ResultSet, Row, Value};
use crate::db::{CommandKind, DatabaseClient, RunOptions};
use crate::error::{PrismaticError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::TryStreamExt;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow, PgStatement};
use sqlx::{
    Column as SqlxColumn, Connection as SqlxConnection, Executor as SqlxExecutor,
    Row as SqlxRow, Statement as SqlxStatement, TypeInfo,
};
use sqlx::{PgConnection, Postgres, Transaction};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// PostgreSQL database client backed by a connection pool.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Creates a client with a lazily connected pool.
    ///
    /// No network I/O happens here; the first acquire (usually the liveness
    /// ping) establishes the actual connection.
    pub fn connect_lazy(dsn: &str, max_connections: u8, timeout_secs: u8) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(u32::from(max_connections))
            .acquire_timeout(Duration::from_secs(u64::from(timeout_secs)))
            .connect_lazy(dsn)
            .map_err(|e| PrismaticError::connect(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Creates a client from an existing connection pool.
    ///
    /// This is primarily useful for testing.
    #[allow(dead_code)]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn ping(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| PrismaticError::ping(e.to_string()))?;

        conn.ping()
            .await
            .map_err(|e| PrismaticError::ping(e.to_string()))
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        name: &str,
        query: &str,
        options: RunOptions,
    ) -> Result<Option<ResultSet>> {
        if cancel.is_cancelled() {
            error!(connection = %name, "Run already cancelled");
            return Err(PrismaticError::Cancelled);
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!(connection = %name, error = %e, "Error starting transaction");
            PrismaticError::transaction(format!("error starting transaction: {e}"))
        })?;

        let outcome = run_in_transaction(cancel, &mut tx, query, options.command).await;

        // The transaction always finalizes, on success and error paths alike.
        // The row stream and statement are released before this point.
        let finish = if options.commit {
            info!(connection = %name, "Committing transaction");
            tx.commit().await
        } else {
            info!(connection = %name, "Rolling back transaction");
            tx.rollback().await
        };

        let result = outcome?;
        finish
            .map_err(|e| PrismaticError::transaction(format!("error finalizing transaction: {e}")))?;

        Ok(result)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Prepares and executes the statement on an open transaction.
///
/// Export runs materialize the row stream; `run` runs execute for side
/// effects only and return no result set.
async fn run_in_transaction(
    cancel: &CancellationToken,
    tx: &mut Transaction<'_, Postgres>,
    query: &str,
    command: CommandKind,
) -> Result<Option<ResultSet>> {
    let statement = (&mut **tx)
        .prepare(query)
        .await
        .map_err(|e| PrismaticError::transaction(format!("error preparing statement: {e}")))?;

    if command != CommandKind::Export {
        statement
            .query()
            .execute(&mut **tx)
            .await
            .map_err(|e| PrismaticError::query(format!("error running query: {e}")))?;
        return Ok(None);
    }

    let result = materialize_rows(cancel, &statement, &mut **tx).await?;
    Ok(Some(result))
}

/// Streams all rows of a prepared statement into a `ResultSet`.
///
/// Cancellation is checked between rows; a cancelled run never yields a
/// partial result set.
async fn materialize_rows(
    cancel: &CancellationToken,
    statement: &PgStatement<'_>,
    conn: &mut PgConnection,
) -> Result<ResultSet> {
    let start = Instant::now();

    let columns: Vec<Column> = statement
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| Column::new(i, col.name(), scan_type_name(col.type_info().name())))
        .collect();

    let mut rows: Vec<Row> = Vec::new();
    {
        let mut stream = statement.query().fetch(conn);
        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => return Err(PrismaticError::Cancelled),
                next = stream.try_next() => next
                    .map_err(|e| PrismaticError::query(format!("generic row error: {e}")))?,
            };
            let Some(pg_row) = next else { break };
            rows.push(convert_row(&pg_row));
        }
    }

    let row_count = rows.len();
    Ok(ResultSet {
        columns,
        rows,
        row_count,
        duration: start.elapsed(),
    })
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
///
/// Values that cannot be decoded for their reported type degrade to NULL
/// rather than failing the whole row.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(i64::from(v)))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(i64::from(v)))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(f64::from(v)))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" | "NUMERIC" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),

        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Timestamp(v.naive_utc()))
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Timestamp(v.and_time(NaiveTime::MIN)))
            .unwrap_or(Value::Null),

        // Byte buffers are coerced to UTF-8 strings.
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(String::from_utf8_lossy(&v).into_owned()))
            .unwrap_or(Value::Null),

        // For all other types, try to get as string.
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Maps a driver-reported type name to the normalized scan-type name used
/// for export styling.
fn scan_type_name(type_name: &str) -> &'static str {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => "bool",
        "INT2" | "SMALLINT" => "int16",
        "INT4" | "INT" | "INTEGER" => "int32",
        "INT8" | "BIGINT" => "int64",
        "FLOAT4" | "REAL" => "float32",
        "FLOAT8" | "DOUBLE PRECISION" | "NUMERIC" => "float64",
        "TIMESTAMP" | "TIMESTAMPTZ" | "DATE" => "Time",
        _ => "string",
    }
}
