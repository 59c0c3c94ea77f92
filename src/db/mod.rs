//! Database layer for Prismatic.
//!
//! Provides a trait-based interface for database clients, the per-target
//! connection records, the connection manager, and the parallel executor.

pub mod cache;
pub mod classify;
mod connection;
mod executor;
mod manager;
mod mock;
mod postgres;
mod types;

pub use cache::QueryCache;
pub use classify::{classify, QueryType};
pub use connection::{Connection, Liveness};
pub use executor::{Executor, RunOutcome, Summary};
pub use manager::Manager;
pub use mock::{FailingDatabaseClient, HangingDatabaseClient, MockDatabaseClient};
#[allow(unused_imports)]
pub use postgres::PostgresClient;
pub use types::{Column, ResultSet, Row, Value};

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Postgres,
    // Future: MySQL, SQLite, etc.
}

impl Engine {
    /// Returns the engine as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
        }
    }

    /// Parses an engine from a configuration string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Which subcommand requested the run.
///
/// `Export` materializes result sets; `Run` executes for side effects only
/// and discards any rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Export,
    Run,
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Export => "export",
            Self::Run => "run",
        };
        write!(f, "{s}")
    }
}

/// Per-run execution flags, shared by every dispatched connection.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Whether cached DQL results may be reused.
    pub use_cache: bool,
    /// Commit each per-connection transaction instead of rolling it back.
    pub commit: bool,
    /// Which subcommand requested the run.
    pub command: CommandKind,
}

/// Creates a database client for the given engine and DSN.
///
/// Construction is lazy: no network I/O happens here, so errors are limited
/// to DSN parsing. Liveness is established separately via `ping`.
pub fn connect(engine: Engine, dsn: &str, cfg: &Config) -> Result<Box<dyn DatabaseClient>> {
    match engine {
        Engine::Postgres => {
            let client = PostgresClient::connect_lazy(dsn, cfg.max_connections, cfg.timeout)?;
            Ok(Box::new(client))
        }
    }
}

/// Trait defining the interface for database clients.
///
/// All operations are async and return Results with PrismaticError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Verifies liveness with a single round-trip.
    async fn ping(&self) -> Result<()>;

    /// Executes a query inside a transaction.
    ///
    /// The transaction is committed when `options.commit` is set and rolled
    /// back otherwise, on success and failure paths alike. Returns a
    /// materialized result set for `export` runs and `None` for `run` runs.
    async fn execute(
        &self,
        cancel: &CancellationToken,
        name: &str,
        query: &str,
        options: RunOptions,
    ) -> Result<Option<ResultSet>>;

    /// Closes the client and releases its pooled handles.
    async fn close(&self);
}
